use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, not exposed in JSON
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expire: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Arms a password reset. Token and expiry are always set together.
    pub fn start_reset(&mut self, token: String, expires_at: OffsetDateTime) {
        self.reset_token = Some(token);
        self.reset_token_expire = Some(expires_at);
    }

    pub fn clear_reset(&mut self) {
        self.reset_token = None;
        self.reset_token_expire = None;
    }

    pub fn has_live_reset_token(&self, token: &str, now: OffsetDateTime) -> bool {
        matches!(
            (&self.reset_token, self.reset_token_expire),
            (Some(t), Some(exp)) if t == token && now < exp
        )
    }
}

/// Input for `CredentialStore::create`. The password is still plaintext here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub password: String,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            phone: "+15551230000".into(),
            password_hash: "$argon2id$stub".into(),
            name: None,
            reset_token: None,
            reset_token_expire: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reset_token_lives_until_expiry() {
        let mut u = user();
        let now = OffsetDateTime::now_utc();
        u.start_reset("abc".into(), now + Duration::minutes(10));
        assert!(u.has_live_reset_token("abc", now));
        assert!(!u.has_live_reset_token("abd", now));
        assert!(!u.has_live_reset_token("abc", now + Duration::minutes(10)));
    }

    #[test]
    fn clear_reset_drops_both_fields() {
        let mut u = user();
        u.start_reset("abc".into(), OffsetDateTime::now_utc());
        u.clear_reset();
        assert!(u.reset_token.is_none());
        assert!(u.reset_token_expire.is_none());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut u = user();
        u.start_reset("reset-secret-value".into(), OffsetDateTime::now_utc());
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset-secret-value"));
        assert!(json.contains("+15551230000"));
    }
}
