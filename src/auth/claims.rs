use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSubject {
    User(Uuid),
    Admin(String),
}

/// JWT payload. Exactly one of `user_id` / `admin_email` is set on issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn subject(&self) -> Option<TokenSubject> {
        match (&self.user_id, &self.admin_email) {
            (Some(id), _) => Some(TokenSubject::User(*id)),
            (None, Some(email)) => Some(TokenSubject::Admin(email.clone())),
            (None, None) => None,
        }
    }
}
