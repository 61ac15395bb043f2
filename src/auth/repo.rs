use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    password,
    repo_types::{NewUser, User},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("phone number already registered")]
    DuplicatePhone,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(anyhow::Error),
}

/// Persisted user records. Hashing happens here, on `create` and on `save`
/// when a new password is passed, and nowhere else.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Only returns a user whose reset token has not yet expired.
    async fn find_by_valid_reset_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    /// Persists `user`. With `Some(new_password)` the stored hash is replaced
    /// by a fresh hash of it; with `None` the existing hash is kept as is.
    async fn save(&self, user: &User, new_password: Option<&str>) -> Result<User, StoreError>;
    /// Sets a new password and clears the reset token in one step, only if
    /// `token` is still live. Of two racing callers at most one gets a user.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<User>, StoreError>;

    fn verify_password(&self, user: &User, candidate: &str) -> Result<bool, StoreError> {
        password::verify_password(candidate, &user.password_hash).map_err(StoreError::Hash)
    }
}

pub(crate) fn hash(plain: &str) -> Result<String, StoreError> {
    password::hash_password(plain).map_err(StoreError::Hash)
}

const USER_COLUMNS: &str = "id, phone, password_hash, name, reset_token, reset_token_expire, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = hash(&new_user.password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (phone, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.phone)
        .bind(&password_hash)
        .bind(&new_user.name)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicatePhone,
            other => StoreError::Database(other),
        })?;
        Ok(user)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_valid_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE reset_token = $1 AND reset_token_expire > now()
            "#
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: &User, new_password: Option<&str>) -> Result<User, StoreError> {
        let password_hash = match new_password {
            Some(plain) => hash(plain)?,
            None => user.password_hash.clone(),
        };
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                name = $3,
                reset_token = $4,
                reset_token_expire = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&password_hash)
        .bind(&user.name)
        .bind(&user.reset_token)
        .bind(user.reset_token_expire)
        .fetch_one(&self.db)
        .await?;
        Ok(saved)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<User>, StoreError> {
        let password_hash = hash(new_password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token = NULL,
                reset_token_expire = NULL,
                updated_at = now()
            WHERE reset_token = $1 AND reset_token_expire > now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(&password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
