//! In-memory `CredentialStore` used by tests in place of Postgres.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    repo::{hash, CredentialStore, StoreError},
    repo_types::{NewUser, User},
};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap().len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = hash(&new_user.password)?;
        let mut users = self.users.write().unwrap();
        // uniqueness is checked under the write lock, like a unique index
        if users.values().any(|u| u.phone == new_user.phone) {
            return Err(StoreError::DuplicatePhone);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            phone: new_user.phone,
            password_hash,
            name: new_user.name,
            reset_token: None,
            reset_token_expire: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.phone == phone).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }

    async fn find_by_valid_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .find(|u| u.has_live_reset_token(token, now))
            .cloned())
    }

    async fn save(&self, user: &User, new_password: Option<&str>) -> Result<User, StoreError> {
        let password_hash = match new_password {
            Some(plain) => hash(plain)?,
            None => user.password_hash.clone(),
        };
        let mut users = self.users.write().unwrap();
        let stored = users
            .get_mut(&user.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *stored = User {
            password_hash,
            updated_at: OffsetDateTime::now_utc(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<User>, StoreError> {
        let password_hash = hash(new_password)?;
        let now = OffsetDateTime::now_utc();
        let mut users = self.users.write().unwrap();
        let Some(user) = users.values_mut().find(|u| u.has_live_reset_token(token, now)) else {
            return Ok(None);
        };
        user.password_hash = password_hash;
        user.clear_reset();
        user.updated_at = now;
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(phone: &str, password: &str) -> NewUser {
        NewUser {
            phone: phone.into(),
            password: password.into(),
            name: Some("Ada".into()),
        }
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        assert_ne!(user.password_hash, "Secret123!");
        assert!(store.verify_password(&user, "Secret123!").unwrap());
        assert!(!store.verify_password(&user, "secret123!").unwrap());
    }

    #[tokio::test]
    async fn duplicate_phone_leaves_first_user_untouched() {
        let store = InMemoryUserStore::new();
        let first = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        let err = store
            .create(new_user("+15551230000", "Other123!"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePhone));
        assert_eq!(store.len(), 1);

        let found = store.find_by_phone("+15551230000").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(store.verify_password(&found, "Secret123!").unwrap());
    }

    #[tokio::test]
    async fn save_without_password_never_rehashes() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        let once = store.save(&user, None).await.unwrap();
        let twice = store.save(&once, None).await.unwrap();
        assert_eq!(twice.password_hash, user.password_hash);
        assert!(store.verify_password(&twice, "Secret123!").unwrap());
    }

    #[tokio::test]
    async fn save_with_password_hashes_once() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        let updated = store.save(&user, Some("NewSecret1!")).await.unwrap();
        let resaved = store.save(&updated, None).await.unwrap();
        assert!(store.verify_password(&resaved, "NewSecret1!").unwrap());
        assert!(!store.verify_password(&resaved, "Secret123!").unwrap());
    }

    #[tokio::test]
    async fn stale_reset_token_is_not_found() {
        let store = InMemoryUserStore::new();
        let mut user = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        let now = OffsetDateTime::now_utc();

        user.start_reset("live".into(), now + Duration::minutes(10));
        let user = store.save(&user, None).await.unwrap();
        assert!(store.find_by_valid_reset_token("live").await.unwrap().is_some());

        let mut user = user;
        user.start_reset("stale".into(), now - Duration::seconds(1));
        store.save(&user, None).await.unwrap();
        assert!(store.find_by_valid_reset_token("stale").await.unwrap().is_none());
        assert!(store.find_by_valid_reset_token("live").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consumed_token_is_gone() {
        let store = InMemoryUserStore::new();
        let mut user = store.create(new_user("+15551230000", "Secret123!")).await.unwrap();
        user.start_reset("tok".into(), OffsetDateTime::now_utc() + Duration::minutes(10));
        store.save(&user, None).await.unwrap();

        let consumed = store.consume_reset_token("tok", "NewSecret1!").await.unwrap().unwrap();
        assert!(consumed.reset_token.is_none());
        assert!(consumed.reset_token_expire.is_none());
        assert!(store.verify_password(&consumed, "NewSecret1!").unwrap());
        assert!(store.consume_reset_token("tok", "Other1!").await.unwrap().is_none());
    }
}
