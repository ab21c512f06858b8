//! Credential store: user registration and login lookup.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{debug, error};

use super::Storage;
use crate::entities::{prelude::*, users};
use crate::error::{AppError, Result};
use crate::models::user::NewUser;

/// Repository over the `users` table.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage: Storage,
}

impl CredentialStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a user, replacing the row when `id` is already taken.
    ///
    /// The password is stored as an Argon2 hash.
    pub async fn register(&self, user: NewUser) -> Result<users::Model> {
        let db = self.storage.conn();
        let explicit_id = user.id;
        let model = users::ActiveModel {
            id: user.id.map(Set).unwrap_or(NotSet),
            name: Set(user.name),
            email: Set(user.email),
            password: Set(hash_password(&user.password)?),
        };

        let result = Users::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::Id)
                    .update_columns([users::Column::Name, users::Column::Email, users::Column::Password])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        // SQLite does not report the row id of an upsert that updated
        let id = explicit_id.unwrap_or(result.last_insert_id);
        let stored = Users::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {id}")))?;

        debug!("Registered user {} <{}>", stored.id, stored.email);
        Ok(stored)
    }

    /// Return the user whose email and password both match exactly.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<users::Model>> {
        let candidates = Users::find()
            .filter(users::Column::Email.eq(email))
            .order_by_asc(users::Column::Id)
            .all(self.storage.conn())
            .await?;

        Ok(candidates.into_iter().find(|user| verify_password(password, &user.password)))
    }

    /// Check if an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Email.eq(email))
            .count(self.storage.conn())
            .await?;
        Ok(count > 0)
    }
}

fn hash_password(password: &str) -> Result<String> {
    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            AppError::Password(e.to_string())
        })
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(hash) => Argon2::default().verify_password(password.as_bytes(), &hash).is_ok(),
        Err(e) => {
            error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CredentialStore {
        CredentialStore::new(Storage::in_memory().await.unwrap())
    }

    fn ana() -> NewUser {
        NewUser {
            id: None,
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password: "1234".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = store().await;
        let registered = store.register(ana()).await.unwrap();

        let found = store.login("ana@x.com", "1234").await.unwrap().unwrap();
        assert_eq!(found.id, registered.id);
        assert_eq!(found.name, "Ana");
        assert_eq!(found.email, "ana@x.com");

        assert!(store.login("ana@x.com", "0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_exact_match() {
        let store = store().await;
        store.register(ana()).await.unwrap();

        assert!(store.login("ANA@x.com", "1234").await.unwrap().is_none());
        assert!(store.login("ana@x.com", "1234 ").await.unwrap().is_none());
        assert!(store.login("bob@x.com", "1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_not_stored_in_plaintext() {
        let store = store().await;
        let registered = store.register(ana()).await.unwrap();
        assert_ne!(registered.password, "1234");
        assert!(registered.password.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_register_replaces_on_same_id() {
        let store = store().await;
        let first = store.register(ana()).await.unwrap();

        let replacement = NewUser {
            id: Some(first.id),
            name: "Ana Maria".to_string(),
            email: "ana@x.com".to_string(),
            password: "5678".to_string(),
        };
        let second = store.register(replacement).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Ana Maria");
        assert!(store.login("ana@x.com", "1234").await.unwrap().is_none());
        assert!(store.login("ana@x.com", "5678").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_not_enforced() {
        let store = store().await;
        store.register(ana()).await.unwrap();
        let mut other = ana();
        other.password = "9999".to_string();
        store.register(other).await.unwrap();

        assert!(store.email_exists("ana@x.com").await.unwrap());
        assert!(store.login("ana@x.com", "1234").await.unwrap().is_some());
        assert!(store.login("ana@x.com", "9999").await.unwrap().is_some());
    }
}
