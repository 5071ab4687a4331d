//! User directory.
//!
//! Users authenticate at the login endpoint; their profile sub-objects feed
//! the standard claims of the ID token.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// An end user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Stable user identifier, used as the token subject.
    pub id: String,

    /// Login name.
    pub username: String,

    /// PHC-format password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Claims released for the `profile` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileClaims>,

    /// Claims released for the `email` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailClaims>,

    /// Claims released for the `phone` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneClaims>,

    /// Claim released for the `address` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl User {
    /// Creates a user with no profile claims.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            profile: None,
            email: None,
            phone: None,
            address: None,
        }
    }
}

/// Standard `profile` scope claims (OIDC Core 5.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// `YYYY-MM-DD` or `YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoneinfo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Standard `email` scope claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailClaims {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// Standard `phone` scope claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhoneClaims {
    pub phone_number: String,
    #[serde(default)]
    pub phone_number_verified: bool,
}

/// Standard `address` claim (OIDC Core 5.1.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

// =============================================================================
// User Repository Trait
// =============================================================================

/// Read access to users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Finds a user by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;
}

/// [`UserRepository`] backed by a locked `HashMap` keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, replacing any user with the same id.
    pub fn insert(&self, user: User) {
        self.users.write().insert(user.id.clone(), user);
    }
}

impl FromIterator<User> for InMemoryUserDirectory {
    fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
        Self {
            users: RwLock::new(iter.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserDirectory {
    async fn get(&self, user_id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.read().get(user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_id_and_username() {
        let dir: InMemoryUserDirectory = [User::new("u1", "alice", "hash")].into_iter().collect();

        assert_eq!(dir.get("u1").await.unwrap().unwrap().username, "alice");
        assert_eq!(
            dir.find_by_username("alice").await.unwrap().unwrap().id,
            "u1"
        );
        assert!(dir.get("u2").await.unwrap().is_none());
        assert!(dir.find_by_username("bob").await.unwrap().is_none());
    }

    #[test]
    fn test_user_deserialize_with_claims() {
        let json = r#"{
            "id": "u1",
            "username": "alice",
            "password_hash": "$argon2id$...",
            "email": { "email": "alice@example.com", "email_verified": true },
            "address": { "locality": "Springfield", "country": "US" }
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.email.unwrap().email, "alice@example.com");
        assert_eq!(user.address.unwrap().locality.as_deref(), Some("Springfield"));
        assert!(user.profile.is_none());
        assert!(user.phone.is_none());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("u1", "alice", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
