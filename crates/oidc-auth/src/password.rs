//! Password hashing.
//!
//! The login flow only needs `verify`; `hash` is used when provisioning
//! users. [`Argon2Hasher`] stores hashes as PHC strings:
//!
//! ```
//! use oidc_auth::password::{Argon2Hasher, PasswordHasher};
//!
//! let hasher = Argon2Hasher::new();
//! let hash = hasher.hash("correct horse").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(hasher.verify(&hash, "correct horse"));
//! ```

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::AuthResult;
use crate::error::AuthError;

/// Opaque password hash/verify primitive.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if hashing fails.
    fn hash(&self, plain: &str) -> AuthResult<String>;

    /// Returns `true` if `candidate` matches `hash`.
    ///
    /// A malformed hash never matches.
    fn verify(&self, hash: &str, candidate: &str) -> bool;
}

/// Argon2id with default parameters and a random salt per hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, hash: &str, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "s3cret"));
        assert!(!hasher.verify(&hash, "s3cre"));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2Hasher::new();
        let h1 = hasher.hash("same").unwrap();
        let h2 = hasher.hash("same").unwrap();
        assert_ne!(h1, h2);
        assert!(hasher.verify(&h1, "same"));
        assert!(hasher.verify(&h2, "same"));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = Argon2Hasher::new();
        assert!(!hasher.verify("not-a-hash", "anything"));
        assert!(!hasher.verify("", ""));
    }
}
