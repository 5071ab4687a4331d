//! ID token claims validation (OpenID Connect Core 3.1.3.7).
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. not expired
//! 2. not issued in the future
//! 3. issuer equals the expected issuer
//! 4. issuer is an HTTPS URL without query or fragment
//! 5. audience contains the expected client
//! 6. subject equals the expected subject
//! 7. subject is at most 255 characters
//! 8. nonce equals the expected nonce, when one is expected
//!
//! Signature verification is the signer's job; this module only looks at
//! claims.

use time::{Duration, OffsetDateTime};

use crate::token::jwt::IdTokenClaims;

/// Maximum `sub` length in characters.
pub const MAX_SUBJECT_LENGTH: usize = 255;

/// Reasons an ID token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdTokenError {
    #[error("ID token has expired")]
    Expired,

    #[error("ID token was issued in the future")]
    IssuedInFuture,

    #[error("Issuer mismatch: expected '{expected}', got '{actual}'")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Issuer must be an https URL without query or fragment: '{issuer}'")]
    IssuerNotHttps { issuer: String },

    #[error("ID token audience does not include '{audience}'")]
    AudienceMismatch { audience: String },

    #[error("Subject mismatch")]
    SubjectMismatch,

    #[error("Subject exceeds 255 characters ({length})")]
    SubjectTooLong { length: usize },

    #[error("Nonce mismatch")]
    NonceMismatch,
}

/// Values the claims are checked against.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedClaims<'a> {
    /// Client ID that must be in `aud`.
    pub audience: &'a str,

    pub issuer: &'a str,

    pub subject: &'a str,

    /// Nonce sent in the authentication request, if any.
    pub nonce: Option<&'a str>,
}

/// ID token claims validator.
#[derive(Debug, Clone, Default)]
pub struct IdTokenValidator {
    leeway: Duration,
}

impl IdTokenValidator {
    /// Creates a validator without clock-skew tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tolerates `leeway` of clock skew on `exp` and `iat`.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Validates `claims` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(
        &self,
        claims: &IdTokenClaims,
        expected: &ExpectedClaims<'_>,
        now: OffsetDateTime,
    ) -> Result<(), IdTokenError> {
        let now_ts = now.unix_timestamp();
        let leeway = self.leeway.whole_seconds();

        if now_ts.saturating_sub(leeway) >= claims.exp {
            return Err(IdTokenError::Expired);
        }

        if claims.iat > now_ts.saturating_add(leeway) {
            return Err(IdTokenError::IssuedInFuture);
        }

        if claims.iss != expected.issuer {
            return Err(IdTokenError::IssuerMismatch {
                expected: expected.issuer.to_string(),
                actual: claims.iss.clone(),
            });
        }

        if !is_https_issuer(&claims.iss) {
            return Err(IdTokenError::IssuerNotHttps {
                issuer: claims.iss.clone(),
            });
        }

        if !claims.aud.contains(expected.audience) {
            return Err(IdTokenError::AudienceMismatch {
                audience: expected.audience.to_string(),
            });
        }

        if claims.sub != expected.subject {
            return Err(IdTokenError::SubjectMismatch);
        }

        let length = claims.sub.chars().count();
        if length > MAX_SUBJECT_LENGTH {
            return Err(IdTokenError::SubjectTooLong { length });
        }

        if let Some(nonce) = expected.nonce {
            if claims.nonce.as_deref() != Some(nonce) {
                return Err(IdTokenError::NonceMismatch);
            }
        }

        Ok(())
    }
}

fn is_https_issuer(issuer: &str) -> bool {
    url::Url::parse(issuer).is_ok_and(|url| {
        url.scheme() == "https"
            && url.host_str().is_some()
            && url.query().is_none()
            && url.fragment().is_none()
    })
}
