//! JWT signing and token claim sets.
//!
//! The authorization and token services only see the [`TokenSigner`] trait:
//! `sign` turns a claim set into a compact JWS, `parse` verifies the
//! signature and returns the claims. Temporal and identity checks on ID
//! tokens are done by [`crate::token::validation::IdTokenValidator`].
//!
//! [`JwtSigner`] is the `jsonwebtoken` backed implementation:
//!
//! - **HS256**: shared secret
//! - **RS256**: RSA key pair from PEM
//! - **ES384**: P-384 key pair from PEM, or an ephemeral generated key
//!
//! ```ignore
//! use oidc_auth::token::jwt::{JwtSigner, TokenSigner};
//!
//! let signer = JwtSigner::generate_ec()?;
//! let token = signer.sign(&serde_json::json!({"sub": "u1"}))?;
//! let claims = signer.parse(&token)?;
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::SigningKey as EcSigningKey;
use p384::pkcs8::{EncodePrivateKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SigningConfig;
use crate::storage::user::{Address, EmailClaims, PhoneClaims, ProfileClaims};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while signing or parsing tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256, shared secret.
    HS256,
    /// RSA with SHA-256.
    RS256,
    /// ECDSA with the P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::RS256 => Algorithm::RS256,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::RS256 => "RS256",
            Self::ES384 => "ES384",
        }
    }

    /// Parses an algorithm name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HS256" => Some(Self::HS256),
            "RS256" => Some(Self::RS256),
            "ES384" => Some(Self::ES384),
            _ => None,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user ID).
    pub sub: String,

    /// Audience (client ID).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT ID.
    pub jti: String,

    /// Space-separated granted scopes.
    pub scope: String,

    /// OAuth client ID.
    pub client_id: String,
}

/// Marker value of [`RefreshTokenClaims::token_use`].
pub const REFRESH_TOKEN_USE: &str = "refresh";

/// Refresh token claims.
///
/// Refresh tokens are self-contained signed tokens; reissue only checks the
/// signature, `token_use`, expiry and the presenting client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub scope: String,
    pub client_id: String,
    /// Always `"refresh"`.
    pub token_use: String,
}

/// The `aud` claim: a single value or an array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Returns `true` if `aud` is one of the audiences.
    #[must_use]
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Self::Single(value) => value == aud,
            Self::Multiple(values) => values.iter().any(|v| v == aud),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

/// ID token claims for OpenID Connect.
///
/// Standard claims for the `profile`, `email` and `phone` scopes are flattened
/// into the top level; `address` is a nested object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user ID).
    pub sub: String,

    /// Audience (client ID).
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Time the user authenticated (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Nonce from the authentication request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileClaims>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailClaims>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneClaims>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl IdTokenClaims {
    /// Creates claims with only the required fields set.
    #[must_use]
    pub fn new(
        iss: impl Into<String>,
        sub: impl Into<String>,
        aud: impl Into<String>,
        iat: i64,
        exp: i64,
    ) -> Self {
        Self {
            iss: iss.into(),
            sub: sub.into(),
            aud: Audience::Single(aud.into()),
            exp,
            iat,
            auth_time: None,
            nonce: None,
            profile: None,
            email: None,
            phone: None,
            address: None,
        }
    }
}

// ============================================================================
// Signer
// ============================================================================

/// Signs and parses claim sets.
///
/// Implementations must be cheap to call from request handlers; they are
/// never invoked while a store lock is held.
pub trait TokenSigner: Send + Sync {
    /// Signs a claim set into a compact token.
    fn sign(&self, claims: &Value) -> Result<String, JwtError>;

    /// Verifies a token's signature and returns its claims.
    ///
    /// No temporal checks are applied.
    fn parse(&self, token: &str) -> Result<Value, JwtError>;
}

/// [`TokenSigner`] backed by `jsonwebtoken`.
pub struct JwtSigner {
    kid: String,
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtSigner {
    /// Creates an HS256 signer from a shared secret.
    ///
    /// # Errors
    /// Returns an error if the secret is empty.
    pub fn from_secret(kid: impl Into<String>, secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::invalid_key("HS256 secret must not be empty"));
        }

        Ok(Self {
            kid: kid.into(),
            algorithm: SigningAlgorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Loads an RS256 or ES384 signer from PEM strings.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid or the algorithm is HS256.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let (encoding_key, decoding_key) = match algorithm {
            SigningAlgorithm::RS256 => (
                EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
            ),
            SigningAlgorithm::ES384 => (
                EncodingKey::from_ec_pem(private_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
                DecodingKey::from_ec_pem(public_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
            ),
            SigningAlgorithm::HS256 => {
                return Err(JwtError::invalid_key("HS256 is not a PEM algorithm"));
            }
        };

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
            decoding_key,
        })
    }

    /// Generates an ephemeral ES384 key pair.
    ///
    /// Tokens signed with it cannot be verified after a restart.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_ec() -> Result<Self, JwtError> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        let signing_key = EcSigningKey::from(&secret_key);

        let point = signing_key.verifying_key().to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| JwtError::key_generation_error("Missing x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| JwtError::key_generation_error("Missing y coordinate"))?;

        // jsonwebtoken only accepts PKCS8 PEM for EC private keys
        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let x_b64 = URL_SAFE_NO_PAD.encode(x.as_slice());
        let y_b64 = URL_SAFE_NO_PAD.encode(y.as_slice());
        let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            kid: uuid::Uuid::new_v4().to_string(),
            algorithm: SigningAlgorithm::ES384,
            encoding_key,
            decoding_key,
        })
    }

    /// Builds a signer from configuration.
    ///
    /// ES384 without PEM material falls back to [`Self::generate_ec`].
    ///
    /// # Errors
    /// Returns an error if the algorithm is unknown or key material is missing.
    pub fn from_config(config: &SigningConfig) -> Result<Self, JwtError> {
        let algorithm = SigningAlgorithm::parse(&config.algorithm).ok_or_else(|| {
            JwtError::invalid_key(format!("Unknown algorithm: {}", config.algorithm))
        })?;
        let kid = config.kid.clone().unwrap_or_else(|| "default".to_string());

        match (
            algorithm,
            config.private_key_pem.as_deref(),
            config.public_key_pem.as_deref(),
        ) {
            (SigningAlgorithm::HS256, _, _) => {
                let secret = config
                    .secret
                    .as_deref()
                    .ok_or_else(|| JwtError::invalid_key("Missing HS256 secret"))?;
                Self::from_secret(kid, secret.as_bytes())
            }
            (_, Some(private_pem), Some(public_pem)) => {
                Self::from_pem(kid, algorithm, private_pem, public_pem)
            }
            (SigningAlgorithm::ES384, None, None) => {
                tracing::warn!("No ES384 key configured, generating an ephemeral key");
                Self::generate_ec()
            }
            _ => Err(JwtError::invalid_key(format!(
                "{} requires both private and public PEM keys",
                algorithm
            ))),
        }
    }

    /// Returns the key ID placed in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &Value) -> Result<String, JwtError> {
        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    fn parse(&self, token: &str) -> Result<Value, JwtError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Value>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
