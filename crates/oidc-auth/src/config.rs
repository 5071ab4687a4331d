//! Authorization server configuration.
//!
//! Configuration is plain data: callers deserialize it from whatever source
//! they use and hand it to [`crate::OidcProvider::new`], which validates it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://auth.example.com"
///
/// [oauth]
/// authorization_code_lifetime = "10m"
/// access_token_lifetime = "1h"
///
/// [session]
/// lifetime = "24h"
/// sweep_interval = "1m"
///
/// [lockout]
/// max_failed_attempts = 5
/// lockout_duration = "5m"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL placed in the `iss` claim of every token.
    pub issuer: String,

    /// Code and token lifetimes.
    pub oauth: OAuthConfig,

    /// Login session settings.
    pub session: SessionConfig,

    /// Failed-login throttling.
    pub lockout: LockoutConfig,

    /// Paths of the interactive pages and the authorize endpoint.
    pub endpoints: EndpointConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            oauth: OAuthConfig::default(),
            session: SessionConfig::default(),
            lockout: LockoutConfig::default(),
            endpoints: EndpointConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// Authorization code and token lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Show a consent page before issuing a code.
    /// When false, an authorize request with an active session issues the
    /// code directly.
    pub require_consent: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            id_token_lifetime: Duration::from_secs(3600),
            require_consent: false,
        }
    }
}

/// Login session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a login session stays valid.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// How often the background sweep runs.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Maximum number of entries inspected per sweep tick.
    pub sweep_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(24 * 3600),
            cookie_name: "sid".to_string(),
            sweep_interval: Duration::from_secs(60),
            sweep_batch_size: 1000,
        }
    }
}

/// Failed-login throttling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failures after which the identity is locked.
    pub max_failed_attempts: u32,

    /// How long a lock lasts, counted from the last failed attempt.
    #[serde(with = "humantime_serde")]
    pub lockout_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Locations the authorize flow redirects to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Login page. Receives the original request in `return_to`.
    pub login_url: String,

    /// Consent page.
    pub consent_url: String,

    /// Authorize endpoint, used to resume a flow after login.
    pub authorize_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login_url: "/login".to_string(),
            consent_url: "/consent".to_string(),
            authorize_url: "/authorize".to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm: HS256, RS256, or ES384.
    pub algorithm: String,

    /// Key identifier placed in the JWT header.
    pub kid: Option<String>,

    /// Shared secret for HS256.
    pub secret: Option<String>,

    /// PEM-encoded private key for RS256/ES384.
    pub private_key_pem: Option<String>,

    /// PEM-encoded public key for RS256/ES384.
    pub public_key_pem: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "ES384".to_string(),
            kid: None,
            secret: None,
            private_key_pem: None,
            public_key_pem: None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

/// Upper bound for every configured lifetime and interval.
pub const MAX_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The issuer is empty or not an HTTPS URL (loopback HTTP is allowed)
    /// - Any lifetime, threshold, or sweep setting is zero
    /// - Any lifetime exceeds [`MAX_LIFETIME`]
    /// - The signing algorithm is unknown or its key material is missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        let issuer = url::Url::parse(&self.issuer)
            .map_err(|e| ConfigError::InvalidValue(format!("issuer is not a URL: {}", e)))?;
        let loopback = matches!(issuer.host_str(), Some("localhost" | "127.0.0.1"));
        if issuer.scheme() != "https" && !loopback {
            return Err(ConfigError::InvalidValue(
                "issuer must use https".to_string(),
            ));
        }

        for (name, value) in [
            (
                "authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
            ("id_token_lifetime", self.oauth.id_token_lifetime),
            ("session lifetime", self.session.lifetime),
            ("sweep_interval", self.session.sweep_interval),
            ("lockout_duration", self.lockout.lockout_duration),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{} must be > 0", name)));
            }
            if value > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must not exceed 10 years",
                    name
                )));
            }
        }

        if self.session.sweep_batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "sweep_batch_size must be > 0".to_string(),
            ));
        }

        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Missing("session cookie_name".to_string()));
        }

        if self.lockout.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_failed_attempts must be > 0".to_string(),
            ));
        }

        match self.signing.algorithm.as_str() {
            "HS256" => {
                if self.signing.secret.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::Missing("signing secret for HS256".to_string()));
                }
            }
            "RS256" => {
                if self.signing.private_key_pem.is_none() || self.signing.public_key_pem.is_none()
                {
                    return Err(ConfigError::Missing("signing PEM keys for RS256".to_string()));
                }
            }
            // ES384 falls back to an ephemeral key when no PEM is given.
            "ES384" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{}'. Must be HS256, RS256, or ES384",
                    other
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "http://localhost:8080");
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.signing.algorithm, "ES384");
        assert!(!config.oauth.require_consent);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_issuer_fails_validation() {
        let mut config = AuthConfig::default();
        config.issuer = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_plain_http_issuer_fails_validation() {
        let mut config = AuthConfig::default();
        config.issuer = "http://auth.example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("https"));

        config.issuer = "https://auth.example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_lifetime_fails_validation() {
        let mut config = AuthConfig::default();
        config.oauth.authorization_code_lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("authorization_code_lifetime"));
    }

    #[test]
    fn test_out_of_range_lifetime_fails_validation() {
        let mut config = AuthConfig::default();
        config.session.lifetime = Duration::from_secs(20_000 * 365 * 24 * 3600);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session lifetime"));

        let mut config = AuthConfig::default();
        config.oauth.refresh_token_lifetime = MAX_LIFETIME + Duration::from_secs(1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_token_lifetime"));

        config.oauth.refresh_token_lifetime = MAX_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_fails_validation() {
        let mut config = AuthConfig::default();
        config.lockout.max_failed_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_failed_attempts"));
    }

    #[test]
    fn test_zero_sweep_batch_fails_validation() {
        let mut config = AuthConfig::default();
        config.session.sweep_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hs256_requires_secret() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "HS256".to_string();
        assert!(config.validate().is_err());

        config.signing.secret = Some("a-long-enough-shared-secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_algorithm_fails_validation() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "none".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("signing algorithm"));
    }

    #[test]
    fn test_deserialize_humantime() {
        let json = r#"{
            "issuer": "https://auth.example.com",
            "oauth": { "authorization_code_lifetime": "2m" },
            "session": { "lifetime": "8h", "sweep_interval": "30s" },
            "lockout": { "max_failed_attempts": 3, "lockout_duration": "15m" }
        }"#;

        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.oauth.authorization_code_lifetime,
            Duration::from_secs(120)
        );
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(config.session.lifetime, Duration::from_secs(8 * 3600));
        assert_eq!(config.session.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.lockout.max_failed_attempts, 3);
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("required_field".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: required_field"
        );
    }
}
