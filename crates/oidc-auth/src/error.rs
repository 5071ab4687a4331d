//! Authentication and authorization error types.
//!
//! Every failure surfaced by the authorize, token, and login flows is an
//! [`AuthError`]. Each variant maps to an OAuth 2.0 / OpenID Connect error
//! code, an HTTP status, and an [`ErrorCategory`] used for logging.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::jwt::JwtError;
use crate::token::validation::IdTokenError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a required parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client credentials were missing or could not be parsed.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The client is unknown or presented a wrong secret.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// The request was refused, e.g. an unregistered redirect URI.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The authorization code is unknown, expired, already used, or was
    /// issued to another client.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested response type is not supported.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The requested grant type is not supported.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The request forbade interaction but the user is not logged in.
    #[error("Login required")]
    LoginRequired,

    /// The request forbade interaction but consent has to be collected.
    #[error("Consent required")]
    ConsentRequired,

    /// Too many failed login attempts for this identity.
    #[error("Account temporarily locked")]
    AccountLocked,

    /// The username or password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// ID token claims failed validation.
    #[error("Invalid ID token: {0}")]
    InvalidIdToken(#[from] IdTokenError),

    /// Signing or parsing a token failed.
    #[error("Signing error: {0}")]
    Signing(#[from] JwtError),

    /// A repository or store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Signing(_)
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is an authentication failure (HTTP 401).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient { .. }
                | Self::UnauthorizedClient { .. }
                | Self::InvalidCredentials
                | Self::AccountLocked
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::InvalidClient { .. }
            | Self::UnauthorizedClient { .. }
            | Self::AccessDenied { .. } => ErrorCategory::Client,
            Self::LoginRequired | Self::ConsentRequired => ErrorCategory::Interaction,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::AccountLocked | Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::InvalidIdToken(_) | Self::Signing(_) => ErrorCategory::Token,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 / OpenID Connect error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::LoginRequired => "login_required",
            Self::ConsentRequired => "consent_required",
            Self::AccountLocked | Self::InvalidCredentials => "access_denied",
            Self::InvalidIdToken(_) => "invalid_token",
            Self::Signing(_)
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code used when rendering this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        if self.is_server_error() {
            500
        } else if self.is_authentication_error() {
            401
        } else {
            400
        }
    }

    /// Builds the JSON wire body for this error, echoing `state` if given.
    #[must_use]
    pub fn to_response(&self, state: Option<&str>) -> ErrorResponse {
        // Server-side details stay in the logs.
        let description = if self.is_server_error() {
            "The server encountered an unexpected condition".to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            error: self.oauth_error_code().to_string(),
            error_description: Some(description),
            error_uri: None,
            state: state.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}

/// Error body returned by the authorize and token endpoints.
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Invalid grant: authorization code not found",
///   "state": "xyz"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Link to a page describing the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,

    /// Echoed `state` from the authentication request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or incomplete requests.
    Validation,
    /// Unknown clients, bad secrets, redirect URI mismatches.
    Client,
    /// Interaction forbidden by the request but required.
    Interaction,
    /// Authorization code problems.
    Grant,
    /// End-user login failures.
    Authentication,
    /// Token signing and ID token validation.
    Token,
    /// Repository failures.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Client => write!(f, "client"),
            Self::Interaction => write!(f, "interaction"),
            Self::Grant => write!(f, "grant"),
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
