//! Token endpoint wire types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code`: exchange an authorization code for tokens
//! - `refresh_token`: reissue tokens from a refresh token

use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderName, PRAGMA};
use serde::{Deserialize, Serialize};

/// `grant_type` of the authorization code exchange.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// `grant_type` of refresh token reissue.
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Token request body.
///
/// Client credentials travel in the `Authorization` header, not here.
///
/// - `authorization_code`: `code`, `redirect_uri`
/// - `refresh_token`: `refresh_token`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,

    #[serde(default)]
    pub code: Option<String>,

    /// Must equal the redirect URI of the authorize request.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    /// Builds an `authorization_code` request.
    #[must_use]
    pub fn authorization_code(code: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            grant_type: GRANT_AUTHORIZATION_CODE.to_string(),
            code: Some(code.into()),
            redirect_uri: Some(redirect_uri.into()),
            refresh_token: None,
        }
    }

    /// Builds a `refresh_token` request.
    #[must_use]
    pub fn refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            grant_type: GRANT_REFRESH_TOKEN.to_string(),
            code: None,
            redirect_uri: None,
            refresh_token: Some(refresh_token.into()),
        }
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "refresh_token": "eyJhbG...",
///   "expires_in": 3600,
///   "id_token": "eyJhbG...",
///   "scope": "openid email"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    pub refresh_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Present for the `authorization_code` grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub scope: String,
}

impl TokenResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            refresh_token,
            expires_in,
            id_token: None,
            scope: String::new(),
        }
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: String) -> Self {
        self.id_token = Some(id_token);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Headers every token endpoint response carries (RFC 6749 5.1).
    #[must_use]
    pub fn headers() -> [(HeaderName, HeaderValue); 3] {
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (PRAGMA, HeaderValue::from_static("no-cache")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_deserialize() {
        let req: TokenRequest = serde_json::from_str(
            r#"{"grant_type":"authorization_code","code":"abc","redirect_uri":"https://app/cb"}"#,
        )
        .unwrap();
        assert_eq!(req.grant_type, GRANT_AUTHORIZATION_CODE);
        assert_eq!(req.code.as_deref(), Some("abc"));
        assert!(req.refresh_token.is_none());

        let empty: TokenRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.grant_type.is_empty());
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("at".to_string(), "rt".to_string(), 3600)
            .with_id_token("it".to_string())
            .with_scope("openid");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["access_token"], "at");
        assert_eq!(json["refresh_token"], "rt");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["id_token"], "it");
        assert_eq!(json["scope"], "openid");

        let bare = serde_json::to_value(TokenResponse::new("a".into(), "r".into(), 1)).unwrap();
        assert!(bare.get("id_token").is_none());
        assert!(bare.get("scope").is_none());
    }

    #[test]
    fn test_headers() {
        let headers = TokenResponse::headers();
        assert!(
            headers
                .iter()
                .any(|(name, value)| *name == CACHE_CONTROL && value == "no-store")
        );
        assert!(
            headers
                .iter()
                .any(|(name, value)| *name == PRAGMA && value == "no-cache")
        );
    }
}
