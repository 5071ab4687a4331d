//! Axum handlers for the authorize, token and login endpoints.
//!
//! No router is provided; mount the handlers with
//! `State<Arc<OidcProvider>>`:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/authorize", get(authorize_handler).post(approve_handler))
//!     .route("/token", post(token_handler))
//!     .route("/login", post(login_handler))
//!     .route("/logout", post(logout_handler))
//!     .with_state(provider);
//! ```
//!
//! Errors render as [`ErrorResponse`](crate::error::ErrorResponse) JSON,
//! including bodies or queries the extractors cannot parse, which are
//! `invalid_request`. Successful redirects are `303 See Other`.

pub mod authorize;
pub mod login;
pub mod token;

pub use authorize::{approve_handler, authorize_handler};
pub use login::{LoginForm, login_handler, logout_handler};
pub use token::token_handler;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AuthError;

/// Status code for an error.
pub(crate) fn error_status(error: &AuthError) -> StatusCode {
    StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// `invalid_request` for a query or body that failed to extract.
pub(crate) fn malformed_request(rejection: impl std::fmt::Display) -> AuthError {
    AuthError::invalid_request(format!("Malformed request: {}", rejection))
}

/// JSON error response echoing `state`.
pub(crate) fn error_response(error: &AuthError, state: Option<&str>) -> Response {
    if error.is_server_error() {
        tracing::error!(error = %error, category = %error.category(), "Request failed");
    } else {
        tracing::debug!(error = %error, category = %error.category(), "Request rejected");
    }

    (error_status(error), Json(error.to_response(state))).into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::http::header::{CONTENT_TYPE, LOCATION};
    use axum::response::Response;

    use crate::config::AuthConfig;
    use crate::password::{Argon2Hasher, PasswordHasher};
    use crate::provider::OidcProvider;
    use crate::storage::{InMemoryClientDirectory, InMemoryUserDirectory, User};
    use crate::token::jwt::JwtSigner;
    use crate::types::Client;

    pub const REDIRECT_URI: &str = "https://app.example.com/cb";

    pub fn provider() -> Arc<OidcProvider> {
        let hasher = Argon2Hasher::new();
        let clients: InMemoryClientDirectory = [Client::new("c1", "s1", [REDIRECT_URI])]
            .into_iter()
            .collect();
        let users: InMemoryUserDirectory =
            [User::new("u1", "alice", hasher.hash("wonderland").unwrap())]
                .into_iter()
                .collect();

        let mut config = AuthConfig::default();
        config.issuer = "https://auth.example.com".to_string();

        Arc::new(
            OidcProvider::new(
                config,
                Arc::new(clients),
                Arc::new(users),
                Arc::new(JwtSigner::from_secret("k1", b"test-secret").unwrap()),
                Arc::new(hasher),
            )
            .unwrap(),
        )
    }

    pub fn location(response: &Response) -> String {
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    /// `POST` request with the given content type and body.
    pub fn post(content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
