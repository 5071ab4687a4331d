//! Token endpoint handler.
//!
//! ```ignore
//! POST /token
//! Authorization: Basic <base64(client_id:client_secret)>
//! Content-Type: application/json
//!
//! {"grant_type": "authorization_code", "code": "...", "redirect_uri": "https://app/cb"}
//! ```

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::{error_status, malformed_request};
use crate::error::AuthError;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::provider::OidcProvider;

/// `POST /token`.
///
/// Success and error bodies both carry `Cache-Control: no-store` and
/// `Pragma: no-cache`, including the error for a body that is not JSON.
pub async fn token_handler(
    State(provider): State<Arc<OidcProvider>>,
    headers: HeaderMap,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return token_error_response(&malformed_request(rejection)),
    };

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match provider.tokens().exchange(authorization, &request).await {
        Ok(response) => token_success_response(response),
        Err(error) => token_error_response(&error),
    }
}

fn token_success_response(response: TokenResponse) -> Response {
    (StatusCode::OK, TokenResponse::headers(), Json(response)).into_response()
}

fn token_error_response(error: &AuthError) -> Response {
    if error.is_server_error() {
        tracing::error!(error = %error, "Token request failed");
    } else {
        tracing::debug!(error = %error, category = %error.category(), "Token request rejected");
    }
    (
        error_status(error),
        TokenResponse::headers(),
        Json(error.to_response(None)),
    )
        .into_response()
}
