//! Client authentication at the token endpoint.
//!
//! Only `client_secret_basic` is supported: the client sends
//! `Authorization: Basic base64(client_id:client_secret)`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ClientRepository;
use crate::types::Client;

/// Parses HTTP Basic credentials.
///
/// Returns `None` if the header is not `Basic`, not valid base64/UTF-8, or
/// has no `:` separator. The secret may itself contain colons.
///
/// ```ignore
/// let (id, secret) = parse_basic_auth("Basic YzE6czE=").unwrap();
/// assert_eq!((id.as_str(), secret.as_str()), ("c1", "s1"));
/// ```
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (client_id, client_secret) = credentials.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }

    Some((client_id.to_string(), client_secret.to_string()))
}

/// Authenticates a client from its `Authorization` header.
///
/// # Errors
///
/// - `InvalidClient` if the header is missing or malformed
/// - `UnauthorizedClient` if the client is unknown or the secret is wrong
pub async fn authenticate_client(
    clients: &dyn ClientRepository,
    authorization: Option<&str>,
) -> AuthResult<Client> {
    let (client_id, client_secret) = authorization
        .and_then(parse_basic_auth)
        .ok_or_else(|| AuthError::invalid_client("Missing or malformed Basic credentials"))?;

    match clients.get_by_credentials(&client_id, &client_secret).await? {
        Some(client) => Ok(client),
        None => {
            tracing::warn!(client_id = %client_id, "Client authentication failed");
            Err(AuthError::unauthorized_client("Invalid client credentials"))
        }
    }
}
