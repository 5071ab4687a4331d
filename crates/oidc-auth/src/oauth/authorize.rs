//! Authorization endpoint wire types.
//!
//! # Authorization Code Flow
//!
//! 1. The client sends the user agent to `/authorize` with an
//!    [`AuthenticationRequest`]
//! 2. Without a login session the user is sent to the login page, carrying
//!    the original request as an opaque `return_to` value
//! 3. With a session, consent is collected (if configured) and a code is
//!    issued
//! 4. The user agent is redirected back with an [`AuthenticationResponse`]

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::flags::{PromptSet, ResponseTypeSet, ScopeSet};

/// OpenID Connect authentication request.
///
/// Received as query parameters on `GET /authorize` and as form fields on
/// the consent `POST`. Missing parameters deserialize as empty and are
/// rejected by [`AuthenticationRequest::validate`].
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=c1
///   &redirect_uri=https://app/cb
///   &scope=openid email
///   &state=xyz
///   &nonce=n-0S6_WzA2Mj
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationRequest {
    pub client_id: String,

    /// Space-separated scopes; must include `openid`.
    pub scope: String,

    /// Space-separated response types; must include `code`.
    pub response_type: String,

    /// Must exactly match a registered redirect URI.
    pub redirect_uri: String,

    /// Opaque value echoed back to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Space-separated prompt values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Echoed into the ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub acr_values: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_hint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_locales: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,
}

impl AuthenticationRequest {
    /// Parsed `scope`.
    #[must_use]
    pub fn scopes(&self) -> ScopeSet {
        ScopeSet::parse(&self.scope)
    }

    /// Parsed `prompt`; unrecognized when absent.
    #[must_use]
    pub fn prompts(&self) -> PromptSet {
        PromptSet::parse(self.prompt.as_deref().unwrap_or_default())
    }

    /// Parsed `response_type`.
    #[must_use]
    pub fn response_types(&self) -> ResponseTypeSet {
        ResponseTypeSet::parse(&self.response_type)
    }

    /// Checks the request shape. Does not look at the client.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `client_id`, `redirect_uri`, `response_type` or
    ///   `scope` is missing, or `scope` lacks `openid`
    /// - `UnsupportedResponseType` if `response_type` has no `code`
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.is_empty() {
            return Err(AuthError::invalid_request("Missing client_id"));
        }

        if self.redirect_uri.is_empty() {
            return Err(AuthError::invalid_request("Missing redirect_uri"));
        }

        if self.response_type.is_empty() {
            return Err(AuthError::invalid_request("Missing response_type"));
        }

        if self.scope.is_empty() {
            return Err(AuthError::invalid_request("Missing scope"));
        }

        if !self.scopes().has(ScopeSet::OPENID) {
            return Err(AuthError::invalid_request("scope must include 'openid'"));
        }

        // only the code flow is served
        if !self.response_types().has(ResponseTypeSet::CODE) {
            return Err(AuthError::unsupported_response_type(&self.response_type));
        }

        Ok(())
    }

    /// Renders the request back into an `/authorize` query string.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the request cannot be serialized.
    pub fn to_query_string(&self) -> AuthResult<String> {
        let value = serde_json::to_value(self)
            .map_err(|e| AuthError::internal(format!("Failed to encode request: {}", e)))?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let serde_json::Value::Object(fields) = value {
            for (key, field) in fields {
                if let serde_json::Value::String(field) = field {
                    if !field.is_empty() {
                        query.append_pair(&key, &field);
                    }
                }
            }
        }
        Ok(query.finish())
    }
}

/// Encodes a request as an opaque login `return_to` value.
///
/// # Errors
///
/// Returns `Internal` if the request cannot be serialized.
pub fn encode_return_target(request: &AuthenticationRequest) -> AuthResult<String> {
    let json = serde_json::to_vec(request)
        .map_err(|e| AuthError::internal(format!("Failed to encode request: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a value produced by [`encode_return_target`].
///
/// # Errors
///
/// Returns `InvalidRequest` if the value is not a valid encoded request.
pub fn decode_return_target(value: &str) -> AuthResult<AuthenticationRequest> {
    let json = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| AuthError::invalid_request("Malformed return_to"))?;
    serde_json::from_slice(&json).map_err(|_| AuthError::invalid_request("Malformed return_to"))
}

/// Appends `key=value` to a URL that may be relative.
pub(crate) fn append_query(base: &str, key: &str, value: &str) -> String {
    let pair = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, pair)
}

/// Successful authorization response.
///
/// # Example
///
/// ```ignore
/// HTTP/1.1 303 See Other
/// Location: https://app/cb?code=SplxlOBeZQQYbYS6WxSbIA&state=xyz
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticationResponse {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed `state`, if the request had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthenticationResponse {
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}
