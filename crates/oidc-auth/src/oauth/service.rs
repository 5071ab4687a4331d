//! Authorization service.
//!
//! Drives the authorize endpoint: validates the request and the client,
//! consults the login session, and either sends the user to login or
//! consent, or issues an authorization code.
//!
//! ```text
//! Received -> RequestValidated -> ClientValidated
//!     -> no session  -> Login (or login_required for prompt=none)
//!     -> session     -> Consent | CodeIssued -> Redirect
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let service = AuthorizationService::new(clients, sessions, codes, AuthorizationConfig::default());
//!
//! match service.authorize(&request, session_id).await? {
//!     AuthorizeOutcome::Login { redirect_url } => { /* 303 to login */ }
//!     AuthorizeOutcome::Consent { request, user_id } => { /* render consent */ }
//!     AuthorizeOutcome::Redirect { redirect_url } => { /* 303 to client */ }
//! }
//! ```

use std::sync::Arc;

use time::Duration;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthenticationRequest, AuthenticationResponse, append_query, encode_return_target,
};
use crate::oauth::flags::PromptSet;
use crate::storage::code::{CodeGrant, CodeStore};
use crate::storage::session::{Session, SessionStore};
use crate::storage::{ClientRepository, to_time_duration};
use crate::types::Client;

/// Configuration for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Authorization code lifetime.
    /// Default: 10 minutes.
    pub code_lifetime: Duration,

    /// Collect consent before issuing a code.
    /// Default: false.
    pub require_consent: bool,

    /// Login page.
    pub login_url: String,

    /// Consent page.
    pub consent_url: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::minutes(10),
            require_consent: false,
            login_url: "/login".to_string(),
            consent_url: "/consent".to_string(),
        }
    }
}

impl AuthorizationConfig {
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.code_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_consent_required(mut self, required: bool) -> Self {
        self.require_consent = required;
        self
    }

    #[must_use]
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    #[must_use]
    pub fn with_consent_url(mut self, url: impl Into<String>) -> Self {
        self.consent_url = url.into();
        self
    }
}

impl From<&AuthConfig> for AuthorizationConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            code_lifetime: to_time_duration(config.oauth.authorization_code_lifetime),
            require_consent: config.oauth.require_consent,
            login_url: config.endpoints.login_url.clone(),
            consent_url: config.endpoints.consent_url.clone(),
        }
    }
}

/// Result of a `GET /authorize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// No usable session: send the user to the login page.
    Login {
        /// Login URL carrying the original request in `return_to`.
        redirect_url: String,
    },

    /// Consent has to be collected before a code is issued.
    Consent {
        request: AuthenticationRequest,
        user_id: String,
    },

    /// A code was issued.
    Redirect {
        /// Client redirect URI with `code` and `state`.
        redirect_url: String,
    },
}

/// Authorization service for the authorize endpoint.
pub struct AuthorizationService {
    clients: Arc<dyn ClientRepository>,
    sessions: Arc<SessionStore>,
    codes: Arc<CodeStore>,
    config: AuthorizationConfig,
}

impl AuthorizationService {
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        sessions: Arc<SessionStore>,
        codes: Arc<CodeStore>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            clients,
            sessions,
            codes,
            config,
        }
    }

    /// Handles `GET /authorize`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` / `UnsupportedResponseType` for a malformed request
    /// - `AccessDenied` for an unknown client or unregistered redirect URI
    /// - `LoginRequired` for `prompt=none` without a session
    /// - `ConsentRequired` for `prompt=none` when consent must be collected
    pub async fn authorize(
        &self,
        request: &AuthenticationRequest,
        session_id: Option<&str>,
    ) -> AuthResult<AuthorizeOutcome> {
        tracing::debug!(
            client_id = %request.client_id,
            response_type = %request.response_type,
            "Authorization request received"
        );

        // 1. Validate request shape
        request.validate()?;
        let prompts = request.prompts();
        if prompts.has(PromptSet::NONE) && !prompts.is(PromptSet::NONE) {
            return Err(AuthError::invalid_request(
                "prompt=none must not be combined with other values",
            ));
        }

        // 2. Validate client and redirect_uri
        self.resolve_client(request).await?;

        // 3. Look up the login session
        let session = session_id.and_then(|id| self.sessions.get(id));

        let Some(session) = session else {
            // the caller forbade interaction
            if prompts.is(PromptSet::NONE) {
                return Err(AuthError::LoginRequired);
            }
            return Ok(AuthorizeOutcome::Login {
                redirect_url: self.login_redirect_url(request)?,
            });
        };

        // 4. prompt=login forces re-authentication
        if prompts.has(PromptSet::LOGIN) {
            return Ok(AuthorizeOutcome::Login {
                redirect_url: self.login_redirect_url(request)?,
            });
        }

        // 5. Consent or direct issuance
        if self.config.require_consent || prompts.has(PromptSet::CONSENT) {
            if prompts.is(PromptSet::NONE) {
                return Err(AuthError::ConsentRequired);
            }
            return Ok(AuthorizeOutcome::Consent {
                request: request.clone(),
                user_id: session.user_id,
            });
        }

        let redirect_url = self.issue_code(request, &session)?;
        Ok(AuthorizeOutcome::Redirect { redirect_url })
    }

    /// Handles the consent `POST /authorize`.
    ///
    /// Returns the client redirect URL carrying `code` and `state`.
    ///
    /// # Errors
    ///
    /// - `LoginRequired` without an active session
    /// - `InvalidRequest` / `UnsupportedResponseType` for a malformed request
    /// - `AccessDenied` for an unknown client or unregistered redirect URI
    pub async fn approve(
        &self,
        request: &AuthenticationRequest,
        session_id: Option<&str>,
    ) -> AuthResult<String> {
        // 1. Require an active session
        let session = session_id
            .and_then(|id| self.sessions.get(id))
            .ok_or(AuthError::LoginRequired)?;

        // 2. Re-validate the request
        request.validate()?;

        // 3. Validate client and redirect_uri
        self.resolve_client(request).await?;

        // 4. Issue the code
        self.issue_code(request, &session)
    }

    /// Login page URL carrying `request` as `return_to`.
    ///
    /// `login` is dropped from the carried prompt so the resumed request
    /// does not loop back to the login page.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the request cannot be encoded.
    pub fn login_redirect_url(&self, request: &AuthenticationRequest) -> AuthResult<String> {
        let mut resume = request.clone();
        let prompts = request.prompts();
        if prompts.has(PromptSet::LOGIN) {
            let remaining: Vec<&str> = prompts.tokens().filter(|t| *t != "login").collect();
            resume.prompt = (!remaining.is_empty()).then(|| remaining.join(" "));
        }

        let target = encode_return_target(&resume)?;
        Ok(append_query(&self.config.login_url, "return_to", &target))
    }

    /// Consent page URL carrying `request` as `return_to`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the request cannot be encoded.
    pub fn consent_redirect_url(&self, request: &AuthenticationRequest) -> AuthResult<String> {
        let target = encode_return_target(request)?;
        Ok(append_query(&self.config.consent_url, "return_to", &target))
    }

    async fn resolve_client(&self, request: &AuthenticationRequest) -> AuthResult<Client> {
        let client = self
            .clients
            .get(&request.client_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(client_id = %request.client_id, "Authorization for unknown client");
                AuthError::access_denied("Unknown client")
            })?;

        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            tracing::warn!(
                client_id = %request.client_id,
                redirect_uri = %request.redirect_uri,
                "Unregistered redirect_uri"
            );
            return Err(AuthError::access_denied(
                "redirect_uri is not registered for this client",
            ));
        }

        Ok(client)
    }

    fn issue_code(&self, request: &AuthenticationRequest, session: &Session) -> AuthResult<String> {
        // reject before storing anything
        url::Url::parse(&request.redirect_uri)
            .map_err(|_| AuthError::invalid_request("redirect_uri must be an absolute URL"))?;

        let grant = CodeGrant {
            client_id: request.client_id.clone(),
            user_id: session.user_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope: request.scopes(),
            nonce: request.nonce.clone(),
            auth_time: Some(session.created_at),
        };
        let code = self.codes.issue(grant, self.config.code_lifetime);

        tracing::info!(
            client_id = %request.client_id,
            user_id = %session.user_id,
            "Authorization code issued"
        );

        AuthenticationResponse::new(code, request.state.clone())
            .to_redirect_url(&request.redirect_uri)
            .map_err(|e| AuthError::internal(format!("Failed to build redirect URL: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::authorize::decode_return_target;
    use crate::storage::InMemoryClientDirectory;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        service: AuthorizationService,
        sessions: Arc<SessionStore>,
        codes: Arc<CodeStore>,
    }

    fn fixture(config: AuthorizationConfig) -> Fixture {
        let clients: InMemoryClientDirectory = [Client::new("c1", "secret", ["https://app/cb"])]
            .into_iter()
            .collect();
        let sessions = Arc::new(SessionStore::new(Duration::hours(1)));
        let codes = Arc::new(CodeStore::new());
        let service =
            AuthorizationService::new(Arc::new(clients), sessions.clone(), codes.clone(), config);
        Fixture {
            service,
            sessions,
            codes,
        }
    }

    fn request() -> AuthenticationRequest {
        AuthenticationRequest {
            client_id: "c1".to_string(),
            scope: "openid".to_string(),
            response_type: "code".to_string(),
            redirect_uri: "https://app/cb".to_string(),
            state: Some("xyz".to_string()),
            ..Default::default()
        }
    }

    fn login(f: &Fixture) -> String {
        f.sessions.create("u1").session_id.to_string()
    }

    #[tokio::test]
    async fn test_session_present_issues_code() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);

        let outcome = assert_ok!(f.service.authorize(&request(), Some(&sid)).await);
        let AuthorizeOutcome::Redirect { redirect_url } = outcome else {
            panic!("expected redirect, got {:?}", outcome);
        };

        let url = url::Url::parse(&redirect_url).unwrap();
        assert_eq!(url.host_str(), Some("app"));
        assert_eq!(url.path(), "/cb");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["state"], "xyz");

        let grant = f.codes.redeem(&pairs["code"]).unwrap();
        assert_eq!(grant.client_id, "c1");
        assert_eq!(grant.user_id, "u1");
        assert_eq!(grant.redirect_uri, "https://app/cb");
    }

    #[tokio::test]
    async fn test_unregistered_redirect_uri_denied() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);
        let mut req = request();
        req.redirect_uri = "https://evil/cb".to_string();

        let err = assert_err!(f.service.authorize(&req, Some(&sid)).await);
        assert_eq!(err.oauth_error_code(), "access_denied");
        assert!(f.codes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client_denied() {
        let f = fixture(AuthorizationConfig::default());
        let mut req = request();
        req.client_id = "c2".to_string();

        let err = assert_err!(f.service.authorize(&req, None).await);
        assert!(matches!(err, AuthError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_no_session_redirects_to_login() {
        let f = fixture(AuthorizationConfig::default().with_login_url("https://idp/login"));

        let outcome = assert_ok!(f.service.authorize(&request(), None).await);
        let AuthorizeOutcome::Login { redirect_url } = outcome else {
            panic!("expected login, got {:?}", outcome);
        };

        let url = url::Url::parse(&redirect_url).unwrap();
        assert_eq!(url.path(), "/login");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "return_to");
        assert_eq!(decode_return_target(&value).unwrap(), request());
        assert!(f.codes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_redirects_to_login() {
        let f = fixture(AuthorizationConfig::default());
        let outcome = assert_ok!(f.service.authorize(&request(), Some("bogus")).await);
        assert!(matches!(outcome, AuthorizeOutcome::Login { .. }));
    }

    #[tokio::test]
    async fn test_prompt_none_without_session() {
        let f = fixture(AuthorizationConfig::default());
        let mut req = request();
        req.prompt = Some("none".to_string());

        let err = assert_err!(f.service.authorize(&req, None).await);
        assert!(matches!(err, AuthError::LoginRequired));
        assert_eq!(err.oauth_error_code(), "login_required");
    }

    #[tokio::test]
    async fn test_prompt_none_with_session_issues_code() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);
        let mut req = request();
        req.prompt = Some("none".to_string());

        let outcome = assert_ok!(f.service.authorize(&req, Some(&sid)).await);
        assert!(matches!(outcome, AuthorizeOutcome::Redirect { .. }));
    }

    #[tokio::test]
    async fn test_prompt_none_combined_rejected() {
        let f = fixture(AuthorizationConfig::default());
        let mut req = request();
        req.prompt = Some("none login".to_string());

        let err = assert_err!(f.service.authorize(&req, None).await);
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_prompt_login_forces_login_and_is_stripped() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);
        let mut req = request();
        req.prompt = Some("login consent".to_string());

        let outcome = assert_ok!(f.service.authorize(&req, Some(&sid)).await);
        let AuthorizeOutcome::Login { redirect_url } = outcome else {
            panic!("expected login, got {:?}", outcome);
        };

        let encoded = redirect_url.split("return_to=").nth(1).unwrap();
        let resumed = decode_return_target(encoded).unwrap();
        assert_eq!(resumed.prompt.as_deref(), Some("consent"));
    }

    #[tokio::test]
    async fn test_consent_required_by_config() {
        let f = fixture(AuthorizationConfig::default().with_consent_required(true));
        let sid = login(&f);

        let outcome = assert_ok!(f.service.authorize(&request(), Some(&sid)).await);
        assert_eq!(
            outcome,
            AuthorizeOutcome::Consent {
                request: request(),
                user_id: "u1".to_string(),
            }
        );
        assert!(f.codes.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_consent_forces_consent() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);
        let mut req = request();
        req.prompt = Some("consent".to_string());

        let outcome = assert_ok!(f.service.authorize(&req, Some(&sid)).await);
        assert!(matches!(outcome, AuthorizeOutcome::Consent { .. }));
    }

    #[tokio::test]
    async fn test_prompt_none_when_consent_needed() {
        let f = fixture(AuthorizationConfig::default().with_consent_required(true));
        let sid = login(&f);
        let mut req = request();
        req.prompt = Some("none".to_string());

        let err = assert_err!(f.service.authorize(&req, Some(&sid)).await);
        assert!(matches!(err, AuthError::ConsentRequired));
    }

    #[tokio::test]
    async fn test_approve_issues_code() {
        let f = fixture(AuthorizationConfig::default().with_consent_required(true));
        let sid = login(&f);

        let redirect_url = assert_ok!(f.service.approve(&request(), Some(&sid)).await);
        assert!(redirect_url.starts_with("https://app/cb?code="));
        assert!(redirect_url.ends_with("&state=xyz"));
        assert_eq!(f.codes.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_requires_session() {
        let f = fixture(AuthorizationConfig::default());
        let err = assert_err!(f.service.approve(&request(), None).await);
        assert!(matches!(err, AuthError::LoginRequired));
        assert!(f.codes.is_empty());
    }

    #[tokio::test]
    async fn test_approve_rejects_unregistered_redirect() {
        let f = fixture(AuthorizationConfig::default());
        let sid = login(&f);
        let mut req = request();
        req.redirect_uri = "https://app/cb/extra".to_string();

        let err = assert_err!(f.service.approve(&req, Some(&sid)).await);
        assert_eq!(err.oauth_error_code(), "access_denied");
        assert!(f.codes.is_empty());
        // failed approval leaves the session intact
        assert!(f.sessions.get(&sid).is_some());
    }

    #[tokio::test]
    async fn test_invalid_request_before_client_lookup() {
        let f = fixture(AuthorizationConfig::default());
        let mut req = request();
        req.scope = "profile".to_string();
        req.client_id = "unknown".to_string();

        let err = assert_err!(f.service.authorize(&req, None).await);
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn test_consent_redirect_url() {
        let f = fixture(AuthorizationConfig::default());
        let url = f.service.consent_redirect_url(&request()).unwrap();
        assert!(url.starts_with("/consent?return_to="));
    }
}
