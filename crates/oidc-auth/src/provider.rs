//! Composition root.
//!
//! [`OidcProvider`] owns every store and service and wires them by explicit
//! constructor calls. The HTTP handlers take it as axum state.

use std::sync::Arc;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::login::{LoginService, SessionCookie};
use crate::oauth::service::{AuthorizationConfig, AuthorizationService};
use crate::password::PasswordHasher;
use crate::storage::{
    ClientRepository, CodeStore, LoginThrottle, SessionStore, Sweeper, UserRepository,
    to_time_duration,
};
use crate::token::jwt::TokenSigner;
use crate::token::service::{TokenConfig, TokenService};

/// OpenID provider: stores, services and the background sweeper.
pub struct OidcProvider {
    config: AuthConfig,
    sessions: Arc<SessionStore>,
    codes: Arc<CodeStore>,
    throttle: Arc<LoginThrottle>,
    authorization: AuthorizationService,
    tokens: TokenService,
    login: LoginService,
    cookie: SessionCookie,
    sweeper: Sweeper,
}

impl OidcProvider {
    /// Validates `config` and builds the provider.
    ///
    /// The sweeper is not started; call [`OidcProvider::start`].
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid.
    pub fn new(
        config: AuthConfig,
        clients: Arc<dyn ClientRepository>,
        users: Arc<dyn UserRepository>,
        signer: Arc<dyn TokenSigner>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let session_lifetime = to_time_duration(config.session.lifetime);
        let sessions = Arc::new(SessionStore::new(session_lifetime));
        let codes = Arc::new(CodeStore::new());
        let throttle = Arc::new(LoginThrottle::new(
            config.lockout.max_failed_attempts,
            to_time_duration(config.lockout.lockout_duration),
        ));

        let authorization = AuthorizationService::new(
            clients.clone(),
            sessions.clone(),
            codes.clone(),
            AuthorizationConfig::from(&config),
        );
        let tokens = TokenService::new(
            clients,
            users.clone(),
            codes.clone(),
            signer,
            TokenConfig::from(&config),
        );
        let login = LoginService::new(users, sessions.clone(), throttle.clone(), hasher);

        let cookie = SessionCookie::new(config.session.cookie_name.clone(), session_lifetime)
            .secure(config.issuer.starts_with("https://"));
        let sweeper = Sweeper::new(
            sessions.clone(),
            codes.clone(),
            throttle.clone(),
            config.session.sweep_interval,
            config.session.sweep_batch_size,
        );

        tracing::info!(issuer = %config.issuer, "OpenID provider configured");

        Ok(Self {
            config,
            sessions,
            codes,
            throttle,
            authorization,
            tokens,
            login,
            cookie,
            sweeper,
        })
    }

    /// Starts the session sweeper. Returns `false` if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        self.sweeper.start()
    }

    /// Stops the session sweeper. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        self.sweeper.stop()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper.is_running()
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn authorization(&self) -> &AuthorizationService {
        &self.authorization
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn login(&self) -> &LoginService {
        &self.login
    }

    #[must_use]
    pub fn session_cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn codes(&self) -> &Arc<CodeStore> {
        &self.codes
    }

    #[must_use]
    pub fn throttle(&self) -> &Arc<LoginThrottle> {
        &self.throttle
    }
}
