//! Username/password login and the session cookie.
//!
//! A successful login creates a [`Session`] in the [`SessionStore`]; the
//! session id travels in an `HttpOnly` cookie built by [`SessionCookie`].
//! Failed logins feed the [`LoginThrottle`].

use std::sync::Arc;

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::storage::{LoginThrottle, Session, SessionStore, UserRepository};

/// Login/logout against the session store.
pub struct LoginService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
    throttle: Arc<LoginThrottle>,
    hasher: Arc<dyn PasswordHasher>,
}

impl LoginService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionStore>,
        throttle: Arc<LoginThrottle>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            sessions,
            throttle,
            hasher,
        }
    }

    /// Authenticates a user and opens a session.
    ///
    /// # Errors
    ///
    /// - `AccountLocked` while the username is throttled
    /// - `InvalidCredentials` for an unknown user or wrong password
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Session> {
        // 1. Refuse locked identities before touching the password. The
        // attempt counts as a failure until verification succeeds.
        if !self.throttle.try_reserve(username) {
            tracing::warn!(username = %username, "Login refused, identity locked");
            return Err(AuthError::AccountLocked);
        }

        // 2. Look up and verify
        let user = self.users.find_by_username(username).await?;
        let user = match user {
            Some(user) if self.hasher.verify(&user.password_hash, password) => user,
            _ => {
                tracing::warn!(username = %username, "Login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        // 3. Open the session
        self.throttle.clear(username);
        Ok(self.sessions.create(user.id))
    }

    /// Closes a session. Returns `true` if it existed.
    pub fn logout(&self, session_id: &str) -> bool {
        self.sessions.delete(session_id)
    }
}

/// Builds and reads the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCookie {
    /// `max_age` should equal the session window.
    #[must_use]
    pub fn new(name: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            max_age,
            secure: false,
        }
    }

    /// Sets the `Secure` attribute.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie carrying `session_id`.
    #[must_use]
    pub fn build(&self, session_id: &str) -> Cookie<'static> {
        Cookie::build((self.name.clone(), session_id.to_string()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(self.max_age)
            .build()
    }

    /// Cookie that clears the session cookie.
    #[must_use]
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), ""))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    }

    /// Session id from the request cookies.
    #[must_use]
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }
}
