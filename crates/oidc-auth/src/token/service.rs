//! Token service.
//!
//! Handles the token endpoint:
//!
//! - Authorization code exchange
//! - Refresh token reissue
//! - Access, refresh and ID token minting through the injected [`TokenSigner`]
//!
//! # Usage
//!
//! ```ignore
//! let config = TokenConfig::new("https://auth.example.com");
//! let service = TokenService::new(clients, users, codes, signer, config);
//!
//! let response = service.exchange(authorization_header, &request).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::client_auth::authenticate_client;
use crate::oauth::flags::ScopeSet;
use crate::oauth::token::{
    GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN, TokenRequest, TokenResponse,
};
use crate::storage::code::CodeStore;
use crate::storage::{ClientRepository, User, UserRepository, to_time_duration};
use crate::token::jwt::{
    AccessTokenClaims, IdTokenClaims, REFRESH_TOKEN_USE, RefreshTokenClaims, TokenSigner,
};
use crate::types::Client;

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer URL (`iss`).
    pub issuer: String,

    /// Default: 1 hour.
    pub access_token_lifetime: Duration,

    /// Default: 30 days.
    pub refresh_token_lifetime: Duration,

    /// Default: 1 hour.
    pub id_token_lifetime: Duration,
}

impl TokenConfig {
    /// Creates a configuration with default lifetimes.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::days(30),
            id_token_lifetime: Duration::hours(1),
        }
    }

    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_id_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.id_token_lifetime = lifetime;
        self
    }
}

impl From<&AuthConfig> for TokenConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            access_token_lifetime: to_time_duration(config.oauth.access_token_lifetime),
            refresh_token_lifetime: to_time_duration(config.oauth.refresh_token_lifetime),
            id_token_lifetime: to_time_duration(config.oauth.id_token_lifetime),
        }
    }
}

/// Token service for the token endpoint.
pub struct TokenService {
    clients: Arc<dyn ClientRepository>,
    users: Arc<dyn UserRepository>,
    codes: Arc<CodeStore>,
    signer: Arc<dyn TokenSigner>,
    config: TokenConfig,
}

impl TokenService {
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        users: Arc<dyn UserRepository>,
        codes: Arc<CodeStore>,
        signer: Arc<dyn TokenSigner>,
        config: TokenConfig,
    ) -> Self {
        Self {
            clients,
            users,
            codes,
            signer,
            config,
        }
    }

    /// Handles `POST /token`.
    ///
    /// `authorization` is the raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` for missing or malformed client credentials
    /// - `UnauthorizedClient` for an unknown client or wrong secret
    /// - `UnsupportedGrantType` for any other `grant_type`
    /// - `InvalidRequest` for missing parameters
    /// - `InvalidGrant` for an unknown, used, expired or foreign code
    /// - `AccessDenied` for a redirect URI not registered to the client
    pub async fn exchange(
        &self,
        authorization: Option<&str>,
        request: &TokenRequest,
    ) -> AuthResult<TokenResponse> {
        // 1. Authenticate the client
        let client = authenticate_client(self.clients.as_ref(), authorization).await?;

        tracing::debug!(
            client_id = %client.client_id,
            grant_type = %request.grant_type,
            "Token request received"
        );

        // 2. Dispatch on grant type
        match request.grant_type.as_str() {
            GRANT_AUTHORIZATION_CODE => self.exchange_code(&client, request).await,
            GRANT_REFRESH_TOKEN => self.refresh(&client, request).await,
            "" => Err(AuthError::invalid_request("Missing grant_type")),
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }

    async fn exchange_code(
        &self,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<TokenResponse> {
        // 3. Extract required fields
        let code = request
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing code parameter"))?;

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing redirect_uri parameter"))?;

        // 4. Consume the code; it stays consumed whatever happens next
        let grant = self.codes.redeem(code).ok_or_else(|| {
            tracing::warn!(client_id = %client.client_id, "Unknown, used or expired code");
            AuthError::invalid_grant("Invalid authorization code")
        })?;

        // 5. Bind the code to this client and redirect URI
        if grant.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Authorization code presented by a different client"
            );
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to a different client",
            ));
        }

        if !client.is_redirect_uri_allowed(redirect_uri) {
            return Err(AuthError::access_denied(
                "redirect_uri is not registered for this client",
            ));
        }

        if grant.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant(
                "Redirect URI does not match authorization request",
            ));
        }

        let user = self
            .users
            .get(&grant.user_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("User no longer exists"))?;

        // 6. Access and refresh tokens
        let now = OffsetDateTime::now_utc();
        let mut response = self.mint(client, &user.id, grant.scope, now)?;

        // 7. ID token
        let mut id_claims = IdTokenClaims::new(
            &self.config.issuer,
            &user.id,
            &client.client_id,
            now.unix_timestamp(),
            expiry(now, self.config.id_token_lifetime)?.unix_timestamp(),
        );
        id_claims.nonce = grant.nonce.clone();
        id_claims.auth_time = grant.auth_time.map(OffsetDateTime::unix_timestamp);
        add_user_claims(&mut id_claims, &user, grant.scope);
        response = response.with_id_token(self.sign(&id_claims)?);

        tracing::info!(
            client_id = %client.client_id,
            user_id = %user.id,
            "Tokens issued for authorization code"
        );

        Ok(response)
    }

    async fn refresh(&self, client: &Client, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let token = request
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing refresh_token parameter"))?;

        let claims = self
            .signer
            .parse(token)
            .map_err(|_| AuthError::invalid_grant("Invalid refresh token"))?;
        let claims: RefreshTokenClaims = serde_json::from_value(claims)
            .map_err(|_| AuthError::invalid_grant("Invalid refresh token"))?;

        if claims.token_use != REFRESH_TOKEN_USE || claims.iss != self.config.issuer {
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }

        let now = OffsetDateTime::now_utc();
        if claims.exp <= now.unix_timestamp() {
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        if claims.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Refresh token presented by a different client"
            );
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to a different client",
            ));
        }

        if self.users.get(&claims.sub).await?.is_none() {
            return Err(AuthError::invalid_grant("User no longer exists"));
        }

        let response = self.mint(client, &claims.sub, ScopeSet::parse(&claims.scope), now)?;

        tracing::info!(
            client_id = %client.client_id,
            user_id = %claims.sub,
            "Tokens reissued from refresh token"
        );

        Ok(response)
    }

    /// Mints the access and refresh token pair.
    fn mint(
        &self,
        client: &Client,
        user_id: &str,
        scope: ScopeSet,
        now: OffsetDateTime,
    ) -> AuthResult<TokenResponse> {
        let scope = scope.to_string();
        let access_exp = expiry(now, self.config.access_token_lifetime)?;

        let access_claims = AccessTokenClaims {
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            aud: client.client_id.clone(),
            exp: access_exp.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            client_id: client.client_id.clone(),
        };

        let refresh_claims = RefreshTokenClaims {
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            aud: client.client_id.clone(),
            exp: expiry(now, self.config.refresh_token_lifetime)?.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            client_id: client.client_id.clone(),
            token_use: REFRESH_TOKEN_USE.to_string(),
        };

        let access_token = self.sign(&access_claims)?;
        let refresh_token = self.sign(&refresh_claims)?;
        let expires_in = u64::try_from(self.config.access_token_lifetime.whole_seconds())
            .unwrap_or_default();

        Ok(TokenResponse::new(access_token, refresh_token, expires_in).with_scope(scope))
    }

    fn sign<T: Serialize>(&self, claims: &T) -> AuthResult<String> {
        let value = serde_json::to_value(claims)
            .map_err(|e| AuthError::internal(format!("Failed to serialize claims: {}", e)))?;
        Ok(self.signer.sign(&value)?)
    }
}

/// `now + lifetime`, or an internal error when the sum leaves the
/// representable date range.
fn expiry(now: OffsetDateTime, lifetime: Duration) -> AuthResult<OffsetDateTime> {
    now.checked_add(lifetime)
        .ok_or_else(|| AuthError::internal("Token lifetime is out of range"))
}

/// Copies the user's standard claims released by `scope`.
fn add_user_claims(claims: &mut IdTokenClaims, user: &User, scope: ScopeSet) {
    if scope.has(ScopeSet::PROFILE) {
        claims.profile = user.profile.clone();
    }
    if scope.has(ScopeSet::EMAIL) {
        claims.email = user.email.clone();
    }
    if scope.has(ScopeSet::PHONE) {
        claims.phone = user.phone.clone();
    }
    if scope.has(ScopeSet::ADDRESS) {
        claims.address = user.address.clone();
    }
}
