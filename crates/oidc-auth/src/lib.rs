//! # oidc-auth
//!
//! OpenID Connect authorization server core.
//!
//! This crate provides:
//! - The authorization endpoint state machine (login, consent, code issuance)
//! - Single-use authorization codes and the code-for-token exchange
//! - Login sessions with a background sweeper and failed-login lockout
//! - ID token minting and claims validation
//!
//! ## Modules
//!
//! - [`config`] - Provider configuration
//! - [`oauth`] - Authorize/token wire types, flag sets and the authorization service
//! - [`token`] - Signing, the token service and the ID token validator
//! - [`storage`] - Code, session and throttle stores; client and user repositories
//! - [`login`] - Username/password login and the session cookie
//! - [`password`] - Password hashing
//! - [`provider`] - [`OidcProvider`], which wires everything together
//! - [`http`] - Axum handlers for the endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod login;
pub mod oauth;
pub mod password;
pub mod provider;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory, ErrorResponse};
pub use http::{
    LoginForm, approve_handler, authorize_handler, login_handler, logout_handler, token_handler,
};
pub use login::{LoginService, SessionCookie};
pub use oauth::{
    AuthenticationRequest, AuthenticationResponse, AuthorizationConfig, AuthorizationService,
    AuthorizeOutcome, PromptSet, ResponseTypeSet, ScopeSet, TokenRequest, TokenResponse,
};
pub use password::{Argon2Hasher, PasswordHasher};
pub use provider::OidcProvider;
pub use storage::{
    ClientRepository, CodeStore, InMemoryClientDirectory, InMemoryUserDirectory, LoginThrottle,
    Session, SessionStore, Sweeper, User, UserRepository,
};
pub use token::{
    ExpectedClaims, IdTokenClaims, IdTokenError, IdTokenValidator, JwtError, JwtSigner,
    SigningAlgorithm, TokenConfig, TokenService, TokenSigner,
};
pub use types::Client;

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
