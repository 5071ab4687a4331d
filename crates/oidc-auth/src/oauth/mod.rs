//! OAuth 2.0 / OpenID Connect endpoint logic.
//!
//! - [`flags`]: `scope`, `prompt`, `response_type` flag sets
//! - [`authorize`] / [`service`]: the authorize endpoint
//! - [`token`] / [`client_auth`]: token endpoint wire types and client
//!   authentication (the exchange itself is in [`crate::token::service`])

pub mod authorize;
pub mod client_auth;
pub mod flags;
pub mod service;
pub mod token;

pub use authorize::{
    AuthenticationRequest, AuthenticationResponse, decode_return_target, encode_return_target,
};
pub use client_auth::{authenticate_client, parse_basic_auth};
pub use flags::{FlagSet, PromptSet, ResponseTypeSet, ScopeSet};
pub use service::{AuthorizationConfig, AuthorizationService, AuthorizeOutcome};
pub use token::{TokenRequest, TokenResponse};
