//! Token minting, signing and ID token validation.

pub mod jwt;
pub mod service;
pub mod validation;

pub use jwt::{
    AccessTokenClaims, Audience, IdTokenClaims, JwtError, JwtSigner, RefreshTokenClaims,
    SigningAlgorithm, TokenSigner,
};
pub use service::{TokenConfig, TokenService};
pub use validation::{ExpectedClaims, IdTokenError, IdTokenValidator};
