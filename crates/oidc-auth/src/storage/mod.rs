//! Stores and repositories.
//!
//! - [`ClientRepository`] / [`UserRepository`]: lookup contracts with
//!   in-memory implementations
//! - [`CodeStore`]: single-use authorization codes
//! - [`SessionStore`]: login sessions, swept by [`Sweeper`]
//! - [`LoginThrottle`]: failed-login lockout
//!
//! Every store guards its map with one `parking_lot::RwLock` and never calls
//! out (signing, hashing, repositories) while holding it.

pub mod attempt;
pub mod client;
pub mod code;
pub mod session;
pub mod sweeper;
pub mod user;

pub use attempt::{LoginAttempt, LoginThrottle};
pub use client::{ClientRepository, InMemoryClientDirectory};
pub use code::{AuthorizationCode, CodeGrant, CodeStore};
pub use session::{Session, SessionStore};
pub use sweeper::Sweeper;
pub use user::{
    Address, EmailClaims, InMemoryUserDirectory, PhoneClaims, ProfileClaims, User, UserRepository,
};

/// Converts a configured duration to a `time` duration, saturating.
pub(crate) fn to_time_duration(duration: std::time::Duration) -> time::Duration {
    time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}
