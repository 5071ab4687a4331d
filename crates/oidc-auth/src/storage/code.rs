//! Authorization code store.
//!
//! Codes are single use: [`CodeStore::redeem`] removes the entry under the
//! write lock before returning it, so of any number of concurrent redemptions
//! of one code exactly one succeeds. Expired codes read as absent whether or
//! not a sweep has removed them yet.
//!
//! Codes are also queued in issue order so a sweep inspects the oldest
//! entries first and never walks the whole map.

use std::collections::{HashMap, VecDeque};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::RwLock;
use time::{Duration, OffsetDateTime};

use crate::oauth::flags::ScopeSet;

/// What an authorization code was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGrant {
    /// Client the code is bound to.
    pub client_id: String,

    /// User whose session was active at issuance.
    pub user_id: String,

    /// Redirect URI of the authorize request.
    pub redirect_uri: String,

    /// Scopes granted.
    pub scope: ScopeSet,

    /// Nonce of the authorize request, echoed into the ID token.
    pub nonce: Option<String>,

    /// When the user authenticated.
    pub auth_time: Option<OffsetDateTime>,
}

/// A stored authorization code.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub value: String,
    pub grant: CodeGrant,
    pub created_at: OffsetDateTime,
    pub ttl: Duration,
}

impl AuthorizationCode {
    /// Returns `true` once more than `ttl` has passed since creation.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now - self.created_at > self.ttl
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// Generates a new authorization code.
///
/// 32 random bytes (256 bits), base64url encoded without padding.
#[must_use]
pub fn generate_code() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Default)]
struct CodeTable {
    by_value: HashMap<String, AuthorizationCode>,

    /// Code values in issue order. Redeemed codes linger here until swept.
    issued: VecDeque<String>,
}

impl CodeTable {
    fn insert(&mut self, code: AuthorizationCode) {
        self.issued.push_back(code.value.clone());
        self.by_value.insert(code.value.clone(), code);
    }
}

/// Concurrency-safe map of code value to [`AuthorizationCode`].
#[derive(Debug, Default)]
pub struct CodeStore {
    codes: RwLock<CodeTable>,
}

impl CodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new code for `grant`, valid for `ttl`.
    pub fn issue(&self, grant: CodeGrant, ttl: Duration) -> String {
        let value = generate_code();
        let code = AuthorizationCode {
            value: value.clone(),
            grant,
            created_at: OffsetDateTime::now_utc(),
            ttl,
        };
        self.codes.write().insert(code);
        value
    }

    /// Consumes a code.
    ///
    /// The entry is removed whether or not it is still valid; an expired code
    /// returns `None`.
    pub fn redeem(&self, code: &str) -> Option<CodeGrant> {
        let entry = self.codes.write().by_value.remove(code)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.grant)
    }

    /// Inspects up to `batch` of the oldest codes and removes the expired
    /// ones. Stops at the first live code. Returns how many were removed.
    pub fn sweep(&self, batch: usize) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut codes = self.codes.write();
        let CodeTable { by_value, issued } = &mut *codes;

        let mut removed = 0;
        for _ in 0..batch {
            let Some(value) = issued.front() else {
                break;
            };
            match by_value.get(value) {
                Some(code) if !code.is_expired_at(now) => break,
                Some(_) => {
                    by_value.remove(value);
                    removed += 1;
                }
                // already redeemed
                None => {}
            }
            issued.pop_front();
        }
        removed
    }

    /// Number of stored codes, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.read().by_value.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.read().by_value.is_empty()
    }
}
