//! Failed-login throttle.
//!
//! Counts failed logins per identity. An identity is locked once its count
//! reaches the threshold and stays locked until `lockout_duration` has passed
//! since the last failure. Expiry is evaluated on read: the first
//! [`LoginThrottle::is_locked`] call after the window elapses resets the count
//! and bumps [`LoginAttempt::frequency`].
//!
//! [`LoginThrottle::try_reserve`] checks the lock and counts the attempt under
//! one write lock, so concurrent logins cannot all slip past the threshold.
//! Records idle for a full window are dropped by [`LoginThrottle::sweep`].

use std::collections::HashMap;

use parking_lot::RwLock;
use time::{Duration, OffsetDateTime};

/// Failure record of one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub identity: String,

    /// Failures since the last reset.
    pub count: u32,

    pub first_attempt_at: OffsetDateTime,
    pub last_attempt_at: OffsetDateTime,

    /// Number of lockout windows that have run out for this identity.
    pub frequency: u32,
}

/// Per-identity failed-login counter with threshold lockout.
#[derive(Debug)]
pub struct LoginThrottle {
    attempts: RwLock<HashMap<String, LoginAttempt>>,
    max_failed_attempts: u32,
    lockout_duration: Duration,
}

impl LoginThrottle {
    #[must_use]
    pub fn new(max_failed_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_failed_attempts,
            lockout_duration,
        }
    }

    /// Records a failed attempt.
    pub fn increment(&self, identity: &str) {
        let now = OffsetDateTime::now_utc();
        self.record(&mut self.attempts.write(), identity, now);
    }

    /// Counts an attempt for `identity` unless it is locked.
    ///
    /// Returns `false` without counting while locked. The attempt is counted
    /// as a failure up front; a successful login undoes it with [`Self::clear`].
    pub fn try_reserve(&self, identity: &str) -> bool {
        let now = OffsetDateTime::now_utc();
        let mut attempts = self.attempts.write();
        if let Some(attempt) = attempts.get_mut(identity) {
            if self.check_locked(attempt, now) {
                return false;
            }
        }
        self.record(&mut attempts, identity, now);
        true
    }

    fn record(
        &self,
        attempts: &mut HashMap<String, LoginAttempt>,
        identity: &str,
        now: OffsetDateTime,
    ) {
        let attempt = attempts
            .entry(identity.to_string())
            .or_insert_with(|| LoginAttempt {
                identity: identity.to_string(),
                count: 0,
                first_attempt_at: now,
                last_attempt_at: now,
                frequency: 0,
            });
        attempt.count = attempt.count.saturating_add(1);
        attempt.last_attempt_at = now;

        if attempt.count == self.max_failed_attempts {
            tracing::warn!(
                identity = %identity,
                count = attempt.count,
                "Login attempts exceeded, identity locked"
            );
        }
    }

    /// Returns `true` while the identity is locked out.
    pub fn is_locked(&self, identity: &str) -> bool {
        self.is_locked_at(identity, OffsetDateTime::now_utc())
    }

    fn is_locked_at(&self, identity: &str, now: OffsetDateTime) -> bool {
        let mut attempts = self.attempts.write();
        match attempts.get_mut(identity) {
            Some(attempt) => self.check_locked(attempt, now),
            None => false,
        }
    }

    /// Lock state of one record. Resets the count once the window elapsed.
    fn check_locked(&self, attempt: &mut LoginAttempt, now: OffsetDateTime) -> bool {
        if attempt.count < self.max_failed_attempts {
            return false;
        }

        if now - attempt.last_attempt_at >= self.lockout_duration {
            attempt.count = 0;
            attempt.frequency = attempt.frequency.saturating_add(1);
            tracing::debug!(
                identity = %attempt.identity,
                frequency = attempt.frequency,
                "Lockout window elapsed, counter reset"
            );
            return false;
        }

        true
    }

    /// Returns the current record for an identity.
    #[must_use]
    pub fn stat(&self, identity: &str) -> Option<LoginAttempt> {
        self.attempts.read().get(identity).cloned()
    }

    /// Forgets an identity, e.g. after a successful login.
    pub fn clear(&self, identity: &str) {
        self.attempts.write().remove(identity);
    }

    /// Inspects up to `batch` records and drops those whose last failure is
    /// a full lockout window old. Returns how many were removed.
    pub fn sweep(&self, batch: usize) -> usize {
        self.sweep_at(batch, OffsetDateTime::now_utc())
    }

    fn sweep_at(&self, batch: usize, now: OffsetDateTime) -> usize {
        let idle: Vec<String> = self
            .attempts
            .read()
            .values()
            .take(batch)
            .filter(|a| self.is_idle(a, now))
            .map(|a| a.identity.clone())
            .collect();

        if idle.is_empty() {
            return 0;
        }

        let mut attempts = self.attempts.write();
        idle.iter()
            .filter(|identity| match attempts.get(identity.as_str()) {
                Some(attempt) if self.is_idle(attempt, now) => {
                    attempts.remove(identity.as_str()).is_some()
                }
                _ => false,
            })
            .count()
    }

    fn is_idle(&self, attempt: &LoginAttempt, now: OffsetDateTime) -> bool {
        now - attempt.last_attempt_at >= self.lockout_duration
    }

    /// Number of tracked identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.read().is_empty()
    }
}
