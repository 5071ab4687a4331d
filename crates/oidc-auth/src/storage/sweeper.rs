//! Background sweep of expired sessions, codes and idle throttle records.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::attempt::LoginThrottle;
use super::code::CodeStore;
use super::session::SessionStore;

/// Periodically evicts a bounded batch of expired sessions, codes and idle
/// throttle records.
///
/// `start` and `stop` are idempotent. `stop` only signals the task; the
/// current tick, if any, finishes on its own.
pub struct Sweeper {
    sessions: Arc<SessionStore>,
    codes: Arc<CodeStore>,
    throttle: Arc<LoginThrottle>,
    interval: Duration,
    batch_size: usize,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        codes: Arc<CodeStore>,
        throttle: Arc<LoginThrottle>,
        interval: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            sessions,
            codes,
            throttle,
            interval,
            batch_size,
            shutdown: Mutex::new(None),
        }
    }

    /// Spawns the sweep task on the current tokio runtime.
    ///
    /// Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut shutdown = self.shutdown.lock();
        if shutdown.is_some() {
            return false;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let sessions = self.sessions.clone();
        let codes = self.codes.clone();
        let throttle = self.throttle.clone();
        let period = self.interval;
        let batch_size = self.batch_size;

        tokio::spawn(async move {
            info!(
                interval_secs = period.as_secs(),
                batch_size, "Session sweeper started"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let sessions_removed = sessions.sweep(batch_size);
                        let codes_removed = codes.sweep(batch_size);
                        let attempts_removed = throttle.sweep(batch_size);
                        if sessions_removed > 0 || codes_removed > 0 || attempts_removed > 0 {
                            debug!(
                                sessions_removed,
                                codes_removed,
                                attempts_removed,
                                "Swept expired entries"
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        // a dropped sender also stops the task
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Session sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        *shutdown = Some(shutdown_tx);
        true
    }

    /// Signals the sweep task to stop.
    ///
    /// Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.shutdown.lock().take() {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::flags::ScopeSet;
    use crate::storage::code::CodeGrant;

    struct Stores {
        sessions: Arc<SessionStore>,
        codes: Arc<CodeStore>,
        throttle: Arc<LoginThrottle>,
    }

    fn sweeper(period: Duration) -> (Sweeper, Stores) {
        let sessions = Arc::new(SessionStore::new(time::Duration::milliseconds(20)));
        let codes = Arc::new(CodeStore::new());
        let throttle = Arc::new(LoginThrottle::new(3, time::Duration::milliseconds(20)));
        let sweeper = Sweeper::new(
            sessions.clone(),
            codes.clone(),
            throttle.clone(),
            period,
            100,
        );
        let stores = Stores {
            sessions,
            codes,
            throttle,
        };
        (sweeper, stores)
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (sweeper, _) = sweeper(Duration::from_secs(60));
        assert!(!sweeper.is_running());

        assert!(sweeper.start());
        assert!(!sweeper.start());
        assert!(sweeper.is_running());

        assert!(sweeper.stop());
        assert!(!sweeper.stop());
        assert!(!sweeper.is_running());

        // restart after stop
        assert!(sweeper.start());
        assert!(sweeper.stop());
    }

    #[tokio::test]
    async fn test_sweeps_expired_entries_without_reads() {
        let (sweeper, stores) = sweeper(Duration::from_millis(10));
        stores.sessions.create("u1");
        stores.throttle.increment("alice");
        stores.codes.issue(
            CodeGrant {
                client_id: "c1".to_string(),
                user_id: "u1".to_string(),
                redirect_uri: "https://app/cb".to_string(),
                scope: ScopeSet::OPENID,
                nonce: None,
                auth_time: None,
            },
            time::Duration::milliseconds(20),
        );

        sweeper.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        sweeper.stop();

        assert!(stores.sessions.is_empty());
        assert!(stores.codes.is_empty());
        assert!(stores.throttle.is_empty());
    }
}
