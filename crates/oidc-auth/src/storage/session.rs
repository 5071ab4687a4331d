//! Login session store.
//!
//! Sessions expire a fixed window after creation. Expiry is enforced two ways
//! that share one eviction path: [`SessionStore::get`] evicts an expired
//! session on read, and [`SessionStore::sweep`] evicts a bounded batch per
//! tick so memory does not depend on reads.
//!
//! Session ids are UUIDv7, so the ordered map iterates oldest first and a
//! sweep reaches the entries most likely to be expired.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// An authenticated login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Returns `true` once `now` has reached `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Concurrency-safe map of session id to [`Session`].
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<BTreeMap<Uuid, Session>>,
    lifetime: Duration,
}

impl SessionStore {
    /// Creates a store whose sessions last `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            lifetime,
        }
    }

    /// Session window.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Creates a session for `user_id`.
    pub fn create(&self, user_id: impl Into<String>) -> Session {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            session_id: Uuid::now_v7(),
            user_id: user_id.into(),
            created_at: now,
            expires_at: now.saturating_add(self.lifetime),
        };
        self.sessions
            .write()
            .insert(session.session_id, session.clone());

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "Session created"
        );
        session
    }

    /// Looks up a session.
    ///
    /// An expired session is removed and reported as absent. Ids that are not
    /// UUIDs are absent.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let id = Uuid::parse_str(session_id).ok()?;
        let now = OffsetDateTime::now_utc();

        {
            let sessions = self.sessions.read();
            let session = sessions.get(&id)?;
            if !session.is_expired_at(now) {
                return Some(session.clone());
            }
        }

        let mut sessions = self.sessions.write();
        if evict_expired(&mut sessions, &id, now) {
            tracing::debug!(session_id = %id, "Expired session evicted on read");
        }
        None
    }

    /// Deletes a session. Returns `true` if it existed.
    pub fn delete(&self, session_id: &str) -> bool {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return false;
        };
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session deleted");
        }
        removed
    }

    /// Inspects up to `batch` of the oldest sessions and evicts the expired
    /// ones. Returns how many were removed.
    pub fn sweep(&self, batch: usize) -> usize {
        let now = OffsetDateTime::now_utc();
        let candidates: Vec<Uuid> = self
            .sessions
            .read()
            .values()
            .take(batch)
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.session_id)
            .collect();

        if candidates.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write();
        candidates
            .iter()
            .filter(|id| evict_expired(&mut sessions, id, now))
            .count()
    }

    /// Number of stored sessions, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Removes `id` if it is still present and expired at `now`.
fn evict_expired(sessions: &mut BTreeMap<Uuid, Session>, id: &Uuid, now: OffsetDateTime) -> bool {
    match sessions.get(id) {
        Some(session) if session.is_expired_at(now) => sessions.remove(id).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_backdated(store: &SessionStore, user_id: &str, age: Duration) -> Uuid {
        let created_at = OffsetDateTime::now_utc() - age;
        let session = Session {
            session_id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            created_at,
            expires_at: created_at + store.lifetime,
        };
        let id = session.session_id;
        store.sessions.write().insert(id, session);
        id
    }

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new(Duration::hours(24));
        let session = store.create("u1");

        assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
        assert_eq!(session.session_id.get_version_num(), 7);

        let found = store.get(&session.session_id.to_string()).unwrap();
        assert_eq!(found, session);
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let store = SessionStore::new(Duration::MAX);
        let session = store.create("u1");

        assert!(session.expires_at > session.created_at);
        assert!(store.get(&session.session_id.to_string()).is_some());
    }

    #[test]
    fn test_get_unknown_or_malformed() {
        let store = SessionStore::new(Duration::hours(1));
        assert!(store.get(&Uuid::now_v7().to_string()).is_none());
        assert!(store.get("not-a-uuid").is_none());
        assert!(store.get("").is_none());
    }

    #[test]
    fn test_expired_session_removed_on_read() {
        let store = SessionStore::new(Duration::hours(1));
        let id = insert_backdated(&store, "u1", Duration::hours(2));
        assert_eq!(store.len(), 1);

        assert!(store.get(&id.to_string()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_at_exact_expiry_is_expired() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create("u1");
        assert!(session.is_expired_at(session.expires_at));
        assert!(!session.is_expired_at(session.expires_at - Duration::SECOND));
    }

    #[test]
    fn test_delete() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create("u1");
        let id = session.session_id.to_string();

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.delete("garbage"));
    }

    #[test]
    fn test_sweep_removes_expired_only() {
        let store = SessionStore::new(Duration::hours(1));
        insert_backdated(&store, "u1", Duration::hours(3));
        insert_backdated(&store, "u2", Duration::hours(2));
        let live = store.create("u3");

        assert_eq!(store.sweep(100), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&live.session_id.to_string()).is_some());
    }

    #[test]
    fn test_sweep_is_bounded() {
        let store = SessionStore::new(Duration::hours(1));
        for _ in 0..5 {
            insert_backdated(&store, "u", Duration::hours(2));
        }

        assert_eq!(store.sweep(3), 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.sweep(3), 2);
        assert!(store.is_empty());
    }
}
