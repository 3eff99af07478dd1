use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "admin_session";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: StdRwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: StdRwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Admin sessions keyed by an opaque random token.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(&self, user: &str) -> Session {
        self.purge_expired().await;

        let now = self.clock.now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user: user.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        session
    }

    /// Returns the live session for `token`. Expired sessions are dropped.
    pub async fn validate(&self, token: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        match sessions.get(token) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(token);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_mins: i64) -> (Arc<ManualClock>, SessionStore) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::with_clock(Duration::minutes(ttl_mins), clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_session_expires_after_ttl() {
        let (clock, store) = store(30);
        let session = store.create("admin").await;
        assert_eq!(session.expires_at - session.created_at, Duration::minutes(30));

        clock.advance(Duration::minutes(29));
        assert_eq!(store.validate(&session.token).await, Some(session.clone()));

        clock.advance(Duration::minutes(1));
        assert_eq!(store.validate(&session.token).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_revoke() {
        let (_, store) = store(30);
        let session = store.create("admin").await;
        assert!(store.revoke(&session.token).await);
        assert!(!store.revoke(&session.token).await);
        assert!(store.validate(&session.token).await.is_none());
        assert!(store.validate("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (clock, store) = store(10);
        store.create("admin").await;
        store.create("admin").await;
        clock.advance(Duration::minutes(5));
        let fresh = store.create("admin").await;
        assert_ne!(fresh.token, "");

        clock.advance(Duration::minutes(6));
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.len().await, 1);
        assert!(store.validate(&fresh.token).await.is_some());
    }
}
