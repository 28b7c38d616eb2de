//! Server-side session store keyed by an opaque cookie token.
//!
//! Tokens expire on a fixed horizon; a background task calls
//! [`SessionManager::prune_expired`] periodically.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Clone)]
struct Session {
    user_id: i32,
    expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub async fn create(&self, user_id: i32) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user_id,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Resolves a token to a user id, rejecting expired sessions.
    pub async fn resolve(&self, token: &str) -> Option<i32> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(token)?;
        if session.expires_at < Utc::now() {
            return None;
        }
        Some(session.user_id)
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at >= now);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("pruned {pruned} expired sessions");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_resolve() {
        let manager = SessionManager::new(1);
        let token = manager.create(7).await;
        assert_eq!(manager.resolve(&token).await, Some(7));
        assert_eq!(manager.resolve("bogus").await, None);
    }

    #[tokio::test]
    async fn destroy_invalidates_token() {
        let manager = SessionManager::new(1);
        let token = manager.create(7).await;
        manager.destroy(&token).await;
        assert_eq!(manager.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_pruned() {
        let manager = SessionManager::new(-1);
        let token = manager.create(7).await;
        assert_eq!(manager.resolve(&token).await, None);
        assert_eq!(manager.prune_expired().await, 1);
        assert_eq!(manager.len().await, 0);
    }
}
