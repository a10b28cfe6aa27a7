//! Server state and session registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::pipeline::{ActiveSession, NewSessionPipeline};

/// Application state shared across handlers
pub struct AppState {
    /// Full configuration
    pub config: Config,
    /// Session registry
    pub sessions: SessionRegistry,
    /// Session factory pipeline
    pub pipeline: NewSessionPipeline,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, pipeline: NewSessionPipeline) -> Self {
        let idle_timeout = config.server.idle_timeout();
        Self {
            config,
            sessions: SessionRegistry::new().with_idle_timeout(idle_timeout),
            pipeline,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Sole owner of active sessions, keyed by identity.
///
/// Everything else holds borrowed references obtained by lookup, never
/// long-lived pointers into a session, so eviction is always safe. A
/// session not accessed within the idle window is evicted and its backing
/// session stopped best-effort.
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    idle_timeout: Duration,
}

/// Session entry with metadata
struct SessionEntry {
    session: Arc<ActiveSession>,
    last_access: Instant,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create new session registry
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Set the idle eviction window
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Register a session and take ownership of it
    pub async fn insert(&self, session: ActiveSession) -> Arc<ActiveSession> {
        let session = Arc::new(session);
        let entry = SessionEntry {
            session: session.clone(),
            last_access: Instant::now(),
        };
        self.sessions
            .write()
            .await
            .insert(session.id().to_string(), entry);
        session
    }

    /// Look up a session by id, touching its last-access time. An entry
    /// past the idle window is evicted here rather than returned.
    pub async fn get(&self, id: &str) -> Option<Arc<ActiveSession>> {
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(id) {
            Some(entry) => entry.last_access.elapsed() > self.idle_timeout,
            None => return None,
        };
        if expired {
            if let Some(entry) = sessions.remove(id) {
                drop(sessions);
                Self::stop_in_background(entry.session);
            }
            return None;
        }

        let entry = sessions.get_mut(id)?;
        entry.last_access = Instant::now();
        Some(entry.session.clone())
    }

    /// Remove a session, returning it for explicit teardown.
    pub async fn remove(&self, id: &str) -> Option<Arc<ActiveSession>> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|entry| entry.session)
    }

    /// Get session count
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Get all session IDs
    pub async fn list_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Evict every session past the idle window, stopping each one
    /// best-effort. Returns the number evicted.
    pub async fn sweep(&self) -> usize {
        let expired: Vec<Arc<ActiveSession>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| entry.last_access.elapsed() > self.idle_timeout)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter()
                .filter_map(|id| sessions.remove(id))
                .map(|entry| entry.session)
                .collect()
        };

        let evicted = expired.len();
        futures::future::join_all(expired.iter().map(|session| {
            debug!(session_id = %session.id(), "evicting idle session");
            session.stop()
        }))
        .await;
        if evicted > 0 {
            info!(count = evicted, "evicted idle sessions");
        }
        evicted
    }

    fn stop_in_background(session: Arc<ActiveSession>) {
        tokio::spawn(async move {
            debug!(session_id = %session.id(), "evicting idle session on access");
            session.stop().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::proxy::ProtocolConverter;
    use serde_json::json;

    fn session(id: &str) -> ActiveSession {
        let converter = ProtocolConverter::new(
            reqwest::Client::new(),
            "http://localhost:0",
            Dialect::W3C,
            Dialect::W3C,
        );
        ActiveSession::new(id.to_string(), json!({}), converter)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1")).await;

        let found = registry.get("s1").await;
        assert!(found.is_some());
        assert_eq!(found.unwrap().id(), "s1");
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1")).await;
        assert!(registry.remove("s1").await.is_some());
        assert!(registry.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_idle_eviction_on_access() {
        let registry = SessionRegistry::new().with_idle_timeout(Duration::from_millis(10));
        registry.insert(session("s1")).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(registry.get("s1").await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_idle_sessions() {
        let registry = SessionRegistry::new().with_idle_timeout(Duration::from_millis(50));
        registry.insert(session("old")).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        registry.insert(session("fresh")).await;

        let evicted = registry.sweep().await;
        assert_eq!(evicted, 1);
        assert_eq!(registry.list_ids().await, vec!["fresh".to_string()]);
    }
}
