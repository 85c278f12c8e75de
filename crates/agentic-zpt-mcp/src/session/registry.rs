//! Session registry: one lazily-created manager per session id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{ZptServices, ZptSessionManager};

pub const DEFAULT_SESSION_ID: &str = "default";

struct SessionEntry {
    manager: Arc<Mutex<ZptSessionManager>>,
    last_used: Instant,
}

impl SessionEntry {
    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_used.elapsed() > ttl
    }
}

/// Registry of live sessions. Each session sits behind its own mutex, so
/// verbs on one session run one at a time while separate sessions proceed
/// in parallel.
///
/// The map is bounded: idle sessions expire after `session.idle_ttl_secs`
/// and the least recently used one is dropped once `session.max_sessions`
/// is reached. The default session is never evicted.
pub struct SessionRegistry {
    services: Arc<ZptServices>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(services: Arc<ZptServices>) -> Self {
        let max_sessions = services.session.max_sessions.max(1);
        let idle_ttl = Duration::from_secs(services.session.idle_ttl_secs);
        Self {
            services,
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
            idle_ttl,
        }
    }

    /// Get or create the session for `session_id`, marking it as used.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ZptSessionManager>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = Instant::now();
            return entry.manager.clone();
        }

        self.evict(&mut sessions);

        let manager = Arc::new(Mutex::new(ZptSessionManager::new(
            session_id,
            self.services.clone(),
        )));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                manager: manager.clone(),
                last_used: Instant::now(),
            },
        );
        manager
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<ZptSessionManager>>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|e| e.manager.clone())
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            tracing::info!("Session '{session_id}' closed");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub fn services(&self) -> &Arc<ZptServices> {
        &self.services
    }

    /// Drop expired sessions, then the least recently used one while the
    /// map is full. Managers still held by a running verb stay alive until
    /// that verb finishes.
    fn evict(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let ttl = self.idle_ttl;
        let before = sessions.len();
        sessions.retain(|id, entry| id == DEFAULT_SESSION_ID || !entry.is_idle(ttl));
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!("Expired {expired} idle session(s)");
        }

        while sessions.len() >= self.max_sessions {
            let Some(lru) = sessions
                .iter()
                .filter(|(id, _)| id.as_str() != DEFAULT_SESSION_ID)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            tracing::info!("Evicting least recently used session '{lru}'");
            sessions.remove(&lru);
        }
    }
}
