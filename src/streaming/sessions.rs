//! Active transcode session tracking.
//!
//! Every running transcode registers here so the surrounding service can
//! see what is in flight. Sessions are removed by an RAII guard, so every
//! exit path of a stream (completion, failure, cancellation, panic
//! unwinding the task) deregisters it.

use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// One in-flight transcode session.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Source file being transcoded.
    pub source: PathBuf,
    /// Session start timestamp.
    pub started_at: SystemTime,
}

/// Thread-safe registry of in-flight transcode sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, StreamSession>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; dropping the returned guard removes it.
    pub fn register(&self, source: PathBuf) -> SessionGuard {
        let id = Uuid::new_v4();
        let session = StreamSession {
            id,
            source: source.clone(),
            started_at: SystemTime::now(),
        };
        self.sessions.insert(id, session);
        tracing::info!(session = %id, source = %source.display(), "transcode session started");

        SessionGuard {
            id,
            registry: self.clone(),
        }
    }

    /// List all active sessions.
    pub fn list(&self) -> Vec<StreamSession> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove(&self, id: Uuid) {
        if self.sessions.remove(&id).is_some() {
            tracing::info!(session = %id, "transcode session ended");
        }
    }
}

/// Removes its session from the registry on drop.
pub struct SessionGuard {
    id: Uuid,
    registry: SessionRegistry,
}

impl SessionGuard {
    /// The session's identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_list() {
        let registry = SessionRegistry::new();
        let guard = registry.register(PathBuf::from("/media/a.mkv"));

        assert_eq!(registry.len(), 1);
        let sessions = registry.list();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, guard.id());
        assert_eq!(sessions[0].source, PathBuf::from("/media/a.mkv"));
    }

    #[test]
    fn drop_removes_session() {
        let registry = SessionRegistry::new();
        {
            let _guard = registry.register(PathBuf::from("/media/a.mkv"));
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        let first = registry.register(PathBuf::from("/media/a.mkv"));
        let second = registry.register(PathBuf::from("/media/b.mkv"));
        assert_eq!(registry.len(), 2);

        drop(first);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].id, second.id());
    }
}
