//! Memory collaborator — session transcripts and long-term fact search.
//!
//! The memory system is built once at start-up from `[memory]` config and
//! shared by every agent. Agents never hold history themselves; they open a
//! [`SessionHandle`] per request and read or append through it.
//!
//! ```text
//! {work_dir}/
//! └── memory/
//!     └── {memory_id}/          (basic_session store only)
//!         └── {actor_id}/
//!             └── {session_id}/
//!                 └── transcript.md
//! ```

pub mod handle;
pub mod store;
pub mod stores;

pub use handle::SessionHandle;
pub use store::{Fact, MemoryStore, Role, SessionKey, Turn};

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::MemoryConfig;
use crate::error::AppError;
use stores::basic_session::BasicSessionStore;
use stores::tmp::TmpStore;

/// Shared handle to the configured memory resource.
#[derive(Clone)]
pub struct MemorySystem {
    memory_id: String,
    region: String,
    store: Arc<dyn MemoryStore>,
}

impl MemorySystem {
    /// Build the store named by `config.store`.
    pub fn new(config: &MemoryConfig, work_dir: &Path) -> Result<Self, AppError> {
        let store: Arc<dyn MemoryStore> = match config.store.as_str() {
            "tmp" => Arc::new(TmpStore::new(config.transcript_cap)),
            "basic_session" => {
                let root = work_dir.join("memory").join(&config.memory_id);
                std::fs::create_dir_all(&root).map_err(|e| {
                    AppError::Memory(format!("cannot create {}: {e}", root.display()))
                })?;
                Arc::new(BasicSessionStore::new(root, config.transcript_cap))
            }
            other => {
                return Err(AppError::Memory(format!(
                    "unknown memory store '{other}' (expected 'tmp' or 'basic_session')"
                )));
            }
        };

        info!(
            store = store.store_type(),
            memory_id = %config.memory_id,
            region = %config.region,
            "memory system ready"
        );

        Ok(Self {
            memory_id: config.memory_id.clone(),
            region: config.region.clone(),
            store,
        })
    }

    /// Wrap an existing store; used when embedding or testing.
    pub fn with_store(memory_id: impl Into<String>, region: impl Into<String>, store: Arc<dyn MemoryStore>) -> Self {
        Self { memory_id: memory_id.into(), region: region.into(), store }
    }

    pub fn memory_id(&self) -> &str {
        &self.memory_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn store_type(&self) -> &str {
        self.store.store_type()
    }

    /// Open a handle on the `(actor_id, session_id)` thread.
    pub fn session(&self, actor_id: &str, session_id: &str) -> SessionHandle {
        SessionHandle::new(SessionKey::new(actor_id, session_id), self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(store: &str) -> MemoryConfig {
        MemoryConfig {
            store: store.into(),
            memory_id: "mem-test".into(),
            region: "local".into(),
            default_session_id: "default_session".into(),
            default_actor_id: "default_user".into(),
            recent_turns: 5,
            fact_top_k: 3,
            transcript_cap: None,
        }
    }

    #[test]
    fn builds_tmp_store() {
        let dir = TempDir::new().unwrap();
        let mem = MemorySystem::new(&config("tmp"), dir.path()).unwrap();
        assert_eq!(mem.store_type(), "tmp");
        assert_eq!(mem.memory_id(), "mem-test");
        assert_eq!(mem.region(), "local");
    }

    #[tokio::test]
    async fn basic_session_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let first = MemorySystem::new(&config("basic_session"), dir.path()).unwrap();
        assert!(dir.path().join("memory/mem-test").is_dir());

        first.session("alice", "s1").append_turn(Role::User, "remember me").await.unwrap();

        let second = MemorySystem::new(&config("basic_session"), dir.path()).unwrap();
        let turns = second.session("alice", "s1").recent_turns(5).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "remember me");
    }

    #[test]
    fn unknown_store_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = MemorySystem::new(&config("redis"), dir.path()).err().unwrap();
        assert!(err.to_string().contains("unknown memory store 'redis'"));
    }
}
