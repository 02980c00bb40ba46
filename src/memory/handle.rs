//! [`SessionHandle`] — async-safe handle for reading and writing one session.
//!
//! Agents receive a `SessionHandle` from [`MemorySystem::session`]. All store
//! I/O is dispatched to a blocking thread pool so callers remain non-blocking.
//!
//! [`MemorySystem::session`]: super::MemorySystem::session

use std::sync::Arc;

use crate::error::AppError;
use super::store::{Fact, MemoryStore, Role, SessionKey, Turn};

/// Cheaply cloneable (`Arc`-backed) handle bound to one [`SessionKey`].
#[derive(Clone)]
pub struct SessionHandle {
    pub key: SessionKey,
    store: Arc<dyn MemoryStore>,
}

impl SessionHandle {
    pub(crate) fn new(key: SessionKey, store: Arc<dyn MemoryStore>) -> Self {
        Self { key, store }
    }

    pub fn session_id(&self) -> &str {
        &self.key.session_id
    }

    pub fn actor_id(&self) -> &str {
        &self.key.actor_id
    }

    /// The last `k` turns, oldest first.
    pub async fn recent_turns(&self, k: usize) -> Result<Vec<Turn>, AppError> {
        let store = self.store.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || store.recent_turns(&key, k))
            .await
            .map_err(|e| AppError::Memory(format!("recent_turns join: {e}")))?
    }

    pub async fn append_turn(&self, role: Role, content: &str) -> Result<(), AppError> {
        let store = self.store.clone();
        let key = self.key.clone();
        let turn = Turn::now(role, content);
        tokio::task::spawn_blocking(move || store.append_turn(&key, turn))
            .await
            .map_err(|e| AppError::Memory(format!("append_turn join: {e}")))?
    }

    /// Fact search scoped to this session's actor namespace.
    pub async fn search_facts(&self, query: &str, top_n: usize) -> Result<Vec<Fact>, AppError> {
        let store = self.store.clone();
        let namespace = self.key.actor_id.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || store.search_facts(&namespace, &query, top_n))
            .await
            .map_err(|e| AppError::Memory(format!("search_facts join: {e}")))?
    }
}
