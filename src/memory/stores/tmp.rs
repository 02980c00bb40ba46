//! `tmp` store: in-process transcripts, discarded when the process exits.
//!
//! This is the collaborator used in local runs. It lives outside every
//! request handler (constructed once at start, reached only through
//! [`MemoryStore`]), so handlers stay stateless while sessions still
//! persist for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::AppError;
use super::super::store::{Fact, MemoryStore, Role, SessionKey, Turn, rank_facts};

/// Default maximum number of turns kept per session before FIFO eviction.
const DEFAULT_TRANSCRIPT_CAP: usize = 500;

pub struct TmpStore {
    transcript_cap: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Store-wide insertion counter; orders turns across sessions.
    next_seq: u64,
    sessions: HashMap<SessionKey, Vec<(u64, Turn)>>,
}

impl TmpStore {
    pub fn new(transcript_cap: Option<usize>) -> Self {
        Self {
            transcript_cap: transcript_cap.unwrap_or(DEFAULT_TRANSCRIPT_CAP),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Memory("tmp store lock poisoned".into()))
    }
}

impl Default for TmpStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryStore for TmpStore {
    fn store_type(&self) -> &str {
        "tmp"
    }

    fn recent_turns(&self, key: &SessionKey, k: usize) -> Result<Vec<Turn>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .sessions
            .get(key)
            .map(|turns| {
                turns[turns.len().saturating_sub(k)..]
                    .iter()
                    .map(|(_, t)| t.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let turns = inner.sessions.entry(key.clone()).or_default();
        turns.push((seq, turn));
        let excess = turns.len().saturating_sub(self.transcript_cap);
        turns.drain(..excess);
        Ok(())
    }

    fn search_facts(&self, namespace: &str, query: &str, top_n: usize) -> Result<Vec<Fact>, AppError> {
        let inner = self.lock()?;

        let mut user_turns: Vec<&(u64, Turn)> = inner
            .sessions
            .iter()
            .filter(|(key, _)| key.actor_id == namespace)
            .flat_map(|(_, turns)| turns.iter())
            .filter(|(_, t)| t.role == Role::User)
            .collect();
        user_turns.sort_by_key(|(seq, _)| *seq);

        Ok(rank_facts(query, user_turns.iter().map(|(_, t)| t.content.as_str()), top_n))
    }
}
