//! Store trait: the data operations a memory backend supports.
//!
//! Stores are pluggable backends keyed by [`SessionKey`]. Every store keeps
//! an append-only transcript of [`Turn`]s per session; long-term fact search
//! is optional and the default method reports it as unsupported.

use std::collections::HashSet;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Case-insensitive parse; unknown roles yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one conversation thread. `actor_id` doubles as the
/// namespace for long-term fact search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub actor_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(actor_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self { actor_id: actor_id.into(), session_id: session_id.into() }
    }
}

/// One message in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// ISO-8601 UTC timestamp of when the turn was stored.
    pub timestamp: String,
}

impl Turn {
    /// A turn stamped with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), timestamp: now_iso8601() }
    }
}

/// A long-term memory hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub content: String,
    /// Relevance in `(0, 1]`.
    pub score: f32,
}

/// Pluggable memory backend.
///
/// Methods are blocking; [`SessionHandle`](super::handle::SessionHandle)
/// runs them on `spawn_blocking`.
pub trait MemoryStore: Send + Sync {
    /// Unique type name for this store (e.g. `"basic_session"`).
    fn store_type(&self) -> &str;

    /// The last `k` turns of the session, oldest first.
    fn recent_turns(&self, key: &SessionKey, k: usize) -> Result<Vec<Turn>, AppError>;

    fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<(), AppError>;

    /// Up to `top_n` facts relevant to `query` within `namespace`, best first.
    fn search_facts(
        &self,
        _namespace: &str,
        _query: &str,
        _top_n: usize,
    ) -> Result<Vec<Fact>, AppError> {
        Err(AppError::Memory(format!(
            "store '{}' does not support search_facts",
            self.store_type()
        )))
    }
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

const STOPWORDS: &[&str] = &[
    "the", "and", "are", "was", "what", "who", "you", "your", "for", "with", "this", "that",
    "about", "have", "has", "can", "does", "did", "from", "not", "but", "all", "any", "how",
    "why", "when", "where", "know", "tell",
];

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Rank `candidates` (oldest first) by the share of `query` terms they
/// contain. Ties go to the newer candidate; duplicates are dropped and
/// zero-score candidates never returned.
pub fn rank_facts<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    top_n: usize,
) -> Vec<Fact> {
    let wanted = terms(query);
    if wanted.is_empty() || top_n == 0 {
        return Vec::new();
    }

    let candidates: Vec<&str> = candidates.into_iter().collect();
    let mut seen = HashSet::new();
    let mut scored: Vec<Fact> = candidates
        .into_iter()
        .rev()
        .filter(|c| seen.insert(c.trim().to_string()))
        .filter_map(|c| {
            let have = terms(c);
            let hits = wanted.iter().filter(|t| have.contains(*t)).count();
            (hits > 0).then(|| Fact {
                content: c.trim().to_string(),
                score: hits as f32 / wanted.len() as f32,
            })
        })
        .collect();

    // Stable sort keeps newest-first order among equal scores.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);
    scored
}
