//! `basic_session` store — capped Markdown transcript per session on disk.
//!
//! Layout under the store root:
//! - `{actor}/{session}/transcript.md` — `### {role} — {timestamp}` delimiters
//!
//! Content lines starting with `#` or `\` are written with a leading `\`,
//! so no turn can produce an entry header. Transcripts are replaced by
//! rename, never truncated in place; readers see either the old or the new
//! file.
//!
//! Path segments are sanitised, so any id is safe to use. Transcripts are
//! capped by entry count (FIFO, oldest entries dropped first). Fact search
//! reads every session transcript of one actor.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AppError;
use super::super::store::{Fact, MemoryStore, Role, SessionKey, Turn, now_iso8601, rank_facts};

/// Default maximum number of transcript entries before FIFO eviction.
const DEFAULT_TRANSCRIPT_CAP: usize = 500;

const TRANSCRIPT_FILENAME: &str = "transcript.md";

/// Prefix that keeps a content line from reading as a header.
const ESCAPE: char = '\\';

pub struct BasicSessionStore {
    root: PathBuf,
    transcript_cap: usize,
    /// Serialises read-modify-write cycles on transcript files.
    write_lock: Mutex<()>,
}

impl BasicSessionStore {
    pub fn new(root: impl Into<PathBuf>, transcript_cap: Option<usize>) -> Self {
        Self {
            root: root.into(),
            transcript_cap: transcript_cap.unwrap_or(DEFAULT_TRANSCRIPT_CAP),
            write_lock: Mutex::new(()),
        }
    }

    fn actor_dir(&self, actor_id: &str) -> PathBuf {
        self.root.join(sanitize_segment(actor_id))
    }

    fn transcript_path(&self, key: &SessionKey) -> PathBuf {
        self.actor_dir(&key.actor_id)
            .join(sanitize_segment(&key.session_id))
            .join(TRANSCRIPT_FILENAME)
    }

    fn read_entries(path: &Path) -> Result<Vec<Turn>, AppError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(parse_transcript(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Memory(format!("cannot read {}: {e}", path.display()))),
        }
    }
}

impl MemoryStore for BasicSessionStore {
    fn store_type(&self) -> &str {
        "basic_session"
    }

    fn recent_turns(&self, key: &SessionKey, k: usize) -> Result<Vec<Turn>, AppError> {
        let entries = Self::read_entries(&self.transcript_path(key))?;
        let start = entries.len().saturating_sub(k);
        Ok(entries[start..].to_vec())
    }

    fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<(), AppError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Memory("transcript lock poisoned".into()))?;

        let path = self.transcript_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| AppError::Memory(format!("cannot create {}: {e}", dir.display())))?;
        }

        // Read, parse, append, cap, write-back.
        let mut entries = Self::read_entries(&path)?;
        entries.push(turn);
        let excess = entries.len().saturating_sub(self.transcript_cap);
        entries.drain(..excess);

        let out = serialise_transcript(&entries);
        let dir = path.parent().unwrap_or(self.root.as_path());
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| AppError::Memory(format!("cannot write {}: {e}", path.display())))?;
        tmp.write_all(out.as_bytes())
            .map_err(|e| AppError::Memory(format!("write {}: {e}", path.display())))?;
        tmp.persist(&path)
            .map_err(|e| AppError::Memory(format!("cannot replace {}: {e}", path.display())))?;

        Ok(())
    }

    fn search_facts(&self, namespace: &str, query: &str, top_n: usize) -> Result<Vec<Fact>, AppError> {
        let actor_dir = self.actor_dir(namespace);
        let sessions = match fs::read_dir(&actor_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Memory(format!("cannot list {}: {e}", actor_dir.display())));
            }
        };

        let mut user_turns = Vec::new();
        for entry in sessions.flatten() {
            let path = entry.path().join(TRANSCRIPT_FILENAME);
            if !path.is_file() {
                continue;
            }
            user_turns.extend(
                Self::read_entries(&path)?
                    .into_iter()
                    .filter(|t| t.role == Role::User),
            );
        }
        user_turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(rank_facts(query, user_turns.iter().map(|t| t.content.as_str()), top_n))
    }
}

// ── Transcript format ─────────────────────────────────────────────────────

/// Parse transcript.md into turns by splitting on `### ` headers.
/// Entries with an unknown role are skipped; escaped lines are restored.
fn parse_transcript(text: &str) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut current: Option<(Option<Role>, String, Vec<&str>)> = None;

    fn flush(entry: Option<(Option<Role>, String, Vec<&str>)>, turns: &mut Vec<Turn>) {
        if let Some((Some(role), timestamp, lines)) = entry {
            turns.push(Turn { role, timestamp, content: lines.join("\n").trim().to_string() });
        }
    }

    for line in text.lines() {
        if let Some(header) = line.strip_prefix("### ") {
            flush(current.take(), &mut turns);
            let (role, ts) = match header.split_once(" — ") {
                Some((r, t)) => (r, t.trim().to_string()),
                None => (header, String::new()),
            };
            current = Some((Role::parse(role), ts, Vec::new()));
        } else if let Some((_, _, ref mut lines)) = current {
            lines.push(line.strip_prefix(ESCAPE).unwrap_or(line));
        }
    }
    flush(current, &mut turns);
    turns
}

fn serialise_transcript(turns: &[Turn]) -> String {
    let mut out = String::new();
    for t in turns {
        let ts = if t.timestamp.is_empty() { now_iso8601() } else { t.timestamp.clone() };
        out.push_str(&format!("### {} — {}\n\n", t.role, ts));
        for line in t.content.lines() {
            if line.starts_with('#') || line.starts_with(ESCAPE) {
                out.push(ESCAPE);
            }
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Map an id onto a single safe path segment.
fn sanitize_segment(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}
