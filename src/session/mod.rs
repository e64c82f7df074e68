#[cfg(test)]
mod tests;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{ChatError, Result};

const HISTORY_FILE: &str = "history.json";
const ACTIVE_SESSION_FILE: &str = "active_session";

/// Wire format for turn timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable identity owning one conversation history and one document set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One question/answer exchange. Append-only and chronological within a
/// session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    #[serde(rename = "user_time", with = "timestamp_format")]
    pub asked_at: NaiveDateTime,
    #[serde(rename = "bot_time", with = "timestamp_format")]
    pub answered_at: NaiveDateTime,
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}

/// Durable, bounded conversation history: one directory per session
/// identity, one JSON file per history, rewritten wholesale through a temp
/// file and rename so a reader never observes a partial write.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    max_turns: usize,
}

impl SessionStore {
    #[inline]
    pub fn new(sessions_dir: PathBuf, max_turns: usize) -> Result<Self> {
        fs::create_dir_all(&sessions_dir).map_err(|e| {
            ChatError::Session(format!(
                "failed to create sessions directory {}: {e}",
                sessions_dir.display()
            ))
        })?;
        Ok(Self {
            sessions_dir,
            max_turns,
        })
    }

    /// Return the caller's stable session identity, allocating a fresh one
    /// (and provisioning its storage) on first use.
    #[inline]
    pub fn create_or_resume(&self) -> Result<SessionId> {
        let marker = self.sessions_dir.join(ACTIVE_SESSION_FILE);

        if let Ok(raw) = fs::read_to_string(&marker) {
            if let Ok(id) = raw.trim().parse::<Uuid>() {
                debug!("Resumed session {id}");
                return Ok(SessionId(id));
            }
            warn!("Ignoring malformed session marker; allocating a new session");
        }

        let id = SessionId::new();
        fs::create_dir_all(self.session_dir(id)).map_err(|e| {
            ChatError::Session(format!("failed to provision session storage: {e}"))
        })?;
        fs::write(&marker, id.to_string())
            .map_err(|e| ChatError::Session(format!("failed to record session identity: {e}")))?;

        debug!("Created session {id}");
        Ok(id)
    }

    fn session_dir(&self, id: SessionId) -> PathBuf {
        self.sessions_dir.join(id.to_string())
    }

    fn history_path(&self, id: SessionId) -> PathBuf {
        self.session_dir(id).join(HISTORY_FILE)
    }

    /// Append one turn, evicting the oldest once the history exceeds the
    /// configured cap, and write the truncated list back atomically.
    #[inline]
    pub fn append_turn(&self, id: SessionId, turn: ConversationTurn) -> Result<()> {
        let mut turns = self.load_all(id);
        turns.push(turn);

        if turns.len() > self.max_turns {
            let excess = turns.len() - self.max_turns;
            turns.drain(..excess);
        }

        let dir = self.session_dir(id);
        fs::create_dir_all(&dir)
            .map_err(|e| ChatError::Session(format!("failed to create session storage: {e}")))?;

        let json = serde_json::to_string_pretty(&turns)
            .map_err(|e| ChatError::Session(format!("failed to serialize history: {e}")))?;

        // Write to a temp path in the same directory, then rename over the
        // real file so readers never see a partially written history.
        let path = self.history_path(id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| ChatError::Session(format!("failed to write history: {e}")))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| ChatError::Session(format!("failed to commit history: {e}")))?;

        Ok(())
    }

    /// Up to the `n` most recent turns in chronological order; empty when
    /// nothing has been persisted yet.
    #[inline]
    pub fn load_recent(&self, id: SessionId, n: usize) -> Result<Vec<ConversationTurn>> {
        let mut turns = self.load_all(id);
        if turns.len() > n {
            let excess = turns.len() - n;
            turns.drain(..excess);
        }
        Ok(turns)
    }

    /// Delete all turns for the session, in durable storage too. Idempotent.
    #[inline]
    pub fn clear(&self, id: SessionId) -> Result<()> {
        let dir = self.session_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| ChatError::Session(format!("failed to clear session: {e}")))?;
        }
        Ok(())
    }

    /// Remove whole sessions whose storage has not been touched within the
    /// retention window. Best-effort housekeeping: per-session scan or
    /// delete failures are logged and skipped, never fatal.
    #[inline]
    pub fn reap_expired(&self, older_than_days: u64) -> Result<usize> {
        let cutoff = SystemTime::now() - Duration::from_secs(older_than_days * 24 * 60 * 60);

        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not scan sessions directory: {e}");
                return Ok(0);
            }
        };

        let mut removed = 0;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            // Prefer the history file's own mtime; fall back to the
            // directory for sessions that never wrote one.
            let modified = fs::metadata(path.join(HISTORY_FILE))
                .or_else(|_| fs::metadata(&path))
                .and_then(|m| m.modified());

            match modified {
                Ok(mtime) if mtime < cutoff => match fs::remove_dir_all(&path) {
                    Ok(()) => {
                        debug!("Reaped expired session at {}", path.display());
                        removed += 1;
                    }
                    Err(e) => warn!("Failed to reap session {}: {e}", path.display()),
                },
                Ok(_) => {}
                Err(e) => warn!("Could not stat session {}: {e}", path.display()),
            }
        }

        Ok(removed)
    }

    /// Load the full persisted history, treating a corrupt or unreadable
    /// file as "no history" rather than an error.
    fn load_all(&self, id: SessionId) -> Vec<ConversationTurn> {
        let path = self.history_path(id);
        if !path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Unreadable history for session {id}: {e}; treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(turns) => turns,
            Err(e) => {
                warn!("Corrupt history for session {id}: {e}; treating as empty");
                Vec::new()
            }
        }
    }
}
