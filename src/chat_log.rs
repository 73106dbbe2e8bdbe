//! Append-only chat log backing the relay endpoint.
//!
//! On-disk format is a single pretty-printed JSON array; every append
//! reads the whole file, pushes one record, and rewrites it. Single-writer
//! by construction (the server serializes appends behind a mutex).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::errors::StudyError;

/// One logged exchange. Ordering on disk is append order; records are
/// never mutated or deleted after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub role: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one record, creating the file on first use.
    pub fn append(&self, role: &str, content: &str) -> Result<(), StudyError> {
        let mut entries = self.read_entries();
        entries.push(ChatExchange {
            role: role.to_string(),
            timestamp: Utc::now(),
            content: content.to_string(),
        });
        let body = serde_json::to_string_pretty(&entries)
            .map_err(|source| StudyError::serialization("chat log encode", source))?;
        fs::write(&self.path, body).map_err(|source| StudyError::io("write chat log", source))
    }

    pub fn read_entries(&self) -> Vec<ChatExchange> {
        if !self.path.exists() {
            return Vec::new();
        }
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "chat log unreadable, starting fresh");
                return Vec::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(err) => {
                self.quarantine(&err);
                Vec::new()
            }
        }
    }

    /// An unparseable log is moved aside rather than silently discarded;
    /// the log then restarts empty so the append still succeeds.
    fn quarantine(&self, err: &serde_json::Error) {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let aside = self.path.with_extension(format!("corrupt-{stamp}"));
        warn!(
            path = %self.path.display(),
            aside = %aside.display(),
            error = %err,
            "chat log corrupt, moving aside and restarting empty"
        );
        if let Err(rename_err) = fs::rename(&self.path, &aside) {
            warn!(error = %rename_err, "failed to move corrupt chat log aside");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_file_with_one_record() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = ChatLog::new(dir.path().join("chatlog.json"));
        log.append("user", "hello").expect("append");

        let entries = log.read_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, "user");
        assert_eq!(entries[0].content, "hello");
    }

    #[test]
    fn appends_preserve_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = ChatLog::new(dir.path().join("chatlog.json"));
        log.append("user", "first").expect("append");
        log.append("relayResponse", "second").expect("append");
        log.append("user", "third").expect("append");

        let contents: Vec<String> = log
            .read_entries()
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn corrupt_log_is_quarantined_not_silently_dropped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("chatlog.json");
        std::fs::write(&path, "definitely not json").expect("seed corrupt file");

        let log = ChatLog::new(&path);
        log.append("user", "after corruption").expect("append");

        let entries = log.read_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "after corruption");

        let sidecars: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .contains("corrupt-")
            })
            .collect();
        assert_eq!(sidecars.len(), 1);
    }

    #[test]
    fn timestamps_serialize_as_iso8601() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = ChatLog::new(dir.path().join("chatlog.json"));
        log.append("user", "stamped").expect("append");

        let raw = std::fs::read_to_string(log.path()).expect("read raw");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse raw");
        let stamp = value[0]["timestamp"].as_str().expect("timestamp string");
        assert!(stamp.contains('T'));
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
