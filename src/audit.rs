//! Audit logging for conversation turns.
//!
//! This module provides the [`AuditLog`] trait that lets callers capture every
//! turn a session commits, and [`FileAuditLog`], which appends one line per
//! turn to a file in the form `<timestamp>: <level>: <message>`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::Error;
use crate::error::Result;
use crate::types::Message;

/// Severity of an audit line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    /// Normal conversation traffic.
    Info,
    /// Something the operator may want to look at.
    Warn,
    /// A failed turn.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// A sink for conversation turns.
///
/// Implementations must not fail the conversation: errors writing the log
/// are swallowed.
pub trait AuditLog: Send + Sync {
    /// Record one line.
    fn record(&self, level: Level, message: &str);

    /// Record a user turn, called once per message appended by `send`.
    fn log_user_turn(&self, message: &Message) {
        self.record(Level::Info, &format!("{}: {}", message.role, message.content));
    }

    /// Record a completed assistant turn.
    fn log_assistant_turn(&self, message: &Message) {
        self.record(Level::Info, &format!("{}: {}", message.role, message.content));
    }
}

/// Format one audit line, escaping newlines so every record is one line.
pub fn format_line(timestamp: OffsetDateTime, level: Level, message: &str) -> String {
    let timestamp = timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string());
    let message = message.replace('\r', "").replace('\n', "\\n");
    format!("{timestamp}: {level}: {message}")
}

/// An append-only audit log file.
pub struct FileAuditLog {
    file: Mutex<File>,
}

impl FileAuditLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open audit log", err))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditLog for FileAuditLog {
    fn record(&self, level: Level, message: &str) {
        let line = format_line(OffsetDateTime::now_utc(), level, message);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn line_format() {
        let line = format_line(
            datetime!(2024-11-05 14:03:07 UTC),
            Level::Info,
            "user: Where is my order?",
        );
        assert_eq!(line, "2024-11-05T14:03:07Z: INFO: user: Where is my order?");
    }

    #[test]
    fn multiline_messages_stay_on_one_line() {
        let line = format_line(
            datetime!(2024-11-05 14:03:07 UTC),
            Level::Warn,
            "first\r\nsecond",
        );
        assert_eq!(line, "2024-11-05T14:03:07Z: WARN: first\\nsecond");
    }

    #[test]
    fn file_log_appends() {
        let path = std::env::temp_dir().join(format!("chatline-audit-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let log = FileAuditLog::open(&path).unwrap();
            log.log_user_turn(&Message::user("hi"));
            log.log_assistant_turn(&Message::assistant("hello\nthere"));
        }
        {
            let log = FileAuditLog::open(&path).unwrap();
            log.record(Level::Error, "provider failed");
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(": INFO: user: hi"));
        assert!(lines[1].ends_with(": INFO: assistant: hello\\nthere"));
        assert!(lines[2].ends_with(": ERROR: provider failed"));
        std::fs::remove_file(&path).unwrap();
    }
}
