//! One-line user notifications raised by the session core.
use std::fmt;

use chrono::{DateTime, Local};
use strum::Display;

/// Severity of a notice.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    Info,
}

/// A categorized, human-readable notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
    /// Local time the notice was raised.
    pub raised_at: DateTime<Local>,
}

impl Notice {
    /// Notice stamped with the current local time.
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at: Local::now(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.raised_at.format("%d/%m/%Y %H:%M:%S"),
            self.kind,
            self.message
        )
    }
}
