//! core::event
//!
//! Canonical and raw change events, plus the date window a run covers.
//!
//! # Canonical events
//!
//! The reconciler consumes two canonical, time-ordered sequences:
//!
//! - [`RenameEvent`] - a user identity change (`old` becomes `new`)
//! - [`GroupChangeEvent`] - a net membership transition with `added` and
//!   `removed` group deltas (raw log lines for one moment are already
//!   folded into a single delta by the normalizer)
//!
//! # Raw events
//!
//! [`RawLogEvent`] is the loosely-typed shape of a fetched log record.
//! Every field is optional; the normalizer decides what is usable and
//! skips the rest. Keeping the raw shape permissive means a single
//! malformed record can never fail a run.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Group, Username};

/// A user identity change observed in a rename log.
///
/// Any prior reference to `old` must, after `timestamp`, be treated as a
/// reference to `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
    pub old: Username,
    pub new: Username,
    pub timestamp: DateTime<Utc>,
}

/// A net group membership transition for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChangeEvent {
    pub user: Username,
    /// Groups gained (`new - old` from the raw record).
    pub added: BTreeSet<Group>,
    /// Groups lost (`old - new` from the raw record).
    pub removed: BTreeSet<Group>,
    pub timestamp: DateTime<Utc>,
}

/// The kind of log a run fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Local user rights changes (`rights` log).
    Rights,
    /// Local user renames (`renameuser` log).
    Rename,
    /// Global renames on the shared identity origin (`gblrename` log).
    GlobalRename,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Rights => write!(f, "rights"),
            LogKind::Rename => write!(f, "renameuser"),
            LogKind::GlobalRename => write!(f, "gblrename"),
        }
    }
}

/// A raw log record as fetched from a wiki, before normalization.
///
/// Field presence depends on the log kind: rights records carry `title`,
/// `old_groups` and `new_groups`; rename records carry `old_user` and
/// `new_user`. Records missing what their kind requires are skipped by
/// the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogEvent {
    /// Target page title (`User:Name` locally, `Name@dbname` on the
    /// shared origin).
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub old_user: Option<String>,
    #[serde(default)]
    pub new_user: Option<String>,
    #[serde(default)]
    pub old_groups: Option<Vec<String>>,
    #[serde(default)]
    pub new_groups: Option<Vec<String>>,
}

/// Errors from window construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {start} is after end {end}")]
    StartAfterEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A half-open UTC interval `[start, end)` bounding the events a run
/// will consider.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use masslist::core::event::Window;
///
/// let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
/// let window = Window::new(start, end).unwrap();
///
/// assert!(window.contains(start));
/// assert!(!window.contains(end));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// Create a window, rejecting inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether a timestamp falls inside `[start, end)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let window = Window::new(at(1), at(3)).unwrap();
        assert!(window.contains(at(1)));
        assert!(window.contains(at(2)));
        assert!(!window.contains(at(3)));
        assert!(!window.contains(at(0)));
    }

    #[test]
    fn empty_window_contains_nothing() {
        let window = Window::new(at(1), at(1)).unwrap();
        assert!(!window.contains(at(1)));
    }

    #[test]
    fn inverted_window_rejected() {
        assert_eq!(
            Window::new(at(3), at(1)),
            Err(WindowError::StartAfterEnd {
                start: at(3),
                end: at(1),
            })
        );
    }

    #[test]
    fn log_kind_display_matches_api_names() {
        assert_eq!(LogKind::Rights.to_string(), "rights");
        assert_eq!(LogKind::Rename.to_string(), "renameuser");
        assert_eq!(LogKind::GlobalRename.to_string(), "gblrename");
    }

    #[test]
    fn raw_event_deserializes_with_missing_fields() {
        let raw: RawLogEvent = serde_json::from_str(r#"{"title": "User:Example"}"#).unwrap();
        assert_eq!(raw.title.as_deref(), Some("User:Example"));
        assert!(raw.timestamp.is_none());
        assert!(raw.old_groups.is_none());
    }
}
