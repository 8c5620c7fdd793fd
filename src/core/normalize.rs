//! core::normalize
//!
//! The Event Normalizer: converts raw log records into the two canonical,
//! time-ordered event sequences the reconciler consumes.
//!
//! # Design
//!
//! Normalization is a pure transform over already-fetched data. It never
//! fails: a record with an unparseable identity, a missing timestamp, or a
//! timestamp outside the run's window is dropped and counted, and the
//! caller reports the count. Rights records are collapsed into net deltas
//! (`added = new - old`, `removed = old - new`).
//!
//! # Origins
//!
//! Local rights records target `User:Name` titles. Shared-origin records
//! (from the identity-management wiki) target `User:Name@dbname`; records
//! qualified for a different wiki are dropped, matching ones have the
//! qualifier stripped before the username is resolved. Rename records on
//! both origins carry plain old/new names in their parameters.

use std::collections::BTreeSet;

use super::event::{GroupChangeEvent, RawLogEvent, RenameEvent, Window};
use super::types::{Group, Username};

/// Normalizes raw log records for one run.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use masslist::core::event::{RawLogEvent, Window};
/// use masslist::core::normalize::Normalizer;
///
/// let window = Window::new(
///     Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
/// )
/// .unwrap();
/// let normalizer = Normalizer::new(window, "enwiki");
///
/// let raw = RawLogEvent {
///     title: Some("User:Example".to_string()),
///     timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
///     old_groups: Some(vec![]),
///     new_groups: Some(vec!["sysop".to_string()]),
///     ..Default::default()
/// };
///
/// let (changes, skipped) = normalizer.group_changes(&[raw], &[]);
/// assert_eq!(changes.len(), 1);
/// assert_eq!(skipped, 0);
/// assert_eq!(changes[0].user.as_str(), "Example");
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer {
    window: Window,
    db_name: String,
}

impl Normalizer {
    /// Create a normalizer for a run window and local wiki db name.
    pub fn new(window: Window, db_name: impl Into<String>) -> Self {
        Self {
            window,
            db_name: db_name.into(),
        }
    }

    /// Normalize rename records (local and shared origins alike) into an
    /// ascending-timestamp sequence.
    ///
    /// Returns the sequence and the number of skipped records.
    pub fn renames(&self, records: &[RawLogEvent]) -> (Vec<RenameEvent>, usize) {
        let mut events = Vec::new();
        let mut skipped = 0;
        for record in records {
            match self.rename_from(record) {
                Some(event) => events.push(event),
                None => skipped += 1,
            }
        }
        events.sort_by_key(|e| e.timestamp);
        (events, skipped)
    }

    /// Normalize rights records from both origins into an
    /// ascending-timestamp sequence of net group deltas.
    ///
    /// Returns the sequence and the number of skipped records. Shared
    /// records qualified for another wiki count as skipped.
    pub fn group_changes(
        &self,
        local: &[RawLogEvent],
        shared: &[RawLogEvent],
    ) -> (Vec<GroupChangeEvent>, usize) {
        let mut events = Vec::new();
        let mut skipped = 0;

        let mut push = |record: &RawLogEvent, qualified: bool| match self
            .group_change_from(record, qualified)
        {
            Some(event) => events.push(event),
            None => skipped += 1,
        };

        for record in local {
            push(record, false);
        }
        for record in shared {
            push(record, true);
        }

        events.sort_by_key(|e| e.timestamp);
        (events, skipped)
    }

    fn rename_from(&self, record: &RawLogEvent) -> Option<RenameEvent> {
        let timestamp = record.timestamp.filter(|t| self.window.contains(*t))?;
        let old = Username::new(record.old_user.as_deref()?).ok()?;
        let new = Username::new(record.new_user.as_deref()?).ok()?;
        Some(RenameEvent {
            old,
            new,
            timestamp,
        })
    }

    fn group_change_from(&self, record: &RawLogEvent, qualified: bool) -> Option<GroupChangeEvent> {
        let timestamp = record.timestamp.filter(|t| self.window.contains(*t))?;
        let title = record.title.as_deref()?;

        // Shared-origin targets carry an `@dbname` qualifier; only records
        // for this wiki apply.
        let title = if qualified {
            title.strip_suffix(&format!("@{}", self.db_name))?
        } else {
            title
        };

        // The rights log targets the user page; the username is the text
        // after the namespace prefix.
        let (_, name) = title.split_once(':')?;
        let user = Username::new(name).ok()?;

        let old: BTreeSet<Group> = parse_groups(record.old_groups.as_deref()?)?;
        let new: BTreeSet<Group> = parse_groups(record.new_groups.as_deref()?)?;

        Some(GroupChangeEvent {
            added: new.difference(&old).cloned().collect(),
            removed: old.difference(&new).cloned().collect(),
            user,
            timestamp,
        })
    }
}

/// Parse a raw group list, rejecting the whole record when any name is
/// malformed.
fn parse_groups(raw: &[String]) -> Option<BTreeSet<Group>> {
    raw.iter().map(|g| Group::new(g).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    fn normalizer() -> Normalizer {
        let window = Window::new(at(0), at(23)).unwrap();
        Normalizer::new(window, "enwiki")
    }

    fn rights(title: &str, old: &[&str], new: &[&str], timestamp: DateTime<Utc>) -> RawLogEvent {
        RawLogEvent {
            title: Some(title.to_string()),
            timestamp: Some(timestamp),
            old_groups: Some(old.iter().map(|s| s.to_string()).collect()),
            new_groups: Some(new.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    fn rename(old: &str, new: &str, timestamp: DateTime<Utc>) -> RawLogEvent {
        RawLogEvent {
            old_user: Some(old.to_string()),
            new_user: Some(new.to_string()),
            timestamp: Some(timestamp),
            ..Default::default()
        }
    }

    mod renames {
        use super::*;

        #[test]
        fn parses_and_sorts_ascending() {
            let (events, skipped) = normalizer().renames(&[
                rename("Late", "Later", at(5)),
                rename("Early", "Earlier", at(1)),
            ]);
            assert_eq!(skipped, 0);
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].old.as_str(), "Early");
            assert_eq!(events[1].old.as_str(), "Late");
        }

        #[test]
        fn missing_fields_skipped() {
            let incomplete = RawLogEvent {
                old_user: Some("Example".to_string()),
                timestamp: Some(at(1)),
                ..Default::default()
            };
            let (events, skipped) = normalizer().renames(&[incomplete]);
            assert!(events.is_empty());
            assert_eq!(skipped, 1);
        }

        #[test]
        fn invalid_username_skipped() {
            let (events, skipped) = normalizer().renames(&[rename("bad|name", "Fine", at(1))]);
            assert!(events.is_empty());
            assert_eq!(skipped, 1);
        }

        #[test]
        fn outside_window_skipped() {
            let (events, skipped) = normalizer().renames(&[
                rename("A", "B", at(23)), // exclusive upper bound
                rename("C", "D", at(2)),
            ]);
            assert_eq!(events.len(), 1);
            assert_eq!(skipped, 1);
        }
    }

    mod group_changes {
        use super::*;

        #[test]
        fn collapses_to_net_deltas() {
            let raw = rights(
                "User:Example",
                &["rollbacker", "sysop"],
                &["sysop", "bureaucrat"],
                at(1),
            );
            let (events, skipped) = normalizer().group_changes(&[raw], &[]);
            assert_eq!(skipped, 0);
            let event = &events[0];
            assert_eq!(event.user.as_str(), "Example");
            assert_eq!(
                event.added,
                BTreeSet::from([Group::new("bureaucrat").unwrap()])
            );
            assert_eq!(
                event.removed,
                BTreeSet::from([Group::new("rollbacker").unwrap()])
            );
        }

        #[test]
        fn unchanged_membership_yields_empty_deltas() {
            let raw = rights("User:Example", &["sysop"], &["sysop"], at(1));
            let (events, _) = normalizer().group_changes(&[raw], &[]);
            assert!(events[0].added.is_empty());
            assert!(events[0].removed.is_empty());
        }

        #[test]
        fn shared_origin_qualifier_stripped() {
            let raw = rights("User:Example@enwiki", &[], &["sysop"], at(1));
            let (events, skipped) = normalizer().group_changes(&[], &[raw]);
            assert_eq!(skipped, 0);
            assert_eq!(events[0].user.as_str(), "Example");
        }

        #[test]
        fn shared_origin_other_wiki_dropped() {
            let raw = rights("User:Example@dewiki", &[], &["sysop"], at(1));
            let (events, skipped) = normalizer().group_changes(&[], &[raw]);
            assert!(events.is_empty());
            assert_eq!(skipped, 1);
        }

        #[test]
        fn local_record_with_qualifier_kept_verbatim() {
            // Qualifiers only mean something on the shared origin; a local
            // title containing '@' is not a valid username and is skipped.
            let raw = rights("User:Example@enwiki", &[], &["sysop"], at(1));
            let (events, skipped) = normalizer().group_changes(&[raw], &[]);
            assert!(events.is_empty());
            assert_eq!(skipped, 1);
        }

        #[test]
        fn title_without_namespace_skipped() {
            let raw = rights("Example", &[], &["sysop"], at(1));
            let (_, skipped) = normalizer().group_changes(&[raw], &[]);
            assert_eq!(skipped, 1);
        }

        #[test]
        fn merged_origins_sorted_by_timestamp() {
            let local = rights("User:Local", &[], &["sysop"], at(5));
            let shared = rights("User:Remote@enwiki", &[], &["sysop"], at(2));
            let (events, _) = normalizer().group_changes(&[local], &[shared]);
            assert_eq!(events[0].user.as_str(), "Remote");
            assert_eq!(events[1].user.as_str(), "Local");
        }
    }
}
