//! wiki::mock
//!
//! Mock wiki implementation for deterministic testing.
//!
//! # Design
//!
//! The mock wiki provides a deterministic implementation of the `Wiki`
//! trait. It stores pages, log records and group membership in memory,
//! records every save for verification, and allows configuring failure
//! scenarios (including failing a save for one specific page, which is
//! how per-list non-cascading failure is tested).
//!
//! # Example
//!
//! ```
//! use masslist::wiki::mock::MockWiki;
//! use masslist::wiki::Wiki;
//!
//! # tokio_test::block_on(async {
//! let wiki = MockWiki::new("testwiki");
//! wiki.set_page("Main Page", "hello");
//!
//! let page = wiki.fetch_page("Main Page").await.unwrap().unwrap();
//! assert_eq!(page.text, "hello");
//!
//! assert!(wiki.fetch_page("Missing").await.unwrap().is_none());
//! # });
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::traits::{PageText, Wiki, WikiError};
use crate::core::event::{LogKind, RawLogEvent, Window};
use crate::core::types::{Group, Username};

/// Mock wiki for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share
/// state.
#[derive(Debug, Clone)]
pub struct MockWiki {
    name: String,
    inner: Arc<Mutex<MockWikiInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockWikiInner {
    /// Page text by title.
    pages: HashMap<String, PageText>,
    /// Raw log records by kind.
    rights_log: Vec<RawLogEvent>,
    rename_log: Vec<RawLogEvent>,
    global_rename_log: Vec<RawLogEvent>,
    /// Live group membership.
    groups: BTreeMap<Username, BTreeSet<Group>>,
    /// Recorded saves for verification.
    saves: Vec<SavedPage>,
    /// Scripted failure.
    fail_on: Option<FailOn>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail fetch_log_events with the given error.
    FetchLogEvents(WikiError),
    /// Fail fetch_page with the given error.
    FetchPage(WikiError),
    /// Fail fetch_user_groups with the given error.
    FetchUserGroups(WikiError),
    /// Fail save_page with the given error; when `title` is set, only
    /// saves of that page fail.
    SavePage {
        title: Option<String>,
        error: WikiError,
    },
}

/// A recorded save for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPage {
    pub title: String,
    pub text: String,
    pub summary: String,
    pub base_timestamp: Option<DateTime<Utc>>,
}

impl MockWiki {
    /// Create a new empty mock wiki.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(MockWikiInner::default())),
        }
    }

    /// Set a page's text. The base timestamp is fixed so repeated reads
    /// are deterministic.
    pub fn set_page(&self, title: impl Into<String>, text: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.insert(
            title.into(),
            PageText {
                text: text.into(),
                base_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
        );
    }

    /// Remove a page.
    pub fn delete_page(&self, title: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.remove(title);
    }

    /// Append a raw log record for a kind.
    pub fn push_log(&self, kind: LogKind, record: RawLogEvent) {
        let mut inner = self.inner.lock().unwrap();
        match kind {
            LogKind::Rights => inner.rights_log.push(record),
            LogKind::Rename => inner.rename_log.push(record),
            LogKind::GlobalRename => inner.global_rename_log.push(record),
        }
    }

    /// Set a user's live groups.
    pub fn set_groups(&self, user: Username, groups: BTreeSet<Group>) {
        let mut inner = self.inner.lock().unwrap();
        inner.groups.insert(user, groups);
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use masslist::wiki::mock::{FailOn, MockWiki};
    /// use masslist::wiki::WikiError;
    ///
    /// let wiki = MockWiki::new("testwiki").fail_on(FailOn::FetchPage(WikiError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// All recorded saves, in order.
    pub fn saves(&self) -> Vec<SavedPage> {
        let inner = self.inner.lock().unwrap();
        inner.saves.clone()
    }
}

#[async_trait]
impl Wiki for MockWiki {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_log_events(
        &self,
        kind: LogKind,
        window: &Window,
    ) -> Result<Vec<RawLogEvent>, WikiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::FetchLogEvents(error)) = &inner.fail_on {
            return Err(error.clone());
        }
        let log = match kind {
            LogKind::Rights => &inner.rights_log,
            LogKind::Rename => &inner.rename_log,
            LogKind::GlobalRename => &inner.global_rename_log,
        };
        // A real API is asked for the window server-side; mirror that.
        Ok(log
            .iter()
            .filter(|r| r.timestamp.is_some_and(|t| window.contains(t)))
            .cloned()
            .collect())
    }

    async fn fetch_page(&self, title: &str) -> Result<Option<PageText>, WikiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::FetchPage(error)) = &inner.fail_on {
            return Err(error.clone());
        }
        Ok(inner.pages.get(title).cloned())
    }

    async fn fetch_user_groups(
        &self,
        users: &[Username],
    ) -> Result<BTreeMap<Username, BTreeSet<Group>>, WikiError> {
        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::FetchUserGroups(error)) = &inner.fail_on {
            return Err(error.clone());
        }
        Ok(users
            .iter()
            .filter_map(|u| inner.groups.get(u).map(|g| (u.clone(), g.clone())))
            .collect())
    }

    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        base_timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), WikiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(FailOn::SavePage {
            title: only,
            error,
        }) = &inner.fail_on
        {
            if only.as_deref().map_or(true, |t| t == title) {
                return Err(error.clone());
            }
        }
        inner.pages.insert(
            title.to_string(),
            PageText {
                text: text.to_string(),
                base_timestamp: base_timestamp
                    .unwrap_or_else(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            },
        );
        inner.saves.push(SavedPage {
            title: title.to_string(),
            text: text.to_string(),
            summary: summary.to_string(),
            base_timestamp,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn pages_roundtrip() {
        tokio_test::block_on(async {
            let wiki = MockWiki::new("testwiki");
            wiki.set_page("A", "text");
            assert_eq!(wiki.fetch_page("A").await.unwrap().unwrap().text, "text");
            wiki.delete_page("A");
            assert!(wiki.fetch_page("A").await.unwrap().is_none());
        });
    }

    #[test]
    fn log_events_filtered_by_window() {
        tokio_test::block_on(async {
            let wiki = MockWiki::new("testwiki");
            wiki.push_log(
                LogKind::Rights,
                RawLogEvent {
                    timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
                    ..Default::default()
                },
            );
            wiki.push_log(
                LogKind::Rights,
                RawLogEvent {
                    timestamp: Some(Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap()),
                    ..Default::default()
                },
            );
            let events = wiki.fetch_log_events(LogKind::Rights, &window()).await.unwrap();
            assert_eq!(events.len(), 1);
        });
    }

    #[test]
    fn saves_are_recorded() {
        tokio_test::block_on(async {
            let wiki = MockWiki::new("testwiki");
            wiki.save_page("A", "new text", "summary", None).await.unwrap();
            let saves = wiki.saves();
            assert_eq!(saves.len(), 1);
            assert_eq!(saves[0].title, "A");
            assert_eq!(saves[0].summary, "summary");
            // The save is visible on subsequent reads.
            assert_eq!(wiki.fetch_page("A").await.unwrap().unwrap().text, "new text");
        });
    }

    #[test]
    fn scripted_save_failure_for_one_title() {
        tokio_test::block_on(async {
            let wiki = MockWiki::new("testwiki").fail_on(FailOn::SavePage {
                title: Some("B".to_string()),
                error: WikiError::EditConflict("B".to_string()),
            });
            assert!(wiki.save_page("A", "x", "s", None).await.is_ok());
            assert!(matches!(
                wiki.save_page("B", "x", "s", None).await,
                Err(WikiError::EditConflict(_))
            ));
            wiki.clear_fail_on();
            assert!(wiki.save_page("B", "x", "s", None).await.is_ok());
        });
    }

    #[test]
    fn group_lookup_skips_unknown_users() {
        tokio_test::block_on(async {
            let wiki = MockWiki::new("testwiki");
            let alice = Username::new("Alice").unwrap();
            let bob = Username::new("Bob").unwrap();
            wiki.set_groups(alice.clone(), BTreeSet::from([Group::new("sysop").unwrap()]));

            let groups = wiki
                .fetch_user_groups(&[alice.clone(), bob])
                .await
                .unwrap();
            assert_eq!(groups.len(), 1);
            assert!(groups.contains_key(&alice));
        });
    }
}
