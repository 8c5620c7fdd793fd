//! core::materialize
//!
//! The List Materializer: turns a reconciled entry set back into the
//! persisted MassMessage list document, and describes the change.
//!
//! # Document shape
//!
//! ```json
//! {
//!     "description": "Delivery list for the admin newsletter",
//!     "targets": [
//!         {"title": "User talk:Alice"},
//!         {"title": "User talk:Bob"}
//!     ]
//! }
//! ```
//!
//! Key order is stable (`description` before `targets`), targets are
//! totally ordered by title, and the document is indented with four
//! spaces; a reconciled list therefore always serializes to the same
//! bytes, keeping page diffs readable. `description` is passed through
//! untouched, whatever JSON it holds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::entry::Entry;
use super::reconcile::ReconcileOutcome;
use super::types::PageTitle;

/// Errors from parsing a persisted list document.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("list document is not valid JSON: {0}")]
    Json(String),
}

/// One target record in the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub title: PageTitle,
}

/// The persisted MassMessage list document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDocument {
    /// Opaque description, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl ListDocument {
    /// Parse a persisted list page.
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::Json` for malformed JSON and
    /// `MaterializeError::Target` when a target title fails validation.
    pub fn parse(text: &str) -> Result<Self, MaterializeError> {
        // Title validation failures surface as serde data errors; the
        // serde message names the offending value.
        serde_json::from_str(text.trim()).map_err(|e| MaterializeError::Json(e.to_string()))
    }

    /// Classify the document's targets into list entries.
    pub fn entries(&self) -> Vec<Entry> {
        self.targets
            .iter()
            .map(|t| Entry::classify(t.title.clone()))
            .collect()
    }

    /// Build a document from a reconciled entry set, imposing the total
    /// order: lexicographic on the canonical title string.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a Entry>,
        description: Option<Value>,
    ) -> Self {
        let mut titles: Vec<PageTitle> = entries.into_iter().map(|e| e.page().clone()).collect();
        titles.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        titles.dedup();
        Self {
            description,
            targets: titles.into_iter().map(|title| Target { title }).collect(),
        }
    }

    /// Render the document with stable key order and four-space
    /// indentation, trailing newline included.
    pub fn render(&self) -> Result<String, MaterializeError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| MaterializeError::Json(e.to_string()))?;
        let mut text = String::from_utf8(buf).map_err(|e| MaterializeError::Json(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

/// Counts summarizing one list's reconciliation, formatted as the edit
/// summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: u32,
    pub removed: u32,
    pub renamed: u32,
}

impl From<&ReconcileOutcome> for ChangeSummary {
    fn from(outcome: &ReconcileOutcome) -> Self {
        Self {
            added: outcome.added,
            removed: outcome.removed,
            renamed: outcome.renamed,
        }
    }
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Update MassMessage list: {} added, {} removed",
            self.added, self.removed
        )?;
        if self.renamed > 0 {
            write!(f, ", {} renamed", self.renamed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entry(title: &str) -> Entry {
        Entry::classify(PageTitle::new(title).unwrap())
    }

    #[test]
    fn parse_reads_description_and_targets() {
        let text = r#"{
            "description": "Admin newsletter",
            "targets": [{"title": "User talk:Alice"}]
        }"#;
        let doc = ListDocument::parse(text).unwrap();
        assert_eq!(doc.description, Some(Value::String("Admin newsletter".into())));
        assert_eq!(doc.targets.len(), 1);
        assert_eq!(doc.targets[0].title.as_str(), "User talk:Alice");
    }

    #[test]
    fn parse_tolerates_missing_description() {
        let doc = ListDocument::parse(r#"{"targets": []}"#).unwrap();
        assert!(doc.description.is_none());
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(matches!(
            ListDocument::parse("{{nope"),
            Err(MaterializeError::Json(_))
        ));
    }

    #[test]
    fn parse_rejects_invalid_target_title() {
        let text = r#"{"targets": [{"title": "bad|title"}]}"#;
        assert!(ListDocument::parse(text).is_err());
    }

    #[test]
    fn entries_classify_targets() {
        let text = r#"{"targets": [
            {"title": "User talk:Alice"},
            {"title": "Wikipedia:Signpost"}
        ]}"#;
        let doc = ListDocument::parse(text).unwrap();
        let entries = doc.entries();
        assert!(entries[0].user().is_some());
        assert!(entries[1].user().is_none());
    }

    #[test]
    fn from_entries_orders_lexicographically() {
        let entries = vec![
            entry("User talk:Zoe"),
            entry("Wikipedia:Signpost"),
            entry("User talk:Alice"),
        ];
        let doc = ListDocument::from_entries(&entries, None);
        let titles: Vec<&str> = doc.targets.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["User talk:Alice", "User talk:Zoe", "Wikipedia:Signpost"]
        );
    }

    #[test]
    fn from_entries_order_is_input_order_independent() {
        let a = vec![entry("User talk:Alice"), entry("User talk:Bob")];
        let b = vec![entry("User talk:Bob"), entry("User talk:Alice")];
        assert_eq!(
            ListDocument::from_entries(&a, None),
            ListDocument::from_entries(&b, None)
        );
    }

    #[test]
    fn from_entries_deduplicates_by_final_page() {
        let set: BTreeSet<Entry> = [entry("User talk:Alice"), entry("User talk:Alice")]
            .into_iter()
            .collect();
        let doc = ListDocument::from_entries(&set, None);
        assert_eq!(doc.targets.len(), 1);
    }

    #[test]
    fn render_is_stable_and_four_space_indented() {
        let entries = vec![entry("User talk:Bob"), entry("User talk:Alice")];
        let doc = ListDocument::from_entries(&entries, Some(Value::String("Subscribers".into())));
        insta::assert_snapshot!(doc.render().unwrap(), @r###"
        {
            "description": "Subscribers",
            "targets": [
                {
                    "title": "User talk:Alice"
                },
                {
                    "title": "User talk:Bob"
                }
            ]
        }
        "###);
    }

    #[test]
    fn render_parse_roundtrip() {
        let entries = vec![entry("User talk:Alice"), entry("Wikipedia:Signpost")];
        let doc = ListDocument::from_entries(&entries, Some(Value::String("x".into())));
        let parsed = ListDocument::parse(&doc.render().unwrap()).unwrap();
        assert_eq!(doc, parsed);
    }

    #[test]
    fn description_passthrough_preserves_non_string_json() {
        let text = r#"{"description": {"i18n": {"en": "list"}}, "targets": []}"#;
        let doc = ListDocument::parse(text).unwrap();
        let rendered = doc.render().unwrap();
        let reparsed = ListDocument::parse(&rendered).unwrap();
        assert_eq!(doc.description, reparsed.description);
    }

    mod change_summary {
        use super::*;

        #[test]
        fn omits_renamed_when_zero() {
            let summary = ChangeSummary {
                added: 2,
                removed: 1,
                renamed: 0,
            };
            assert_eq!(
                summary.to_string(),
                "Update MassMessage list: 2 added, 1 removed"
            );
        }

        #[test]
        fn includes_renamed_when_nonzero() {
            let summary = ChangeSummary {
                added: 0,
                removed: 0,
                renamed: 3,
            };
            assert_eq!(
                summary.to_string(),
                "Update MassMessage list: 0 added, 0 removed, 3 renamed"
            );
        }
    }
}
