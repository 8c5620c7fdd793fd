//! wiki::traits
//!
//! Wiki trait definition for interacting with MediaWiki sites.
//!
//! # Design
//!
//! The `Wiki` trait is async because wiki operations involve network I/O.
//! All methods return `Result` to handle API errors gracefully.
//!
//! The engine only ever talks to the wiki through this trait: fetching
//! log records, page text and live group membership, and saving pages.
//! Reconciliation itself stays pure; a wiki failure can therefore never
//! leave a list partially updated.
//!
//! # Example
//!
//! ```ignore
//! use masslist::wiki::{Wiki, WikiError};
//! use masslist::core::event::{LogKind, Window};
//!
//! async fn count_rights_events(wiki: &dyn Wiki, window: &Window) -> Result<usize, WikiError> {
//!     let events = wiki.fetch_log_events(LogKind::Rights, window).await?;
//!     Ok(events.len())
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::event::{LogKind, RawLogEvent, Window};
use crate::core::types::{Group, Username};

/// Errors from wiki operations.
///
/// These map to common failure modes of the MediaWiki Action API.
#[derive(Debug, Clone, Error)]
pub enum WikiError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Login failed (wrong credentials, expired session).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested page or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit or maxlag backoff requested by the API.
    #[error("rate limited")]
    RateLimited,

    /// The page changed between read and write.
    #[error("edit conflict on {0}")]
    EditConflict(String),

    /// The API returned an error code.
    #[error("API error: {code} - {message}")]
    ApiError {
        /// MediaWiki error code (e.g. `badtoken`)
        code: String,
        /// Human-readable message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Page text together with the revision timestamp it was read at.
///
/// The base timestamp is handed back on save so the API can detect
/// concurrent edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub base_timestamp: DateTime<Utc>,
}

/// The Wiki trait for interacting with a MediaWiki site.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; per-list reconciliations are
/// independent and may be driven concurrently.
///
/// # Error Handling
///
/// All methods return `Result<T, WikiError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: credentials problem, fatal for the run
/// - `EditConflict`: per-list, non-cascading; skip the list and continue
/// - `RateLimited`: back off (caller's responsibility)
/// - Anything else: report and decide per call site
#[async_trait]
pub trait Wiki: Send + Sync {
    /// A short name for this wiki, used in messages (e.g. "enwiki",
    /// "meta").
    fn name(&self) -> &str;

    /// Fetch raw log records of one kind within a window, oldest first.
    ///
    /// Records are returned as fetched; normalization and skipping of
    /// malformed records happen in [`core::normalize`].
    ///
    /// [`core::normalize`]: crate::core::normalize
    async fn fetch_log_events(
        &self,
        kind: LogKind,
        window: &Window,
    ) -> Result<Vec<RawLogEvent>, WikiError>;

    /// Fetch the current text of a page.
    ///
    /// Returns `None` for a missing page (that is not an error: the
    /// shutoff check relies on it).
    async fn fetch_page(&self, title: &str) -> Result<Option<PageText>, WikiError>;

    /// Fetch current group membership for a batch of users.
    ///
    /// Unknown users are simply absent from the result.
    async fn fetch_user_groups(
        &self,
        users: &[Username],
    ) -> Result<BTreeMap<Username, BTreeSet<Group>>, WikiError>;

    /// Save a page with an edit summary.
    ///
    /// `base_timestamp` is the revision timestamp the caller read; a page
    /// changed since then fails with `WikiError::EditConflict` instead of
    /// clobbering the concurrent edit.
    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        base_timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), WikiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_error_display() {
        assert_eq!(
            format!("{}", WikiError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", WikiError::AuthFailed("bad password".into())),
            "authentication failed: bad password"
        );
        assert_eq!(
            format!("{}", WikiError::NotFound("Missing page".into())),
            "not found: Missing page"
        );
        assert_eq!(format!("{}", WikiError::RateLimited), "rate limited");
        assert_eq!(
            format!("{}", WikiError::EditConflict("List A".into())),
            "edit conflict on List A"
        );
        assert_eq!(
            format!(
                "{}",
                WikiError::ApiError {
                    code: "badtoken".into(),
                    message: "Invalid CSRF token".into()
                }
            ),
            "API error: badtoken - Invalid CSRF token"
        );
        assert_eq!(
            format!("{}", WikiError::NetworkError("connection refused".into())),
            "network error: connection refused"
        );
        assert_eq!(
            format!("{}", WikiError::InvalidResponse("missing query".into())),
            "invalid response: missing query"
        );
    }
}
