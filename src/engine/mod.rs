//! engine
//!
//! Orchestrates one reconciliation run: Shutoff -> Policies -> Fetch ->
//! Normalize -> Reconcile -> Save.
//!
//! # Run lifecycle
//!
//! 1. **Shutoff**: if a shutoff page is configured and exists, abort
//!    before touching anything.
//! 2. **Policies**: fetch and validate the policy source page. Any
//!    defect is fatal; no list is touched under a bad configuration.
//! 3. **Fetch**: pull raw log records for the window from the local
//!    wiki (and the shared origin when configured), plus every enabled
//!    list page.
//! 4. **Normalize**: turn raw records into canonical event sequences,
//!    counting skipped records.
//! 5. **Reconcile**: run the pure algorithm per list against prefetched
//!    live group membership.
//! 6. **Save**: write each changed list back with its change summary,
//!    guarded by the base revision timestamp. A failed save skips that
//!    list only; the run continues.
//!
//! The engine performs no I/O except through the [`Wiki`] trait and
//! returns a [`RunReport`] for the CLI to present. Steps 1 and 2 fail
//! the whole run; everything after is per-list and non-cascading.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use serde_json::Value;

use crate::core::entry::Entry;
use crate::core::event::{GroupChangeEvent, LogKind, RawLogEvent, RenameEvent, Window};
use crate::core::materialize::{ChangeSummary, ListDocument, MaterializeError};
use crate::core::normalize::Normalizer;
use crate::core::policy::{load_policies, ConfigError, ListPolicy};
use crate::core::reconcile::reconcile;
use crate::core::types::{Group, PageTitle, Username};
use crate::wiki::{PageText, Wiki, WikiError};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The shutoff page exists; the operator has disabled the task.
    #[error("shutoff page '{0}' exists, aborting")]
    ShutOff(String),

    /// The policy source page does not exist.
    #[error("policy source page '{0}' does not exist")]
    MissingPolicySource(String),

    /// The policy source failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A run-level wiki operation failed.
    #[error(transparent)]
    Wiki(#[from] WikiError),
}

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Page holding the policy source JSON.
    pub policy_page: PageTitle,
    /// Half-open event window.
    pub window: Window,
    /// Whether to fetch and apply rename events.
    pub include_renames: bool,
    /// Reconcile and report, but save nothing.
    pub dry_run: bool,
}

/// What happened to one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    /// Saved with this summary.
    Updated(ChangeSummary),
    /// Reconciliation changed nothing; write suppressed.
    Unchanged,
    /// Dry run: would have saved with this summary.
    WouldUpdate(ChangeSummary),
    /// Skipped with a reason (missing page, parse failure, failed save).
    Skipped(String),
}

/// Per-list outcome of a run.
#[derive(Debug, Clone)]
pub struct ListReport {
    pub title: PageTitle,
    pub status: ListStatus,
}

/// The outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One report per enabled list, in policy order.
    pub lists: Vec<ListReport>,
    /// Canonical rename events applied.
    pub renames: usize,
    /// Canonical group-change events applied.
    pub group_changes: usize,
    /// Raw log records skipped as malformed, out of window, or foreign.
    pub skipped_records: usize,
}

impl RunReport {
    /// Count of lists with the given status kind.
    pub fn updated(&self) -> usize {
        self.lists
            .iter()
            .filter(|l| matches!(l.status, ListStatus::Updated(_) | ListStatus::WouldUpdate(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.lists
            .iter()
            .filter(|l| matches!(l.status, ListStatus::Skipped(_)))
            .count()
    }
}

/// A list that survived the fetch phase, ready to reconcile.
struct ListInput {
    title: PageTitle,
    policy: ListPolicy,
    page: PageText,
    description: Option<Value>,
    entries: Vec<Entry>,
}

/// Drives one reconciliation run against a local wiki and an optional
/// shared identity origin.
pub struct Runner<'a> {
    local: &'a dyn Wiki,
    shared: Option<&'a dyn Wiki>,
    db_name: String,
    shutoff_page: Option<String>,
}

impl<'a> Runner<'a> {
    pub fn new(
        local: &'a dyn Wiki,
        shared: Option<&'a dyn Wiki>,
        db_name: impl Into<String>,
        shutoff_page: Option<String>,
    ) -> Self {
        Self {
            local,
            shared,
            db_name: db_name.into(),
            shutoff_page,
        }
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns `RunError` for run-level failures (shutoff, policy source,
    /// log or group fetches). Per-list failures are reported in the
    /// [`RunReport`] instead.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport, RunError> {
        self.check_shutoff().await?;

        let policies = self.load_policy_source(&options.policy_page).await?;

        let (raw_renames, raw_local_rights, raw_shared_rights) =
            self.fetch_logs(&options.window, options.include_renames).await?;

        let normalizer = Normalizer::new(options.window, &self.db_name);
        let (renames, skipped_renames) = normalizer.renames(&raw_renames);
        let (changes, skipped_rights) =
            normalizer.group_changes(&raw_local_rights, &raw_shared_rights);

        let mut report = RunReport {
            renames: renames.len(),
            group_changes: changes.len(),
            skipped_records: skipped_renames + skipped_rights,
            ..RunReport::default()
        };

        // Fetch every list page up front; a list that cannot be read or
        // parsed is skipped without touching the others.
        let mut lists: Vec<ListInput> = Vec::new();
        for (title, policy) in policies {
            match self.fetch_list(&title).await {
                Ok((page, document)) => {
                    let entries = document.entries();
                    lists.push(ListInput {
                        title,
                        policy,
                        page,
                        description: document.description,
                        entries,
                    });
                }
                Err(reason) => report.lists.push(ListReport {
                    title,
                    status: ListStatus::Skipped(reason),
                }),
            }
        }

        let live = self.prefetch_groups(&lists, &renames, &changes).await?;

        for list in lists {
            let outcome = reconcile(&list.entries, &renames, &changes, &list.policy, &live);
            if !outcome.has_changes() {
                report.lists.push(ListReport {
                    title: list.title,
                    status: ListStatus::Unchanged,
                });
                continue;
            }

            let summary = ChangeSummary::from(&outcome);
            let document = ListDocument::from_entries(&outcome.entries, list.description);
            let status = if options.dry_run {
                ListStatus::WouldUpdate(summary)
            } else {
                match self
                    .save_list(&list.title, &document, &summary, &list.page)
                    .await
                {
                    Ok(()) => ListStatus::Updated(summary),
                    Err(reason) => ListStatus::Skipped(reason),
                }
            };
            report.lists.push(ListReport {
                title: list.title,
                status,
            });
        }

        Ok(report)
    }

    async fn check_shutoff(&self) -> Result<(), RunError> {
        if let Some(page) = &self.shutoff_page {
            // Any non-blank content counts; blanking the page re-enables
            // the task without needing a deletion.
            let tripped = self
                .local
                .fetch_page(page)
                .await?
                .is_some_and(|p| !p.text.trim().is_empty());
            if tripped {
                return Err(RunError::ShutOff(page.clone()));
            }
        }
        Ok(())
    }

    async fn load_policy_source(
        &self,
        policy_page: &PageTitle,
    ) -> Result<BTreeMap<PageTitle, ListPolicy>, RunError> {
        let page = self
            .local
            .fetch_page(policy_page.as_str())
            .await?
            .ok_or_else(|| RunError::MissingPolicySource(policy_page.to_string()))?;
        Ok(load_policies(&page.text)?)
    }

    /// Fetch raw records: renames (local, plus global from the shared
    /// origin), local rights, and shared rights.
    async fn fetch_logs(
        &self,
        window: &Window,
        include_renames: bool,
    ) -> Result<(Vec<RawLogEvent>, Vec<RawLogEvent>, Vec<RawLogEvent>), RunError> {
        let mut renames = Vec::new();
        if include_renames {
            renames = self.local.fetch_log_events(LogKind::Rename, window).await?;
            if let Some(shared) = self.shared {
                renames.extend(
                    shared
                        .fetch_log_events(LogKind::GlobalRename, window)
                        .await?,
                );
            }
        }

        let local_rights = self.local.fetch_log_events(LogKind::Rights, window).await?;
        let shared_rights = match self.shared {
            Some(shared) => shared.fetch_log_events(LogKind::Rights, window).await?,
            None => Vec::new(),
        };
        Ok((renames, local_rights, shared_rights))
    }

    async fn fetch_list(&self, title: &PageTitle) -> Result<(PageText, ListDocument), String> {
        let page = self
            .local
            .fetch_page(title.as_str())
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "list page does not exist".to_string())?;
        let document = ListDocument::parse(&page.text)
            .map_err(|e: MaterializeError| e.to_string())?;
        Ok((page, document))
    }

    /// Prefetch live group membership for every identity the
    /// reconciliations can consult: seeded list members plus every name
    /// appearing in an event.
    async fn prefetch_groups(
        &self,
        lists: &[ListInput],
        renames: &[RenameEvent],
        changes: &[GroupChangeEvent],
    ) -> Result<BTreeMap<Username, BTreeSet<Group>>, RunError> {
        let mut identities: BTreeSet<Username> = BTreeSet::new();
        for list in lists {
            identities.extend(list.entries.iter().filter_map(|e| e.user().cloned()));
        }
        for rename in renames {
            identities.insert(rename.old.clone());
            identities.insert(rename.new.clone());
        }
        for change in changes {
            identities.insert(change.user.clone());
        }
        let identities: Vec<Username> = identities.into_iter().collect();
        Ok(self.local.fetch_user_groups(&identities).await?)
    }

    async fn save_list(
        &self,
        title: &PageTitle,
        document: &ListDocument,
        summary: &ChangeSummary,
        page: &PageText,
    ) -> Result<(), String> {
        let text = document.render().map_err(|e| e.to_string())?;
        self.local
            .save_page(
                title.as_str(),
                &text,
                &summary.to_string(),
                Some(page.base_timestamp),
            )
            .await
            .map_err(|e| e.to_string())
    }
}
