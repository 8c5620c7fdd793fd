//! core::reconcile
//!
//! The List Reconciler: applies ordered change events and a list policy to
//! a list's current entries, producing the new entry set and a structured
//! diff.
//!
//! # Algorithm
//!
//! 1. Seed a working map `user -> page` and a set of opaque pages from the
//!    current entries.
//! 2. If the policy marks the group required, evict every seeded user
//!    whose *live* membership no longer intersects the filter. This is a
//!    standing re-validation, not an event reaction.
//! 3. Merge renames and group changes into one sequence ordered by
//!    timestamp; on ties, renames apply before group changes.
//! 4. Apply each event in order. Renames re-key the working map and
//!    redirect every later event still referencing the old identity.
//!    Group changes add users gaining a filtered group (unless live
//!    bot-flagged or already present) and remove users losing one; the two
//!    sub-steps are evaluated independently.
//! 5. The final set is the remaining user pages plus the opaque pages.
//!
//! # Determinism
//!
//! The working state is `BTreeMap`/`BTreeSet`, so for a fixed input tuple
//! the outcome is identical across runs. Reconciliation has no error
//! paths: event sequences arrive pre-validated from the normalizer.

use std::collections::{BTreeMap, BTreeSet};

use super::entry::Entry;
use super::event::{GroupChangeEvent, RenameEvent};
use super::policy::ListPolicy;
use super::types::{Group, Username};

/// Read-only live group membership lookup.
///
/// The reconciler consults live membership (never event history) for the
/// required-group re-validation and the bot check on additions. The
/// engine prefetches a cache covering every identity a reconciliation can
/// touch, which keeps this seam synchronous and safe for concurrent reads.
pub trait LiveGroups {
    /// Current groups of a user; empty for unknown users.
    fn groups_of(&self, user: &Username) -> BTreeSet<Group>;
}

impl LiveGroups for BTreeMap<Username, BTreeSet<Group>> {
    fn groups_of(&self, user: &Username) -> BTreeSet<Group> {
        self.get(user).cloned().unwrap_or_default()
    }
}

/// The result of reconciling one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The new entry set. Serialization order is the materializer's
    /// concern, not this set's iteration order.
    pub entries: BTreeSet<Entry>,
    pub added: u32,
    pub removed: u32,
    pub renamed: u32,
}

impl ReconcileOutcome {
    /// Whether anything changed. When false the write is suppressed.
    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.renamed > 0
    }
}

/// One event in the merged stream.
#[derive(Debug, Clone)]
enum MergedEvent<'a> {
    Rename(&'a RenameEvent),
    Group(&'a GroupChangeEvent),
}

impl MergedEvent<'_> {
    fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            MergedEvent::Rename(e) => e.timestamp,
            MergedEvent::Group(e) => e.timestamp,
        }
    }

    /// Tie-break rank: renames apply before group changes at the same
    /// timestamp.
    fn rank(&self) -> u8 {
        match self {
            MergedEvent::Rename(_) => 0,
            MergedEvent::Group(_) => 1,
        }
    }
}

/// Merge the two canonical sequences into one ordered stream.
fn merge<'a>(
    renames: &'a [RenameEvent],
    changes: &'a [GroupChangeEvent],
) -> Vec<MergedEvent<'a>> {
    let mut merged: Vec<MergedEvent<'a>> = renames
        .iter()
        .map(MergedEvent::Rename)
        .chain(changes.iter().map(MergedEvent::Group))
        .collect();
    // Stable: events sharing timestamp and kind keep their input order.
    merged.sort_by_key(|e| (e.timestamp(), e.rank()));
    merged
}

/// Follow rename aliases to the identity currently keyed in the working
/// map. Chains (A renamed to B, B renamed to C) resolve to the last link;
/// the iteration cap guards against a pathological rename cycle.
fn resolve(aliases: &BTreeMap<Username, Username>, user: &Username) -> Username {
    let mut current = user.clone();
    for _ in 0..aliases.len() {
        match aliases.get(&current) {
            Some(next) => current = next.clone(),
            None => break,
        }
    }
    current
}

/// Reconcile a list's current entries against the canonical event
/// sequences under its policy.
///
/// Idempotent: with empty event sequences (and, unless `required` trims
/// stale members, unchanged live membership) the returned entries equal
/// the input and all counters are zero.
pub fn reconcile(
    current: &[Entry],
    renames: &[RenameEvent],
    changes: &[GroupChangeEvent],
    policy: &ListPolicy,
    live: &dyn LiveGroups,
) -> ReconcileOutcome {
    let mut added = 0u32;
    let mut removed = 0u32;
    let mut renamed = 0u32;

    // Step 1: seed the working state.
    let mut users: BTreeMap<Username, super::types::PageTitle> = BTreeMap::new();
    let mut opaque: BTreeSet<super::types::PageTitle> = BTreeSet::new();
    for entry in current {
        match entry {
            Entry::User { user, page } => {
                users.insert(user.clone(), page.clone());
            }
            Entry::Opaque(page) => {
                opaque.insert(page.clone());
            }
        }
    }

    // Step 2: standing required-group re-validation of seeded users.
    // Users added later in this run are deliberately not re-checked.
    if policy.required {
        let before = users.len();
        users.retain(|user, _| policy.matches(&live.groups_of(user)));
        removed += (before - users.len()) as u32;
    }

    // Steps 3 and 4: apply the merged event stream.
    let mut aliases: BTreeMap<Username, Username> = BTreeMap::new();
    let bot = Group::bot();

    for event in merge(renames, changes) {
        match event {
            MergedEvent::Rename(rename) => {
                let old = resolve(&aliases, &rename.old);
                aliases.insert(old.clone(), rename.new.clone());
                if let Some(page) = users.remove(&old) {
                    let new_page = page
                        .with_owner(&old, &rename.new)
                        .unwrap_or_else(|| rename.new.talk_page());
                    users.insert(rename.new.clone(), new_page);
                    renamed += 1;
                }
            }
            MergedEvent::Group(change) => {
                let user = resolve(&aliases, &change.user);
                if policy.add
                    && policy.matches(&change.added)
                    && !live.groups_of(&user).contains(&bot)
                    && !users.contains_key(&user)
                {
                    users.insert(user.clone(), user.talk_page());
                    added += 1;
                }
                if policy.remove && policy.matches(&change.removed) && users.remove(&user).is_some()
                {
                    removed += 1;
                }
            }
        }
    }

    // Step 5: union with the carried-through opaque entries.
    let entries = users
        .into_iter()
        .map(|(user, page)| Entry::User { user, page })
        .chain(opaque.into_iter().map(Entry::Opaque))
        .collect();

    ReconcileOutcome {
        entries,
        added,
        removed,
        renamed,
    }
}
