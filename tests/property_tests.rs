//! Property-based tests for core domain types and reconciliation.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use masslist::core::entry::Entry;
use masslist::core::event::GroupChangeEvent;
use masslist::core::materialize::ListDocument;
use masslist::core::policy::ListPolicy;
use masslist::core::reconcile::reconcile;
use masslist::core::types::{Group, PageTitle, Username};

/// Strategy for generating valid username characters.
fn username_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just(' '),
        Just('.'),
        Just('-'),
    ]
}

/// Strategy for generating valid usernames: a letter followed by
/// allowed characters.
fn valid_username() -> impl Strategy<Value = Username> {
    (prop::char::range('A', 'Z'), prop::collection::vec(username_char(), 0..20)).prop_map(
        |(first, rest)| {
            let name: String = std::iter::once(first).chain(rest).collect();
            // A leading letter guarantees the normalized name is non-empty.
            Username::new(name).unwrap()
        },
    )
}

/// Strategy for a small pool of distinct usernames.
fn username_pool() -> impl Strategy<Value = Vec<Username>> {
    prop::collection::btree_set(valid_username(), 1..6)
        .prop_map(|set| set.into_iter().collect())
}

fn sysop_policy() -> ListPolicy {
    ListPolicy {
        groups: BTreeSet::from([Group::new("sysop").unwrap()]),
        add: true,
        remove: true,
        required: false,
    }
}

proptest! {
    /// Normalization is idempotent: re-validating a constructed username
    /// changes nothing.
    #[test]
    fn username_normalization_is_idempotent(user in valid_username()) {
        let again = Username::new(user.as_str()).unwrap();
        prop_assert_eq!(user, again);
    }

    /// Any valid username round-trips through serde.
    #[test]
    fn username_serde_roundtrip(user in valid_username()) {
        let json = serde_json::to_string(&user).unwrap();
        let parsed: Username = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(user, parsed);
    }

    /// Talk pages built from any username are valid titles and classify
    /// back to the same user.
    #[test]
    fn talk_page_classifies_to_owner(user in valid_username()) {
        let entry = Entry::classify(user.talk_page());
        prop_assert_eq!(entry.user(), Some(&user));
    }

    /// Reconciling with no events and no required policy returns the
    /// input unchanged.
    #[test]
    fn no_events_is_identity(users in username_pool()) {
        let entries: Vec<Entry> = users
            .iter()
            .map(|u| Entry::classify(u.talk_page()))
            .collect();
        let live = BTreeMap::new();
        let outcome = reconcile(&entries, &[], &[], &sysop_policy(), &live);

        let expected: BTreeSet<Entry> = entries.iter().cloned().collect();
        prop_assert_eq!(&outcome.entries, &expected);
        prop_assert!(!outcome.has_changes());
    }

    /// Applying the same event sequence to a reconciled list reaches the
    /// same final membership.
    #[test]
    fn reapplying_events_is_stable(
        users in username_pool(),
        flips in prop::collection::vec((0usize..6, prop::bool::ANY), 0..12),
    ) {
        let sysop = Group::new("sysop").unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let changes: Vec<GroupChangeEvent> = flips
            .iter()
            .enumerate()
            .map(|(i, (pick, gained))| {
                let user = users[pick % users.len()].clone();
                let delta = BTreeSet::from([sysop.clone()]);
                GroupChangeEvent {
                    user,
                    added: if *gained { delta.clone() } else { BTreeSet::new() },
                    removed: if *gained { BTreeSet::new() } else { delta },
                    timestamp: base + chrono::Duration::minutes(i as i64),
                }
            })
            .collect();

        let live = BTreeMap::new();
        let policy = sysop_policy();
        let once = reconcile(&[], &[], &changes, &policy, &live);

        let entries: Vec<Entry> = once.entries.iter().cloned().collect();
        let twice = reconcile(&entries, &[], &changes, &policy, &live);
        prop_assert_eq!(once.entries, twice.entries);
    }

    /// Rendering is independent of entry input order.
    #[test]
    fn render_is_input_order_independent(users in username_pool()) {
        let forward: Vec<Entry> = users
            .iter()
            .map(|u| Entry::classify(u.talk_page()))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let a = ListDocument::from_entries(&forward, None).render().unwrap();
        let b = ListDocument::from_entries(&backward, None).render().unwrap();
        prop_assert_eq!(a, b);
    }

    /// Any rendered document parses back to an equal document.
    #[test]
    fn render_parse_roundtrip(users in username_pool()) {
        let entries: Vec<Entry> = users
            .iter()
            .map(|u| Entry::classify(u.talk_page()))
            .collect();
        let doc = ListDocument::from_entries(&entries, None);
        let parsed = ListDocument::parse(&doc.render().unwrap()).unwrap();
        prop_assert_eq!(doc, parsed);
    }
}

proptest! {
    /// Page titles that validate always survive a serde roundtrip.
    #[test]
    fn page_title_serde_roundtrip(raw in "[A-Za-z][A-Za-z0-9 /.:-]{0,30}") {
        if let Ok(title) = PageTitle::new(&raw) {
            let json = serde_json::to_string(&title).unwrap();
            let parsed: PageTitle = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(title, parsed);
        }
    }
}
