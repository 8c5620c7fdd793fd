//! core::entry
//!
//! List entries and their classification.
//!
//! A MassMessage list target is either a page owned by a user (in the
//! `User` or `User talk` namespace, subpages included) or an opaque page
//! reference that reconciliation carries through unchanged. Classification
//! happens exactly once, when the persisted list is read; the rest of the
//! pipeline dispatches on the variant.

use serde::{Deserialize, Serialize};

use super::types::{PageTitle, Username};

/// Namespaces whose pages are owned by a user.
const USER_NAMESPACES: [&str; 2] = ["User", "User talk"];

/// One element of a membership list.
///
/// # Example
///
/// ```
/// use masslist::core::entry::Entry;
/// use masslist::core::types::PageTitle;
///
/// let talk = Entry::classify(PageTitle::new("User talk:Example").unwrap());
/// assert!(matches!(talk, Entry::User { .. }));
///
/// let project = Entry::classify(PageTitle::new("Wikipedia:Signpost").unwrap());
/// assert!(matches!(project, Entry::Opaque(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entry {
    /// A page owned by a user. `page` is the exact persisted title (which
    /// may be a user page, a talk page, or a subpage of either); `user` is
    /// the owner derived from its base component.
    User { user: Username, page: PageTitle },
    /// A page outside the user namespaces, carried through unchanged.
    Opaque(PageTitle),
}

impl Entry {
    /// Classify a persisted page title into a user or opaque entry.
    ///
    /// The owner of a user-namespace page is the base component of the
    /// title (the text between `:` and the first `/`). Titles in the user
    /// namespaces whose base component is not a valid username fall back
    /// to opaque entries rather than failing the run.
    pub fn classify(page: PageTitle) -> Entry {
        let Some(ns) = page.namespace() else {
            return Entry::Opaque(page);
        };
        if !USER_NAMESPACES.contains(&ns) {
            return Entry::Opaque(page);
        }
        let base = page
            .without_namespace()
            .split('/')
            .next()
            .unwrap_or_default();
        match Username::new(base) {
            Ok(user) => Entry::User { user, page },
            Err(_) => Entry::Opaque(page),
        }
    }

    /// The persisted page title of this entry.
    pub fn page(&self) -> &PageTitle {
        match self {
            Entry::User { page, .. } => page,
            Entry::Opaque(page) => page,
        }
    }

    /// The owning user, for user entries.
    pub fn user(&self) -> Option<&Username> {
        match self {
            Entry::User { user, .. } => Some(user),
            Entry::Opaque(_) => None,
        }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(s: &str) -> PageTitle {
        PageTitle::new(s).unwrap()
    }

    #[test]
    fn user_page_classified_as_user() {
        let entry = Entry::classify(title("User:Example"));
        assert_eq!(entry.user(), Some(&Username::new("Example").unwrap()));
        assert_eq!(entry.page().as_str(), "User:Example");
    }

    #[test]
    fn talk_page_classified_as_user() {
        let entry = Entry::classify(title("User talk:Example"));
        assert_eq!(entry.user(), Some(&Username::new("Example").unwrap()));
    }

    #[test]
    fn subpage_owner_is_base_component() {
        let entry = Entry::classify(title("User:Example/Notes/2024"));
        assert_eq!(entry.user(), Some(&Username::new("Example").unwrap()));
        assert_eq!(entry.page().as_str(), "User:Example/Notes/2024");
    }

    #[test]
    fn other_namespaces_are_opaque() {
        for t in ["Wikipedia:Signpost", "Talk:Main Page", "Main Page"] {
            let entry = Entry::classify(title(t));
            assert!(entry.user().is_none(), "{t} should be opaque");
        }
    }

    #[test]
    fn user_namespace_with_bad_base_falls_back_to_opaque() {
        // "User:" followed only by a subpage separator has no base name.
        let entry = Entry::classify(title("User:/oddity"));
        assert!(entry.user().is_none());
    }

    #[test]
    fn display_shows_page() {
        let entry = Entry::classify(title("User talk:Example"));
        assert_eq!(entry.to_string(), "User talk:Example");
    }

    #[test]
    fn serde_roundtrip() {
        let entry = Entry::classify(title("User talk:Example"));
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, parsed);
    }
}
