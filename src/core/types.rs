//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Username`] - Validated, MediaWiki-normalized user name
//! - [`PageTitle`] - Validated wiki page title
//! - [`Group`] - Named user group (role)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs. Both
//! [`Username`] and [`PageTitle`] normalize their input the way MediaWiki
//! does (underscores become spaces, whitespace collapses, the first
//! character is uppercased), so two spellings of the same identity always
//! compare equal.
//!
//! # Examples
//!
//! ```
//! use masslist::core::types::{Group, PageTitle, Username};
//!
//! // Valid constructions (normalized)
//! let user = Username::new("example_user").unwrap();
//! assert_eq!(user.as_str(), "Example user");
//!
//! let title = PageTitle::new("Wikipedia:Village_pump").unwrap();
//! assert_eq!(title.as_str(), "Wikipedia:Village pump");
//!
//! let group = Group::new("sysop").unwrap();
//! assert_eq!(group.as_str(), "sysop");
//!
//! // Invalid constructions fail at creation time
//! assert!(Username::new("bad|name").is_err());
//! assert!(PageTitle::new("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("invalid page title: {0}")]
    InvalidPageTitle(String),

    #[error("invalid group name: {0}")]
    InvalidGroup(String),
}

/// Characters MediaWiki forbids in page titles.
const TITLE_INVALID_CHARS: [char; 8] = ['#', '<', '>', '[', ']', '|', '{', '}'];

/// Normalize a title fragment the way MediaWiki does: underscores to
/// spaces, whitespace runs collapsed, surrounding whitespace trimmed.
fn normalize_spaces(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercase the first character of a fragment (MediaWiki first-letter
/// capitalization).
fn uppercase_first(fragment: &str) -> String {
    let mut chars = fragment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A validated, normalized user name.
///
/// Usernames are the identity key for all user-derived list state. They are
/// normalized at construction so that `example_user`, ` Example  user ` and
/// `Example user` all compare equal.
///
/// Usernames cannot:
/// - Be empty
/// - Contain `#`, `<`, `>`, `[`, `]`, `|`, `{`, `}`
/// - Contain `/` (reserved for subpages), `@` (reserved for origin
///   qualifiers), or `:` (reserved for namespaces)
/// - Contain ASCII control characters
///
/// # Example
///
/// ```
/// use masslist::core::types::Username;
///
/// let user = Username::new("jo_anne  smith").unwrap();
/// assert_eq!(user.as_str(), "Jo anne smith");
///
/// assert!(Username::new("").is_err());
/// assert!(Username::new("who@enwiki").is_err());
/// assert!(Username::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a new validated username.
    ///
    /// The input is normalized before validation.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidUsername` if the normalized name is empty
    /// or contains a forbidden character.
    pub fn new(name: impl AsRef<str>) -> Result<Self, TypeError> {
        let normalized = uppercase_first(&normalize_spaces(name.as_ref()));
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidUsername(
                "username cannot be empty".into(),
            ));
        }
        for c in TITLE_INVALID_CHARS.iter().chain(&['/', '@', ':']) {
            if name.contains(*c) {
                return Err(TypeError::InvalidUsername(format!(
                    "username cannot contain '{c}'"
                )));
            }
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidUsername(
                "username cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// The user page for this user (`User:<name>`).
    pub fn user_page(&self) -> PageTitle {
        // Safe because usernames are validated title fragments
        PageTitle(format!("User:{}", self.0))
    }

    /// The user talk page for this user (`User talk:<name>`).
    ///
    /// This is the page-ownership transform applied when a user is added to
    /// a list by a group change.
    pub fn talk_page(&self) -> PageTitle {
        PageTitle(format!("User talk:{}", self.0))
    }

    /// Get the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Username> for String {
    fn from(user: Username) -> Self {
        user.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated wiki page title.
///
/// Titles are normalized like usernames (underscores to spaces, whitespace
/// collapsed, first character uppercased). The namespace prefix, if any, is
/// whatever precedes the first `:`; this crate does not carry a full
/// namespace registry, it only needs to recognize `User` and `User talk`.
///
/// # Example
///
/// ```
/// use masslist::core::types::PageTitle;
///
/// let title = PageTitle::new("User talk:Example/Archive 1").unwrap();
/// assert_eq!(title.namespace(), Some("User talk"));
///
/// let mainspace = PageTitle::new("Village pump").unwrap();
/// assert_eq!(mainspace.namespace(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageTitle(String);

impl PageTitle {
    /// Create a new validated page title.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPageTitle` if the normalized title is
    /// empty or contains a forbidden character.
    pub fn new(title: impl AsRef<str>) -> Result<Self, TypeError> {
        let normalized = uppercase_first(&normalize_spaces(title.as_ref()));
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    fn validate(title: &str) -> Result<(), TypeError> {
        if title.is_empty() {
            return Err(TypeError::InvalidPageTitle("title cannot be empty".into()));
        }
        for c in TITLE_INVALID_CHARS {
            if title.contains(c) {
                return Err(TypeError::InvalidPageTitle(format!(
                    "title cannot contain '{c}'"
                )));
            }
        }
        if title.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidPageTitle(
                "title cannot contain control characters".into(),
            ));
        }
        if title.starts_with(':') || title.ends_with(':') {
            return Err(TypeError::InvalidPageTitle(
                "title cannot start or end with ':'".into(),
            ));
        }
        Ok(())
    }

    /// The namespace prefix, if the title has one.
    ///
    /// Returns the text before the first `:`, or `None` for mainspace
    /// titles.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }

    /// The text after the namespace prefix (or the whole title for
    /// mainspace pages).
    pub fn without_namespace(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0)
    }

    /// Rewrite the owner component of a user-owned title.
    ///
    /// Replaces the leading `old` username after the namespace with `new`,
    /// preserving the namespace and any subpage suffix:
    /// `User:Old/Notes` becomes `User:New/Notes`.
    ///
    /// Returns `None` when the title does not belong to `old` (no namespace,
    /// or a different base name).
    ///
    /// # Example
    ///
    /// ```
    /// use masslist::core::types::{PageTitle, Username};
    ///
    /// let old = Username::new("Alice").unwrap();
    /// let new = Username::new("Bob").unwrap();
    /// let title = PageTitle::new("User talk:Alice/Archive 1").unwrap();
    ///
    /// let renamed = title.with_owner(&old, &new).unwrap();
    /// assert_eq!(renamed.as_str(), "User talk:Bob/Archive 1");
    /// ```
    pub fn with_owner(&self, old: &Username, new: &Username) -> Option<PageTitle> {
        let (ns, rest) = self.0.split_once(':')?;
        let remainder = rest.strip_prefix(old.as_str())?;
        // The old name must be the complete base component, not a prefix
        // of a longer name.
        if !(remainder.is_empty() || remainder.starts_with('/')) {
            return None;
        }
        Some(PageTitle(format!("{}:{}{}", ns, new.as_str(), remainder)))
    }

    /// Get the title as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PageTitle {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PageTitle> for String {
    fn from(title: PageTitle) -> Self {
        title.0
    }
}

impl AsRef<str> for PageTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named user group (role), such as `sysop` or `bot`.
///
/// Group names are lowercase identifiers in MediaWiki; construction trims
/// whitespace and rejects empty names but deliberately does not enumerate
/// valid groups (wikis define their own).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Group(String);

impl Group {
    /// The `bot` group, consulted when deciding whether to add a user.
    pub fn bot() -> Self {
        Self("bot".to_string())
    }

    /// Create a new validated group name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidGroup` if the trimmed name is empty or
    /// contains whitespace or control characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = name.as_ref().trim().to_string();
        if trimmed.is_empty() {
            return Err(TypeError::InvalidGroup("group cannot be empty".into()));
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_control())
        {
            return Err(TypeError::InvalidGroup(
                "group cannot contain whitespace".into(),
            ));
        }
        Ok(Self(trimmed))
    }

    /// Get the group name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Group {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.0
    }
}

impl AsRef<str> for Group {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
