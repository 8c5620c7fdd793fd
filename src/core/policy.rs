//! core::policy
//!
//! Per-list reconciliation policy and the policy source loader.
//!
//! # Policy source
//!
//! The policy source is a JSON object fetched from a wiki page, mapping
//! each list page title to its configuration:
//!
//! ```json
//! {
//!     "Wikipedia:Admin newsletter/Subscribers": {
//!         "enabled": true,
//!         "group": "sysop",
//!         "add": true,
//!         "remove": true
//!     }
//! }
//! ```
//!
//! `group` may be a single group name or an array of names. `add`,
//! `remove` and `required` are optional booleans defaulting to `false`.
//! Any malformed entry fails the whole load: a bad configuration aborts
//! the run before any list is touched.
//!
//! # Validation
//!
//! Validation happens once, at load time. The rest of the pipeline works
//! with the typed [`ListPolicy`] and never re-checks the source.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;

use super::types::{Group, PageTitle};

/// Errors from loading the policy source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("policy source is not valid JSON: {0}")]
    Json(String),

    #[error("policy source must be a JSON object mapping list titles to settings")]
    NotAnObject,

    #[error("list '{list}': {reason}")]
    InvalidList { list: String, reason: String },
}

/// Reconciliation policy for one list, immutable for the duration of a
/// run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPolicy {
    /// The membership-group filter. Never empty.
    pub groups: BTreeSet<Group>,
    /// Add users who gain a filtered group.
    pub add: bool,
    /// Remove users who lose a filtered group.
    pub remove: bool,
    /// Evict seeded users whose live membership no longer intersects the
    /// filter.
    pub required: bool,
}

impl ListPolicy {
    /// Whether a set of groups intersects this policy's filter.
    pub fn matches(&self, groups: &BTreeSet<Group>) -> bool {
        !self.groups.is_disjoint(groups)
    }
}

/// Keys every list entry must carry.
const REQUIRED_KEYS: [&str; 2] = ["enabled", "group"];

/// All keys a list entry may carry.
const KNOWN_KEYS: [&str; 5] = ["enabled", "group", "add", "remove", "required"];

/// Load and validate the policy source.
///
/// Returns the policies of enabled lists only; `enabled = false` lists are
/// excluded from the run entirely.
///
/// # Errors
///
/// Returns `ConfigError` when the source is not a JSON object, a list
/// title is malformed, a required key is missing, a value has the wrong
/// type, the group filter is empty, or an unrecognized key is present.
pub fn load_policies(raw: &str) -> Result<BTreeMap<PageTitle, ListPolicy>, ConfigError> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| ConfigError::Json(e.to_string()))?;
    let object = value.as_object().ok_or(ConfigError::NotAnObject)?;

    let mut policies = BTreeMap::new();
    for (list, settings) in object {
        let invalid = |reason: String| ConfigError::InvalidList {
            list: list.clone(),
            reason,
        };

        let title =
            PageTitle::new(list).map_err(|e| invalid(format!("invalid list title: {e}")))?;
        let settings = settings
            .as_object()
            .ok_or_else(|| invalid("settings must be an object".to_string()))?;

        for key in settings.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                return Err(invalid(format!("unrecognized key '{key}'")));
            }
        }
        for key in REQUIRED_KEYS {
            if !settings.contains_key(key) {
                return Err(invalid(format!("missing required key '{key}'")));
            }
        }

        let bool_key = |key: &str| -> Result<bool, ConfigError> {
            match settings.get(key) {
                None => Ok(false),
                Some(Value::Bool(b)) => Ok(*b),
                Some(_) => Err(invalid(format!("'{key}' must be a boolean"))),
            }
        };

        let enabled = bool_key("enabled")?;
        let add = bool_key("add")?;
        let remove = bool_key("remove")?;
        let required = bool_key("required")?;
        let groups = parse_group_filter(settings.get("group"), &invalid)?;

        if !enabled {
            continue;
        }
        policies.insert(
            title,
            ListPolicy {
                groups,
                add,
                remove,
                required,
            },
        );
    }
    Ok(policies)
}

/// Parse the `group` value: a single name or an array of names, never
/// empty.
fn parse_group_filter(
    value: Option<&Value>,
    invalid: &dyn Fn(String) -> ConfigError,
) -> Result<BTreeSet<Group>, ConfigError> {
    let parse_one = |v: &Value| -> Result<Group, ConfigError> {
        let name = v
            .as_str()
            .ok_or_else(|| invalid("'group' entries must be strings".to_string()))?;
        Group::new(name).map_err(|e| invalid(e.to_string()))
    };

    let groups: BTreeSet<Group> = match value {
        Some(v @ Value::String(_)) => BTreeSet::from([parse_one(v)?]),
        Some(Value::Array(items)) => items.iter().map(parse_one).collect::<Result<_, _>>()?,
        _ => {
            return Err(invalid(
                "'group' must be a group name or an array of group names".to_string(),
            ))
        }
    };
    if groups.is_empty() {
        return Err(invalid("'group' cannot be empty".to_string()));
    }
    Ok(groups)
}
