//! core
//!
//! Domain types and the pure reconciliation pipeline.
//!
//! # Modules
//!
//! - [`types`] - Validated `Username`, `PageTitle` and `Group` newtypes
//! - [`entry`] - List entries and namespace classification
//! - [`event`] - Canonical and raw change events, run windows
//! - [`normalize`] - Raw log records to canonical event sequences
//! - [`policy`] - Per-list policies and the policy source loader
//! - [`reconcile`] - The reconciliation algorithm
//! - [`materialize`] - Persisted list documents and change summaries
//!
//! Everything in this layer is pure: no I/O, no clocks, no global state.
//! The engine feeds it fetched data and writes back what it returns.

pub mod entry;
pub mod event;
pub mod materialize;
pub mod normalize;
pub mod policy;
pub mod reconcile;
pub mod types;
