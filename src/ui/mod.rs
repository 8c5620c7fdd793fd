//! ui
//!
//! Output formatting utilities.
//!
//! # Design
//!
//! All console output goes through this module so quiet and debug modes
//! are respected uniformly. Status lines and the run report go to
//! stdout; warnings, debug traces and errors go to stderr.

pub mod output;

pub use output::Verbosity;
