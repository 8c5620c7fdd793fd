//! Masslist - keeps MassMessage delivery lists in sync with user rights
//!
//! Masslist watches a wiki's user rights and rename logs and reconciles
//! MassMessage delivery lists against them: when a user gains a group a
//! list tracks, their talk page is added; when they lose it, they are
//! removed; when they are renamed, their entry follows the new name.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates Shutoff → Policies → Fetch → Normalize →
//!   Reconcile → Save
//! - [`core`] - Domain types and the pure reconciliation pipeline
//! - [`wiki`] - The wiki boundary (trait, Action API client, test mock)
//! - [`settings`] - Runtime settings loading
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. Reconciliation is deterministic: the same inputs always produce the
//!    same list document, byte for byte
//! 2. A run under a bad configuration touches nothing
//! 3. A failed list save never cascades to other lists
//! 4. Writes are suppressed when reconciliation changes nothing

pub mod cli;
pub mod core;
pub mod engine;
pub mod settings;
pub mod ui;
pub mod wiki;
