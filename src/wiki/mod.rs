//! wiki
//!
//! The wiki boundary: the `Wiki` trait, its MediaWiki Action API
//! implementation, and a deterministic mock for tests.
//!
//! # Architecture
//!
//! The engine depends only on the [`Wiki`] trait. [`client::ApiClient`]
//! is the production implementation; [`mock::MockWiki`] backs unit and
//! integration tests with scripted state and failures.

pub mod client;
pub mod mock;
pub mod traits;

pub use client::ApiClient;
pub use traits::{PageText, Wiki, WikiError};
