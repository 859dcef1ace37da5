//! pos - Personal OS Library
//!
//! Task prioritization and view filtering for a single user's work.
//!
//! # Core Concepts
//!
//! - **Priority score**: `(leverage * urgency) / effort`, derived on read
//! - **Views**: saved column layouts, filter clauses and sorts
//! - **Query pipeline**: scope, view clauses, UI pickers and search, then sort
//! - **Templates**: onboarding task lists applied to a client
//!
//! # Module Organization
//!
//! - `model`: Records and status enums
//! - `priority`: Score formula and the leverage/effort matrix
//! - `field`, `filter`, `search`, `sort`, `query`: The listing pipeline
//! - `view`, `render`: Saved views, column resolution and cell renderers
//! - `backend`, `store`: Storage contract, in-memory and JSON file backends
//! - `actions`, `template`: Mutations, bulk actions and onboarding
//! - `config`: Configuration loading from `.pos.toml`
//! - `lock`: File locking and atomic writes
//! - `cli`, `output`: Command-line interface and output envelopes

pub mod actions;
pub mod backend;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod field;
pub mod filter;
pub mod lock;
pub mod model;
pub mod output;
pub mod priority;
pub mod query;
pub mod render;
pub mod search;
pub mod sort;
pub mod store;
pub mod template;
pub mod view;

pub use error::{Error, Result};
