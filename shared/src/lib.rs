//! Shared types for the Tally workspace
//!
//! Domain models for inventory reconciliation (SKUs, aliases, ledger entries,
//! sync configuration and run logs, correction audit entries, reports),
//! the unified error system and small utilities used by every crate.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
