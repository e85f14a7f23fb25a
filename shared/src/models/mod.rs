//! Data models
//!
//! Shared between the reconciliation engine, its Postgres store and the admin API.
//! Enums are stored as lowercase text columns (`as_db` / `from_db`).
//! All IDs are `i64`, all timestamps are Unix millis.

pub mod alias;
pub mod audit;
pub mod ledger;
pub mod reconcile;
pub mod sku;
pub mod sync;

// Re-exports
pub use alias::*;
pub use audit::*;
pub use ledger::*;
pub use reconcile::*;
pub use sku::*;
pub use sync::*;
