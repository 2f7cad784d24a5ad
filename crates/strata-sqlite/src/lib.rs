//! SQLite storage engine for strata datasets.
//!
//! Every registered model is backed by a table pair in one database file:
//! a main table holding the current-state snapshot (one row per record id,
//! with the record document as json) and an append-only changes table
//! ordered by `change_id`. Updates are guarded by an optimistic
//! transaction-id check; list queries resolve dotted reference paths into
//! reusable outer joins.

mod changes;
mod joins;
mod read;
mod schema;
mod store;
mod tables;
mod txn;
mod write;

pub use store::Store;
pub use tables::{table_key, TableSet};
pub use txn::Transaction;
