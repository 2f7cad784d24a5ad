//! Strata Core: Contracts and types for the strata dataset storage engine
//!
//! This crate defines the backend-agnostic abstractions for a dataset
//! storage backend with:
//! - Main tables: current-state snapshot, one row per record id
//! - Changes tables: append-only audit log ordered by change id
//! - Optimistic concurrency: transaction-id tokens checked on update
//! - Dynamic reference joins resolved from dotted property paths
//!
//! Key pieces:
//! - Model descriptors: a closed set of property kinds, built once from a
//!   base-to-derived ancestry of raw definitions
//! - `DatasetBackend`: explicit interface, one method per operation
//! - Reference-id derivation: deterministic fixed-width storage keys

pub mod config;
pub mod error;
pub mod model;
pub mod observe;
pub mod query;
pub mod record;
pub mod refs;
pub mod traits;

pub use config::{StoreConfig, SynchronousMode};
pub use error::{Result, StrataError};
pub use model::{Model, ModelDef, Property, PropertyKind, ScalarKind};
pub use query::{ChangesQuery, ListResult, Query, SortKey};
pub use record::{to_payload, Action, ChangeRecord, Payload, PushOutcome, Record, TxnId};
pub use refs::{ref_id, ref_id_value, REF_ID_LEN};
pub use traits::{DatasetBackend, TxnHandle};
