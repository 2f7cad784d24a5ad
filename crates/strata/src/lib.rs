//! Strata: dataset storage backend
//!
//! Persists records for externally-defined models into a relational store,
//! tracks every effective mutation in an append-only change log, and serves
//! point/list/audit queries with pagination, sorting and dynamic reference
//! joins.
//!
//! ```no_run
//! use strata::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> strata::Result<()> {
//! let country = Model::build(
//!     ModelDef::new("gov", "country")
//!         .property(Property::scalar("title", ScalarKind::String)),
//! )?;
//!
//! let mut store = Store::open(StoreConfig::new("datasets.db".into()))?;
//! store.register(&country)?;
//! store.migrate()?;
//!
//! let txn = store.transaction()?;
//! store.push(&txn, &country, strata::to_payload(&json!({
//!     "id": "lt",
//!     "title": "Lithuania",
//! }))?)?;
//! txn.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;
pub mod source;

pub use strata_core::{
    config::{StoreConfig, SynchronousMode},
    error::{Result, StrataError},
    model::{Model, ModelDef, Property, PropertyKind, ScalarKind},
    query::{ChangesQuery, ListResult, Query, SortKey},
    record::{to_payload, Action, ChangeRecord, Payload, PushOutcome, Record, TxnId},
    refs::{ref_id, ref_id_value, REF_ID_LEN},
    traits::{DatasetBackend, TxnHandle},
};
pub use strata_sqlite::{table_key, Store, TableSet, Transaction};

pub use source::{load, JsonLines, LoadStats, RecordSource};
