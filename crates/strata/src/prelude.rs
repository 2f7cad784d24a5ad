//! Convenience re-exports for common usage.

pub use strata_core::{
    config::{StoreConfig, SynchronousMode},
    error::{Result, StrataError},
    model::{Model, ModelDef, Property, PropertyKind, ScalarKind},
    query::{ChangesQuery, ListResult, Query},
    record::{to_payload, Action, ChangeRecord, Payload, PushOutcome, Record},
    refs::ref_id,
    traits::{DatasetBackend, TxnHandle},
};
pub use strata_sqlite::{Store, Transaction};

pub use crate::source::{load, JsonLines, LoadStats, RecordSource};
