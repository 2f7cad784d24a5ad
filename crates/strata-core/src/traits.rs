//! Backend contract: one method per dataset operation.

use crate::error::Result;
use crate::model::Model;
use crate::query::{ChangesQuery, ListResult, Query};
use crate::record::{ChangeRecord, Payload, PushOutcome, Record, TxnId};

/// Handle to one caller-scoped commit unit.
///
/// Note: Not required to be Send, as some backends have thread-affine
/// transactions
pub trait TxnHandle {
    /// Numeric transaction id, stable for the handle's lifetime.
    fn id(&self) -> TxnId;
}

/// Dataset storage backend.
///
/// Callers hold a typed handle to an implementation; operations are explicit
/// methods, not a string-keyed command registry. All operations run inside a
/// caller-supplied transaction scope and inherit its atomicity.
pub trait DatasetBackend {
    type Txn<'a>: TxnHandle
    where
        Self: 'a;

    /// Register the physical table pair backing a model.
    ///
    /// Idempotent within a process lifetime: registering the same model
    /// twice keeps the first handle. Declares shape only; DDL runs in
    /// [`DatasetBackend::migrate`].
    fn register(&mut self, model: &Model) -> Result<()>;

    /// Execute pending DDL for every registered model.
    fn migrate(&self) -> Result<()>;

    /// Begin a transaction scope.
    fn transaction(&self) -> Result<Self::Txn<'_>>;

    /// Insert-or-update one record; appends a change record for every
    /// effective mutation.
    fn push(&self, txn: &Self::Txn<'_>, model: &Model, payload: Payload) -> Result<PushOutcome>;

    /// Point lookup by storage key. Missing is a value, not an error.
    fn get(&self, txn: &Self::Txn<'_>, model: &Model, id: &str) -> Result<Option<Record>>;

    /// List query with projection, sorting, offset/limit and count mode.
    fn list(&self, txn: &Self::Txn<'_>, model: &Model, query: &Query) -> Result<ListResult>;

    /// Read the change log in `change_id` order.
    fn changes(
        &self,
        txn: &Self::Txn<'_>,
        model: &Model,
        query: &ChangesQuery,
    ) -> Result<Vec<ChangeRecord>>;

    /// Delete all rows from both tables of a model. No audit record.
    fn wipe(&self, txn: &Self::Txn<'_>, model: &Model) -> Result<()>;
}
