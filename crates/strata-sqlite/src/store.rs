//! SQLite-backed dataset store.

use std::collections::HashMap;

use rusqlite::{Connection, OpenFlags};
use strata_core::{
    config::{StoreConfig, SynchronousMode},
    error::{Result, StrataError},
    model::Model,
    query::{ChangesQuery, ListResult, Query},
    record::{ChangeRecord, Payload, PushOutcome, Record},
    traits::DatasetBackend,
};

use crate::tables::{table_key, TableSet};
use crate::txn::Transaction;
use crate::{changes, read, schema, write};

/// SQLite dataset store: one database holding the main/changes table pair
/// of every registered model, plus the transaction sequence.
///
/// The store is synchronous and owns a single connection; every operation
/// runs inside a caller-held [`Transaction`] guard.
pub struct Store {
    conn: Connection,
    config: StoreConfig,
    tables: HashMap<String, TableSet>,
    models: HashMap<(String, String), Model>,
}

impl Store {
    /// Open (or create) a store at the configured path.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|e| StrataError::Storage(e.to_string()))?;

        Self::configure_connection(&conn, &config)?;

        Ok(Self {
            conn,
            config,
            tables: HashMap::new(),
            models: HashMap::new(),
        })
    }

    /// Open an in-memory store, mostly useful in tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StrataError::Storage(e.to_string()))?;
        let config = StoreConfig::new(":memory:".into()).with_wal_mode(false);
        Self::configure_connection(&conn, &config)?;

        Ok(Self {
            conn,
            config,
            tables: HashMap::new(),
            models: HashMap::new(),
        })
    }

    /// Configure the SQLite connection.
    fn configure_connection(conn: &Connection, cfg: &StoreConfig) -> Result<()> {
        if cfg.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| StrataError::Config(e.to_string()))?;
        }

        let sync_mode = match cfg.synchronous {
            SynchronousMode::Full => "FULL",
            SynchronousMode::Normal => "NORMAL",
            SynchronousMode::Off => "OFF",
        };
        conn.pragma_update(None, "synchronous", sync_mode)
            .map_err(|e| StrataError::Config(e.to_string()))?;

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StrataError::Config(e.to_string()))?;

        conn.pragma_update(None, "cache_size", cfg.cache_size)
            .map_err(|e| StrataError::Config(e.to_string()))?;

        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A registered model, by namespace and name.
    pub fn model(&self, namespace: &str, name: &str) -> Option<&Model> {
        self.models
            .get(&(namespace.to_string(), name.to_string()))
    }

    /// Table pair for a registered model.
    pub(crate) fn tables_for(&self, model: &Model) -> Result<&TableSet> {
        self.tables.get(&table_key(model)).ok_or_else(|| {
            StrataError::Config(format!(
                "model '{}' of namespace '{}' is not registered",
                model.name(),
                model.namespace(),
            ))
        })
    }

    /// Resolve a reference target to its model and table pair.
    pub(crate) fn lookup(&self, namespace: &str, name: &str) -> Result<(&Model, &TableSet)> {
        let model = self.model(namespace, name).ok_or_else(|| {
            StrataError::Config(format!(
                "reference target '{name}' is not a registered model of namespace '{namespace}'"
            ))
        })?;
        let tables = self.tables_for(model)?;
        Ok((model, tables))
    }
}

impl DatasetBackend for Store {
    type Txn<'a> = Transaction<'a>
    where
        Self: 'a;

    fn register(&mut self, model: &Model) -> Result<()> {
        let key = table_key(model);
        if self.tables.contains_key(&key) {
            return Ok(());
        }
        self.tables.insert(key, TableSet::new(model));
        self.models.insert(
            (model.namespace().to_string(), model.name().to_string()),
            model.clone(),
        );
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        schema::create_transactions_table(&self.conn)?;
        for tables in self.tables.values() {
            schema::create_model_tables(&self.conn, tables)?;
        }
        Ok(())
    }

    fn transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(&self.conn)
    }

    fn push(&self, txn: &Transaction<'_>, model: &Model, payload: Payload) -> Result<PushOutcome> {
        write::push(self, txn, model, payload)
    }

    fn get(&self, txn: &Transaction<'_>, model: &Model, id: &str) -> Result<Option<Record>> {
        read::get(self, txn, model, id)
    }

    fn list(&self, txn: &Transaction<'_>, model: &Model, query: &Query) -> Result<ListResult> {
        read::list(self, txn, model, query)
    }

    fn changes(
        &self,
        txn: &Transaction<'_>,
        model: &Model,
        query: &ChangesQuery,
    ) -> Result<Vec<ChangeRecord>> {
        changes::changes(self, txn, model, query)
    }

    fn wipe(&self, txn: &Transaction<'_>, model: &Model) -> Result<()> {
        let tables = self.tables_for(model)?;
        txn.connection()
            .execute(&format!("DELETE FROM {}", tables.changes_sql()), [])
            .map_err(|e| StrataError::Storage(e.to_string()))?;
        txn.connection()
            .execute(&format!("DELETE FROM {}", tables.main_sql()), [])
            .map_err(|e| StrataError::Storage(e.to_string()))?;
        tracing::debug!(table = tables.key(), "wiped model tables");
        Ok(())
    }
}
