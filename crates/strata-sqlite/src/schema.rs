//! DDL for the table pairs and the transaction sequence.
//!
//! Registration ([`crate::store::Store::register`]) only declares table
//! shape; this module is the separate migration step that actually executes
//! the DDL. All statements are `IF NOT EXISTS`, so migrating an already
//! initialized database is a no-op.

use rusqlite::Connection;
use strata_core::error::{Result, StrataError};

use crate::tables::{quote_ident, TableSet};

/// Create the transaction sequence table.
///
/// One row per commit unit; `AUTOINCREMENT` so ids are never reused even
/// after a rollback discards the row that allocated them.
pub(crate) fn create_transactions_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            datetime TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| StrataError::Storage(e.to_string()))?;
    Ok(())
}

/// Create the main/changes table pair for one registered model.
pub(crate) fn create_model_tables(conn: &Connection, tables: &TableSet) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT NOT NULL PRIMARY KEY,
                data TEXT NOT NULL,
                created TEXT NOT NULL,
                updated TEXT,
                transaction_id INTEGER NOT NULL REFERENCES transactions (id)
            )",
            tables.main_sql(),
        ),
        [],
    )
    .map_err(|e| StrataError::Storage(e.to_string()))?;

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                change_id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id INTEGER NOT NULL REFERENCES transactions (id),
                id TEXT NOT NULL,
                datetime TEXT NOT NULL,
                action TEXT NOT NULL,
                change TEXT NOT NULL
            )",
            tables.changes_sql(),
        ),
        [],
    )
    .map_err(|e| StrataError::Storage(e.to_string()))?;

    // Record-history reads filter the change log by id.
    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (id)",
            quote_ident(&format!("{}/:idx:id", tables.changes_name())),
            tables.changes_sql(),
        ),
        [],
    )
    .map_err(|e| StrataError::Storage(e.to_string()))?;

    tracing::debug!(table = tables.key(), "declared model tables");
    Ok(())
}
