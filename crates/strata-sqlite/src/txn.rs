//! Caller-scoped transaction guard.
//!
//! Opens a SQLite transaction and allocates the next id from the
//! transaction sequence in one step. Everything the engine writes inside
//! the guard is atomic with the guard's commit; dropping an uncommitted
//! guard rolls everything back.

use chrono::Utc;
use rusqlite::{params, Connection};
use strata_core::{
    error::{Result, StrataError},
    record::TxnId,
    traits::TxnHandle,
};

pub struct Transaction<'a> {
    conn: &'a Connection,
    id: TxnId,
    in_txn: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(conn: &'a Connection) -> Result<Self> {
        conn.execute("BEGIN IMMEDIATE TRANSACTION", [])
            .map_err(|e| StrataError::Transaction(e.to_string()))?;

        let allocated = conn
            .execute(
                "INSERT INTO transactions (datetime) VALUES (?1)",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(|e| StrataError::Transaction(e.to_string()));
        if let Err(e) = allocated {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }
        let id = conn.last_insert_rowid();

        Ok(Self {
            conn,
            id,
            in_txn: true,
        })
    }

    /// Numeric commit-unit id, stable for the guard's lifetime.
    pub fn id(&self) -> TxnId {
        self.id
    }

    pub(crate) fn connection(&self) -> &Connection {
        self.conn
    }

    /// Commit the transaction.
    pub fn commit(mut self) -> Result<()> {
        if self.in_txn {
            self.conn
                .execute("COMMIT", [])
                .map_err(|e| StrataError::Transaction(e.to_string()))?;
            self.in_txn = false;
        }
        Ok(())
    }

    /// Roll the transaction back explicitly.
    pub fn rollback(mut self) {
        if self.in_txn {
            let _ = self.conn.execute("ROLLBACK", []);
            self.in_txn = false;
        }
    }
}

impl TxnHandle for Transaction<'_> {
    fn id(&self) -> TxnId {
        self.id
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.in_txn {
            let _ = self.conn.execute("ROLLBACK", []);
        }
    }
}
