//! Audit reader over a model's append-only change log.

use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use strata_core::{
    error::{Result, StrataError},
    model::Model,
    observe,
    query::ChangesQuery,
    record::{Action, ChangeRecord},
};

use crate::store::Store;
use crate::txn::Transaction;

/// Read change records in ascending `change_id` order.
///
/// A positive offset is an absolute cursor (`change_id > offset`). A
/// negative offset keeps only the last `|offset|` entries of the same
/// filtered set, computed against `max(change_id)` of that set.
pub(crate) fn changes(
    store: &Store,
    txn: &Transaction<'_>,
    model: &Model,
    query: &ChangesQuery,
) -> Result<Vec<ChangeRecord>> {
    let started = Instant::now();
    let tables = store.tables_for(model)?;
    let table = tables.changes_sql();

    let mut filters: Vec<String> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    if let Some(id) = &query.id {
        filters.push("id = ?".to_string());
        binds.push(SqlValue::Text(id.clone()));
    }

    match query.offset {
        Some(offset) if offset > 0 => {
            filters.push("change_id > ?".to_string());
            binds.push(SqlValue::Integer(offset));
        }
        Some(offset) if offset < 0 => {
            // Last |offset| entries, correlated against the same record
            // filter as the outer query.
            let subquery_filter = if query.id.is_some() { " WHERE id = ?" } else { "" };
            filters.push(format!(
                "change_id > (SELECT MAX(change_id) - ? FROM {table}{subquery_filter})"
            ));
            binds.push(SqlValue::Integer(offset.abs()));
            if let Some(id) = &query.id {
                binds.push(SqlValue::Text(id.clone()));
            }
        }
        _ => {}
    }

    let mut sql = format!(
        "SELECT change_id, transaction_id, id, datetime, action, change FROM {table}"
    );
    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }
    sql.push_str(" ORDER BY change_id");
    if let Some(limit) = query.limit.filter(|&n| n > 0) {
        sql.push_str(" LIMIT ?");
        binds.push(SqlValue::Integer(limit as i64));
    }

    let mut stmt = txn
        .connection()
        .prepare(&sql)
        .map_err(|e| StrataError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(binds), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|e| StrataError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| StrataError::Storage(e.to_string()))?;

    let mut records = Vec::with_capacity(rows.len());
    for (change_id, transaction_id, id, datetime, action, change) in rows {
        records.push(ChangeRecord {
            change_id,
            transaction_id,
            id,
            datetime: parse_datetime(&datetime)?,
            action: Action::parse(&action)?,
            change: serde_json::from_str(&change)
                .map_err(|e| StrataError::Serialization(e.to_string()))?,
        });
    }

    observe::record_query("changes", started.elapsed());
    Ok(records)
}

fn parse_datetime(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StrataError::Serialization(format!("bad change datetime '{text}': {e}")))
}
