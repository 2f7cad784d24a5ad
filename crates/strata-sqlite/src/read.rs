//! Read engine: point lookups and list queries.

use std::time::Instant;

use serde_json::{Map, Value};
use strata_core::{
    error::{Result, StrataError},
    model::Model,
    observe,
    query::{ListResult, Query},
    record::Record,
};

use crate::joins::JoinBuilder;
use crate::store::Store;
use crate::tables::{quote_ident, TableSet};
use crate::txn::Transaction;

/// Point lookup by storage key.
///
/// Zero rows is "not found", a value. More than one row under a unique
/// primary key means the storage layer itself is broken and aborts the
/// operation.
pub(crate) fn get(
    store: &Store,
    txn: &Transaction<'_>,
    model: &Model,
    id: &str,
) -> Result<Option<Record>> {
    let started = Instant::now();
    let tables = store.tables_for(model)?;

    let mut stmt = txn
        .connection()
        .prepare(&format!(
            "SELECT id, data FROM {} WHERE id = ?1 LIMIT 2",
            tables.main_sql(),
        ))
        .map_err(|e| StrataError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| StrataError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| StrataError::Storage(e.to_string()))?;

    observe::record_query("get", started.elapsed());

    match rows.as_slice() {
        [] => Ok(None),
        [(key, data)] => Ok(Some(record_from_row(model, tables, key, data)?)),
        _ => Err(StrataError::Integrity(format!(
            "multiple rows were found, id={id} in {}",
            tables.key(),
        ))),
    }
}

/// List query with projection, sorting, offset/limit and count mode.
pub(crate) fn list(
    store: &Store,
    txn: &Transaction<'_>,
    model: &Model,
    query: &Query,
) -> Result<ListResult> {
    let started = Instant::now();
    let tables = store.tables_for(model)?;
    let conn = txn.connection();

    if query.count {
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", tables.main_sql()),
                [],
                |row| row.get(0),
            )
            .map_err(|e| StrataError::Storage(e.to_string()))?;
        observe::record_query("count", started.elapsed());
        return Ok(ListResult::Count(count as u64));
    }

    let mut joins = JoinBuilder::new(store, model);

    let select = if query.show.is_empty() {
        "t0.id, t0.data".to_string()
    } else {
        let mut columns = Vec::with_capacity(query.show.len());
        for path in &query.show {
            columns.push(format!("{} AS {}", joins.resolve(path)?, quote_ident(path)));
        }
        columns.join(", ")
    };

    let mut order = Vec::with_capacity(query.sort.len());
    for key in &query.sort {
        let column = if key.path == "id" {
            "t0.id".to_string()
        } else {
            joins.resolve(&key.path)?
        };
        let direction = if key.ascending { "ASC" } else { "DESC" };
        order.push(format!("{column} {direction}"));
    }

    let mut sql = format!("SELECT {select} FROM {}", joins.from_clause(&tables.main_sql()));
    if !order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }
    let limit = query.limit.filter(|&n| n > 0);
    let offset = query.offset.filter(|&n| n > 0);
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite wants a LIMIT clause before OFFSET; -1 means unbounded.
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StrataError::Storage(e.to_string()))?;

    let records = if query.show.is_empty() {
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| StrataError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StrataError::Storage(e.to_string()))?;
        rows.iter()
            .map(|(key, data)| record_from_row(model, tables, key, data))
            .collect::<Result<Vec<_>>>()?
    } else {
        stmt.query_map([], |row| {
            let mut record = Record::new();
            for (at, path) in query.show.iter().enumerate() {
                record.insert(path.clone(), column_value(row, at)?);
            }
            Ok(record)
        })
        .map_err(|e| StrataError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| StrataError::Storage(e.to_string()))?
    };

    observe::record_query("list", started.elapsed());
    Ok(ListResult::Records(records))
}

/// Reconstruct a record from a main-table row.
///
/// One key per declared property, read from the row document by name;
/// missing keys become null. `id` comes from the primary-key column and
/// `type` is the model's table-name key.
fn record_from_row(model: &Model, tables: &TableSet, key: &str, data: &str) -> Result<Record> {
    let document: Map<String, Value> =
        serde_json::from_str(data).map_err(|e| StrataError::Serialization(e.to_string()))?;

    let mut record = Record::new();
    for property in model.properties() {
        let value = document.get(&property.name).cloned().unwrap_or(Value::Null);
        record.insert(property.name.clone(), value);
    }
    record.insert("id".to_string(), Value::String(key.to_string()));
    record.insert("type".to_string(), Value::String(tables.key().to_string()));
    Ok(record)
}

/// Raw column value of a projected query, as returned by SQLite.
fn column_value(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Value> {
    use rusqlite::types::ValueRef;

    Ok(match row.get_ref(at)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        // Row documents are json text; blobs never appear in them.
        ValueRef::Blob(_) => Value::Null,
    })
}
