//! Write engine: insert-or-update with diff-based change capture.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use strata_core::{
    error::{Result, StrataError},
    model::Model,
    observe,
    record::{Action, Payload, PushOutcome, TxnId},
    refs::ref_id_value,
};

use crate::store::Store;
use crate::tables::TableSet;
use crate::txn::Transaction;

/// Insert-or-update one record.
///
/// The payload's `id` key is consumed to derive the storage key and is not
/// duplicated inside the stored document. A change record is appended for
/// every effective mutation; an identical payload writes nothing at all.
pub(crate) fn push(
    store: &Store,
    txn: &Transaction<'_>,
    model: &Model,
    mut payload: Payload,
) -> Result<PushOutcome> {
    let tables = store.tables_for(model)?;
    let conn = txn.connection();

    let id_value = payload
        .remove("id")
        .ok_or_else(|| StrataError::Config("payload has no 'id' value".to_string()))?;
    let key = ref_id_value(&id_value)?;
    let now = Utc::now().to_rfc3339();

    // Current snapshot, if any.
    let row: Option<(String, TxnId)> = conn
        .query_row(
            &format!(
                "SELECT data, transaction_id FROM {} WHERE id = ?1",
                tables.main_sql(),
            ),
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| StrataError::Storage(e.to_string()))?;

    let (action, change) = match row {
        // Insert.
        None => {
            let document = encode_document(&payload)?;
            let affected = conn
                .execute(
                    &format!(
                        "INSERT INTO {} (id, data, created, transaction_id)
                         VALUES (?1, ?2, ?3, ?4)",
                        tables.main_sql(),
                    ),
                    params![key, document, now, txn.id()],
                )
                .map_err(|e| StrataError::Storage(e.to_string()))?;

            // Sanity check: the primary key really is the derived key.
            if affected != 1 {
                return Err(StrataError::Integrity(format!(
                    "insert affected {affected} rows for id {key}"
                )));
            }
            (Action::Insert, payload)
        }

        // Update.
        Some((stored, seen_txn_id)) => {
            let old: Map<String, Value> = serde_json::from_str(&stored)
                .map_err(|e| StrataError::Serialization(e.to_string()))?;
            let diff = patch_changes(&old, &payload);

            if diff.is_empty() {
                // Nothing to update.
                return Ok(PushOutcome::Unchanged);
            }

            let document = encode_document(&payload)?;
            apply_update(
                conn,
                tables,
                model,
                &key,
                &document,
                seen_txn_id,
                txn.id(),
                &now,
            )?;
            (Action::Update, diff)
        }
    };

    // Track the change.
    conn.execute(
        &format!(
            "INSERT INTO {} (transaction_id, id, datetime, action, change)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            tables.changes_sql(),
        ),
        params![txn.id(), key, now, action.as_str(), encode_document(&change)?],
    )
    .map_err(|e| StrataError::Storage(e.to_string()))?;

    observe::record_push(action.as_str());
    tracing::debug!(
        table = tables.key(),
        id = %key,
        action = %action,
        "pushed record"
    );

    match action {
        Action::Insert => Ok(PushOutcome::Inserted(key)),
        Action::Update => Ok(PushOutcome::Updated(key)),
    }
}

/// Replace the row's document, but only while its transaction id still
/// equals the one observed at read time.
///
/// Zero affected rows means another transaction got between our read and
/// this write; that is surfaced as a conflict for the caller to retry,
/// never retried here. Writers sharing one transaction id cannot be told
/// apart by this check.
#[allow(clippy::too_many_arguments)]
fn apply_update(
    conn: &Connection,
    tables: &TableSet,
    model: &Model,
    key: &str,
    document: &str,
    seen_txn_id: TxnId,
    txn_id: TxnId,
    now: &str,
) -> Result<()> {
    let affected = conn
        .execute(
            &format!(
                "UPDATE {} SET data = ?1, updated = ?2, transaction_id = ?3
                 WHERE id = ?4 AND transaction_id = ?5",
                tables.main_sql(),
            ),
            params![document, now, txn_id, key, seen_txn_id],
        )
        .map_err(|e| StrataError::Storage(e.to_string()))?;

    match affected {
        1 => Ok(()),
        0 => Err(StrataError::Conflict {
            model: model.name().to_string(),
            id: key.to_string(),
        }),
        // Sanity check: did we really update just one row?
        n => Err(StrataError::Integrity(format!(
            "conditional update affected {n} rows for id {key}"
        ))),
    }
}

/// Shallow diff: keys of the new payload whose values differ from the
/// stored document. Keys only present in the old document are not
/// considered; property removals never show up here.
fn patch_changes(old: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    let mut changes = Map::new();
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changes.insert(key.clone(), value.clone());
        }
    }
    changes
}

fn encode_document(map: &Map<String, Value>) -> Result<String> {
    serde_json::to_string(map).map_err(|e| StrataError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{
        model::{ModelDef, Property, ScalarKind},
        traits::DatasetBackend,
    };

    fn report_model() -> Model {
        Model::build(
            ModelDef::new("lab", "report")
                .property(Property::scalar("a", ScalarKind::Integer))
                .property(Property::scalar("b", ScalarKind::Integer))
                .property(Property::scalar("c", ScalarKind::Integer)),
        )
        .unwrap()
    }

    fn store() -> (Store, Model) {
        let model = report_model();
        let mut store = Store::in_memory().unwrap();
        store.register(&model).unwrap();
        store.migrate().unwrap();
        (store, model)
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_patch_changes_is_shallow_and_minimal() {
        let old = payload(json!({"a": 1, "b": 2}));
        let new = payload(json!({"a": 1, "b": 3, "c": 4}));

        let diff = patch_changes(&old, &new);
        assert_eq!(Value::Object(diff), json!({"b": 3, "c": 4}));
    }

    #[test]
    fn test_patch_changes_ignores_removed_keys() {
        let old = payload(json!({"a": 1, "b": 2}));
        let new = payload(json!({"a": 1}));

        assert!(patch_changes(&old, &new).is_empty());
    }

    #[test]
    fn test_stale_transaction_token_is_a_conflict() {
        let (store, model) = store();

        let txn = store.transaction().unwrap();
        let outcome = push(&store, &txn, &model, payload(json!({"id": "r1", "a": 1}))).unwrap();
        let key = outcome.key().unwrap().to_string();
        let seen = txn.id();
        txn.commit().unwrap();

        let txn = store.transaction().unwrap();
        let tables = store.tables_for(&model).unwrap();
        let now = Utc::now().to_rfc3339();

        // A writer that observed the current token wins...
        apply_update(
            txn.connection(),
            tables,
            &model,
            &key,
            "{\"a\":2}",
            seen,
            txn.id(),
            &now,
        )
        .unwrap();

        // ...and one still holding the stale token must see a conflict,
        // not a silent overwrite.
        let err = apply_update(
            txn.connection(),
            tables,
            &model,
            &key,
            "{\"a\":3}",
            seen,
            txn.id(),
            &now,
        )
        .unwrap_err();
        assert!(matches!(err, StrataError::Conflict { .. }));
    }

    #[test]
    fn test_push_without_id_is_config_error() {
        let (store, model) = store();
        let txn = store.transaction().unwrap();

        let err = push(&store, &txn, &model, payload(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }
}
