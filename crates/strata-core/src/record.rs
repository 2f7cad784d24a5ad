//! Payloads, records and change records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StrataError};

/// Numeric commit-unit identifier, allocated by the transaction sequence.
///
/// Stored on every main-table row, where it doubles as the
/// optimistic-concurrency token for conditional updates.
pub type TxnId = i64;

/// Incoming record payload: property name -> value, plus an `id` key.
pub type Payload = Map<String, Value>;

/// Outgoing record: property name -> value, plus `id` and `type`.
pub type Record = Map<String, Value>;

/// Convert any serializable value into a payload map.
///
/// `chrono` timestamps nested anywhere inside serialize to ISO-8601 text,
/// recursively through mappings and sequences.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload> {
    match serde_json::to_value(value).map_err(|e| StrataError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(StrataError::Serialization(format!(
            "expected a JSON object payload, got: {other}"
        ))),
    }
}

/// Change action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Update,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "insert" => Ok(Action::Insert),
            "update" => Ok(Action::Update),
            other => Err(StrataError::Integrity(format!(
                "unknown change action '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a push operation.
///
/// A no-op push is distinguished explicitly from both insert and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new row was created under the derived key.
    Inserted(String),
    /// The existing row was replaced; the diff was recorded.
    Updated(String),
    /// The payload matched the stored row; nothing was written.
    Unchanged,
}

impl PushOutcome {
    /// Derived storage key, if anything was written.
    pub fn key(&self) -> Option<&str> {
        match self {
            PushOutcome::Inserted(key) | PushOutcome::Updated(key) => Some(key),
            PushOutcome::Unchanged => None,
        }
    }
}

/// One row of a model's append-only change log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Monotonic sequence defining the canonical history order.
    pub change_id: i64,

    /// Transaction that produced this change.
    pub transaction_id: TxnId,

    /// Affected record's storage key.
    pub id: String,

    /// Wall-clock time of the change.
    pub datetime: DateTime<Utc>,

    /// `insert` or `update`.
    pub action: Action,

    /// Full payload on insert, shallow diff on update.
    pub change: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_to_payload_serializes_timestamps_as_iso8601() {
        #[derive(Serialize)]
        struct Report {
            id: String,
            issued: DateTime<Utc>,
            readings: Vec<DateTime<Utc>>,
        }

        let issued = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let payload = to_payload(&Report {
            id: "r1".to_string(),
            issued,
            readings: vec![issued],
        })
        .unwrap();

        assert_eq!(payload["issued"], json!("2020-01-02T03:04:05Z"));
        assert_eq!(payload["readings"][0], json!("2020-01-02T03:04:05Z"));
    }

    #[test]
    fn test_to_payload_rejects_non_objects() {
        let err = to_payload(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, StrataError::Serialization(_)));
    }

    #[test]
    fn test_action_round_trip() {
        assert_eq!(Action::parse("insert").unwrap(), Action::Insert);
        assert_eq!(Action::parse("update").unwrap(), Action::Update);
        assert_eq!(Action::Update.as_str(), "update");
        assert!(Action::parse("delete").is_err());
    }

    #[test]
    fn test_push_outcome_key() {
        assert_eq!(PushOutcome::Inserted("k".to_string()).key(), Some("k"));
        assert_eq!(PushOutcome::Unchanged.key(), None);
    }
}
