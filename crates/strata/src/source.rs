//! Upstream record sources and the bulk loader.
//!
//! A source is any finite, single-pass iterator of decoded payloads; the
//! loader drains one into a model's tables, normalizing and pushing each
//! payload independently.

use std::io::BufRead;

use strata_core::{
    error::Result,
    model::Model,
    record::{Payload, PushOutcome},
    traits::DatasetBackend,
};
use strata_sqlite::{Store, Transaction};

/// Producer of record payloads, one at a time.
///
/// Finite and non-restartable; each payload is pushed independently.
pub trait RecordSource: Iterator<Item = Result<Payload>> {}

impl<T: Iterator<Item = Result<Payload>>> RecordSource for T {}

/// Push outcomes accumulated over one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl LoadStats {
    /// Number of payloads that produced a write.
    pub fn pushed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Drain a source into a model's tables.
///
/// Every payload is normalized against the model (defaults applied,
/// required values checked, undeclared keys rejected), its reference
/// values are linked to storage keys, and it is pushed. The first failing
/// payload aborts the load; atomicity is the surrounding transaction's.
pub fn load<S>(
    store: &Store,
    txn: &Transaction<'_>,
    model: &Model,
    source: S,
) -> Result<LoadStats>
where
    S: RecordSource,
{
    let mut stats = LoadStats::default();

    for payload in source {
        let payload = model.normalize_payload(payload?)?;
        let payload = model.link_refs(payload)?;
        match store.push(txn, model, payload)? {
            PushOutcome::Inserted(id) => {
                tracing::debug!(model = model.name(), id = %id, "inserted");
                stats.inserted += 1;
            }
            PushOutcome::Updated(id) => {
                tracing::debug!(model = model.name(), id = %id, "updated");
                stats.updated += 1;
            }
            PushOutcome::Unchanged => stats.unchanged += 1,
        }
    }

    tracing::info!(
        model = model.name(),
        inserted = stats.inserted,
        updated = stats.updated,
        unchanged = stats.unchanged,
        "load finished"
    );
    Ok(stats)
}

/// Record source decoding one json object per line.
///
/// Reads forward only; each consumed line is released before the next one
/// is decoded.
pub struct JsonLines<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = Result<Payload>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = self.line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str(line)
                            .map_err(|e| strata_core::StrataError::Serialization(e.to_string())),
                    );
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines_skips_blank_lines() {
        let input = "{\"id\": \"a\"}\n\n{\"id\": \"b\"}\n";
        let payloads: Vec<Payload> = JsonLines::new(input.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0]["id"], "a");
        assert_eq!(payloads[1]["id"], "b");
    }

    #[test]
    fn test_json_lines_surfaces_decode_errors() {
        let input = "{\"id\": \"a\"}\nnot json\n";
        let results: Vec<_> = JsonLines::new(input.as_bytes()).collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
