//! Query types for list and audit reads.

use crate::record::Record;

/// One sort key: a dotted property path and a direction.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub path: String,
    pub ascending: bool,
}

/// List query refinements; all independent and composable.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Dotted property paths to project; empty means "whole row".
    pub show: Vec<String>,

    /// Multi-key ordering, ties broken by subsequent keys in list order.
    pub sort: Vec<SortKey>,

    /// Rows to skip; zero or unset means no restriction.
    pub offset: Option<u64>,

    /// Row cap; zero or unset means no restriction.
    pub limit: Option<u64>,

    /// Short-circuit to a row count, skipping row iteration entirely.
    pub count: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(mut self, path: &str) -> Self {
        self.show.push(path.to_string());
        self
    }

    pub fn sort(mut self, path: &str, ascending: bool) -> Self {
        self.sort.push(SortKey {
            path: path.to_string(),
            ascending,
        });
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn count_only(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Result of a list query.
#[derive(Debug)]
pub enum ListResult {
    /// Count mode: number of rows, nothing iterated.
    Count(u64),
    /// Row mode: projected records, single-pass.
    Records(Vec<Record>),
}

impl ListResult {
    pub fn count(&self) -> Option<u64> {
        match self {
            ListResult::Count(n) => Some(*n),
            ListResult::Records(_) => None,
        }
    }

    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            ListResult::Records(records) => Some(records),
            ListResult::Count(_) => None,
        }
    }
}

/// Audit query over a model's change log.
#[derive(Debug, Clone, Default)]
pub struct ChangesQuery {
    /// Restrict to one record's history.
    pub id: Option<String>,

    /// Positive: absolute cursor, `change_id > offset`.
    /// Negative: "skip all but the last |offset| entries".
    pub offset: Option<i64>,

    /// Row cap; zero or unset means unlimited.
    pub limit: Option<u64>,
}

impl ChangesQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
