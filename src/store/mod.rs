use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod rest;

/// A single row as returned by the hosted table store.
pub type Row = serde_json::Map<String, Value>;

/// Equality filters, AND-combined. Column order is kept stable for logging
/// and for deterministic query strings.
pub type Filters = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub ascending: Option<bool>,
}

impl OrderBy {
    pub fn is_ascending(&self) -> bool {
        self.ascending.unwrap_or(true)
    }
}

/// The closed set of operations the external store supports. Invalid
/// combinations (an insert with filters, an update without a patch) are
/// unrepresentable here; the wire shape is checked in `proxy` when it is
/// converted into this type.
#[derive(Debug, Clone)]
pub enum TableOperation {
    Select {
        table: String,
        filters: Filters,
        projection: Option<String>,
        order: Option<OrderBy>,
        limit: Option<u64>,
    },
    Insert {
        table: String,
        records: Vec<Row>,
    },
    Update {
        table: String,
        filters: Filters,
        patch: Row,
    },
    Delete {
        table: String,
        filters: Filters,
    },
}

impl TableOperation {
    pub fn table(&self) -> &str {
        match self {
            TableOperation::Select { table, .. }
            | TableOperation::Insert { table, .. }
            | TableOperation::Update { table, .. }
            | TableOperation::Delete { table, .. } => table,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableOperation::Select { .. } => "select",
            TableOperation::Insert { .. } => "insert",
            TableOperation::Update { .. } => "update",
            TableOperation::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Remote(String),
}

/// Table-oriented access to the hosted database. Insert returns the inserted
/// rows, update the updated rows, delete returns no rows. Every call is a
/// single best-effort remote operation; there are no retries.
#[async_trait::async_trait]
pub trait ExternalStore {
    async fn execute(&self, op: TableOperation) -> Result<Vec<Row>, StoreError>;
}
