use log::{error, info};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    app::{ArcExternalStore, ServiceError, ServiceResult},
    store::{Filters, OrderBy, Row, TableOperation},
};

/// Wire shape of a generic database request, as posted to the
/// `external-db` function. `operation` is kept as a free string so that an
/// unknown value produces the documented "unsupported operation" error
/// instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct DbRequest {
    pub table: String,
    pub operation: String,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub data: Option<DbRequestData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRequestData {
    pub select: Option<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub records: Option<Value>,
    pub updates: Option<Value>,
}

impl DbRequest {
    /// Check the wire shape and produce a typed operation. Insert requires
    /// `data.records`, update requires `data.updates`; anything outside the
    /// closed operation set is rejected.
    pub fn into_operation(self) -> ServiceResult<TableOperation> {
        let filters = self.filters.unwrap_or_default();
        let data = self.data.unwrap_or_default();
        match self.operation.as_str() {
            "select" => Ok(TableOperation::Select {
                table: self.table,
                filters,
                projection: data.select,
                order: data.order_by,
                limit: data.limit,
            }),
            "insert" => {
                let records = data
                    .records
                    .ok_or_else(|| ServiceError::BadRequest("insert requires data.records".into()))?;
                Ok(TableOperation::Insert {
                    table: self.table,
                    records: records_to_rows(records)?,
                })
            }
            "update" => {
                let updates = data
                    .updates
                    .ok_or_else(|| ServiceError::BadRequest("update requires data.updates".into()))?;
                let Value::Object(patch) = updates else {
                    return ServiceError::bad_request("update requires an object in data.updates");
                };
                Ok(TableOperation::Update {
                    table: self.table,
                    filters,
                    patch,
                })
            }
            "delete" => Ok(TableOperation::Delete {
                table: self.table,
                filters,
            }),
            other => ServiceError::bad_request(format!("Unsupported operation: {}", other)),
        }
    }
}

fn records_to_rows(records: Value) -> ServiceResult<Vec<Row>> {
    match records {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                _ => Err(ServiceError::BadRequest(
                    "insert records must be objects".into(),
                )),
            })
            .collect(),
        _ => ServiceError::bad_request("insert records must be objects"),
    }
}

/// Stateless pass-through to the external table store. Emits one structured
/// log line per request and per outcome; forwards errors unchanged.
pub struct ExternalDb {
    store: ArcExternalStore,
}

impl ExternalDb {
    pub fn new(store: ArcExternalStore) -> Self {
        Self { store }
    }

    /// Entry point for the HTTP proxy: check the wire shape, then execute.
    pub async fn call(&self, request: DbRequest) -> ServiceResult<Vec<Row>> {
        let operation = request.into_operation()?;
        self.execute(operation).await
    }

    /// Entry point for the data-access services, which build typed
    /// operations directly.
    pub async fn execute(&self, operation: TableOperation) -> ServiceResult<Vec<Row>> {
        info!(
            "External DB request - table: {}, operation: {}",
            operation.table(),
            operation.name()
        );
        let name = operation.name();
        let table = operation.table().to_string();
        match self.store.execute(operation).await {
            Ok(rows) => {
                info!(
                    "External DB success - {} on {}: {} records",
                    name,
                    table,
                    rows.len()
                );
                Ok(rows)
            }
            Err(err) => {
                error!("External DB error - {} on {}: {}", name, table, err);
                Err(err.into())
            }
        }
    }
}
