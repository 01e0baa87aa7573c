use serde_json::Value;

use crate::store::{ExternalStore, Filters, Row, StoreError, TableOperation};

/// Client for a hosted PostgREST-dialect table store. Equality filters map to
/// `col=eq.value` query parameters, ordering to `order=col.asc|desc`, row
/// limits to `limit=n` and projections to `select=`.
pub struct RestExternalStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestExternalStore {
    pub fn new() -> Self {
        let base_url =
            std::env::var("ARENA_EXTERNAL_DB_URL").expect("ARENA_EXTERNAL_DB_URL env var not set");
        let service_key = std::env::var("ARENA_EXTERNAL_DB_SERVICE_KEY")
            .expect("ARENA_EXTERNAL_DB_SERVICE_KEY env var not set");
        Self::with_config(base_url, service_key)
    }

    pub fn with_config(base_url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn filter_param(value: &Value) -> String {
        match value {
            Value::String(s) => format!("eq.{}", s),
            Value::Null => "is.null".to_string(),
            other => format!("eq.{}", other),
        }
    }

    fn apply_filters(req: reqwest::RequestBuilder, filters: &Filters) -> reqwest::RequestBuilder {
        let params: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| (column.clone(), Self::filter_param(value)))
            .collect();
        req.query(&params)
    }

    async fn send_rows(&self, req: reqwest::RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Remote(Self::remote_message(response).await));
        }
        Ok(response.json().await?)
    }

    async fn send_no_rows(&self, req: reqwest::RequestBuilder) -> Result<(), StoreError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Remote(Self::remote_message(response).await));
        }
        Ok(())
    }

    async fn remote_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("msg"))
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        if message.is_empty() {
            format!("remote store returned {}", status)
        } else {
            message
        }
    }
}

#[async_trait::async_trait]
impl ExternalStore for RestExternalStore {
    async fn execute(&self, op: TableOperation) -> Result<Vec<Row>, StoreError> {
        match op {
            TableOperation::Select {
                table,
                filters,
                projection,
                order,
                limit,
            } => {
                let mut req = self.authed(self.client.get(self.table_url(&table)));
                req = req.query(&[("select", projection.as_deref().unwrap_or("*"))]);
                req = Self::apply_filters(req, &filters);
                if let Some(order) = &order {
                    let direction = if order.is_ascending() { "asc" } else { "desc" };
                    req = req.query(&[("order", format!("{}.{}", order.column, direction))]);
                }
                if let Some(limit) = limit {
                    req = req.query(&[("limit", limit.to_string())]);
                }
                self.send_rows(req).await
            }
            TableOperation::Insert { table, records } => {
                let req = self
                    .authed(self.client.post(self.table_url(&table)))
                    .header("Prefer", "return=representation")
                    .json(&records);
                self.send_rows(req).await
            }
            TableOperation::Update {
                table,
                filters,
                patch,
            } => {
                let mut req = self
                    .authed(self.client.patch(self.table_url(&table)))
                    .header("Prefer", "return=representation")
                    .json(&patch);
                req = Self::apply_filters(req, &filters);
                self.send_rows(req).await
            }
            TableOperation::Delete { table, filters } => {
                let mut req = self.authed(self.client.delete(self.table_url(&table)));
                req = Self::apply_filters(req, &filters);
                self.send_no_rows(req).await?;
                Ok(Vec::new())
            }
        }
    }
}
