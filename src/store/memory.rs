use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::Mutex,
};

use serde_json::Value;

use crate::store::{ExternalStore, Filters, Row, StoreError, TableOperation};

/// In-process stand-in for the hosted table store. Honours the full operation
/// semantics (equality filters, single-key stable ordering, limits, column
/// projection) and supports per-table fault injection so callers can exercise
/// remote-failure paths.
#[derive(Default)]
pub struct MemoryExternalStore {
    tables: Mutex<BTreeMap<String, Vec<Row>>>,
    insert_failures: Mutex<BTreeMap<String, String>>,
}

impl MemoryExternalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Make every subsequent insert into `table` fail with `message`.
    pub fn fail_inserts(&self, table: &str, message: &str) {
        self.insert_failures
            .lock()
            .unwrap()
            .insert(table.to_string(), message.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn matches(row: &Row, filters: &Filters) -> bool {
        filters
            .iter()
            .all(|(column, expected)| match row.get(column) {
                Some(actual) => value_eq(actual, expected),
                None => expected.is_null(),
            })
    }

    fn project(row: &Row, projection: &str) -> Row {
        let projection = projection.trim();
        if projection.is_empty() || projection == "*" {
            return row.clone();
        }
        let mut projected = Row::new();
        for column in projection.split(',').map(str::trim) {
            if let Some(value) = row.get(column) {
                projected.insert(column.to_string(), value.clone());
            }
        }
        projected
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait::async_trait]
impl ExternalStore for MemoryExternalStore {
    async fn execute(&self, op: TableOperation) -> Result<Vec<Row>, StoreError> {
        match op {
            TableOperation::Select {
                table,
                filters,
                projection,
                order,
                limit,
            } => {
                let tables = self.tables.lock().unwrap();
                let mut rows: Vec<Row> = tables
                    .get(&table)
                    .map(|rows| {
                        rows.iter()
                            .filter(|row| Self::matches(row, &filters))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(order) = &order {
                    rows.sort_by(|a, b| {
                        let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                        if order.is_ascending() {
                            ordering
                        } else {
                            ordering.reverse()
                        }
                    });
                }
                if let Some(limit) = limit {
                    rows.truncate(limit as usize);
                }
                if let Some(projection) = &projection {
                    rows = rows.iter().map(|row| Self::project(row, projection)).collect();
                }
                Ok(rows)
            }
            TableOperation::Insert { table, records } => {
                if let Some(message) = self.insert_failures.lock().unwrap().get(&table) {
                    return Err(StoreError::Remote(message.clone()));
                }
                self.tables
                    .lock()
                    .unwrap()
                    .entry(table)
                    .or_default()
                    .extend(records.clone());
                Ok(records)
            }
            TableOperation::Update {
                table,
                filters,
                patch,
            } => {
                let mut tables = self.tables.lock().unwrap();
                let mut updated = Vec::new();
                if let Some(rows) = tables.get_mut(&table) {
                    for row in rows.iter_mut().filter(|row| Self::matches(row, &filters)) {
                        for (column, value) in &patch {
                            row.insert(column.clone(), value.clone());
                        }
                        updated.push(row.clone());
                    }
                }
                Ok(updated)
            }
            TableOperation::Delete { table, filters } => {
                let mut tables = self.tables.lock().unwrap();
                if let Some(rows) = tables.get_mut(&table) {
                    rows.retain(|row| !Self::matches(row, &filters));
                }
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::OrderBy;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_select_orders_and_projects() {
        let store = MemoryExternalStore::new();
        store.seed(
            "players",
            vec![
                row(json!({"name": "a", "elo": 300, "tier": "Bronze"})),
                row(json!({"name": "b", "elo": 900, "tier": "Silver"})),
                row(json!({"name": "c", "elo": 600, "tier": "Silver"})),
            ],
        );

        let rows = store
            .execute(TableOperation::Select {
                table: "players".into(),
                filters: Filters::new(),
                projection: Some("name, elo".into()),
                order: Some(OrderBy {
                    column: "elo".into(),
                    ascending: Some(false),
                }),
                limit: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("b")));
        assert_eq!(rows[1].get("name"), Some(&json!("c")));
        assert!(rows[0].get("tier").is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_by_filter() {
        let store = MemoryExternalStore::new();
        store.seed(
            "profiles",
            vec![
                row(json!({"id": "u1", "username": "one"})),
                row(json!({"id": "u2", "username": "two"})),
            ],
        );

        let mut patch = Row::new();
        patch.insert("username".into(), json!("renamed"));
        let mut filters = Filters::new();
        filters.insert("id".into(), json!("u1"));

        let updated = store
            .execute(TableOperation::Update {
                table: "profiles".into(),
                filters: filters.clone(),
                patch,
            })
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].get("username"), Some(&json!("renamed")));

        let deleted = store
            .execute(TableOperation::Delete {
                table: "profiles".into(),
                filters,
            })
            .await
            .unwrap();
        assert!(deleted.is_empty());
        assert_eq!(store.rows("profiles").len(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_injection() {
        let store = MemoryExternalStore::new();
        store.fail_inserts("players", "duplicate key value");

        let result = store
            .execute(TableOperation::Insert {
                table: "players".into(),
                records: vec![row(json!({"name": "x"}))],
            })
            .await;

        assert!(matches!(result, Err(StoreError::Remote(msg)) if msg == "duplicate key value"));
        assert!(store.rows("players").is_empty());
    }
}
