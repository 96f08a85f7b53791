//! In-memory records store, useful for testing and offline demos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crownwell_core::error::RecordsError;
use crownwell_core::records::{Record, RecordKind, RecordPage, RecordQuery, RecordStore};
use serde_json::Value;
use tokio::sync::RwLock;

/// A records store holding raw rows per record kind.
///
/// Listing mirrors the REST store: newest `created_at` first, a
/// case-insensitive substring search over the kind's search fields, and
/// offset pagination with the filtered row count as the total.
pub struct InMemoryRecordStore {
    rows: Arc<RwLock<HashMap<RecordKind, Vec<Value>>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a row. Rows without a numeric `id` are rejected.
    pub async fn insert(&self, kind: RecordKind, row: Value) -> Result<(), RecordsError> {
        Record::from_row(kind, row.clone())?;
        self.rows.write().await.entry(kind).or_default().push(row);
        Ok(())
    }

    pub async fn len(&self, kind: RecordKind) -> usize {
        self.rows.read().await.get(&kind).map_or(0, Vec::len)
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn row_id(row: &Value) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn matches_search(kind: RecordKind, row: &Value, needle: &str) -> bool {
    kind.search_fields().iter().any(|field| match row.get(*field) {
        Some(Value::String(s)) => s.to_lowercase().contains(needle),
        Some(Value::Number(n)) => n.to_string().contains(needle),
        _ => false,
    })
}

fn created_at(row: &Value) -> &str {
    row.get("created_at").and_then(Value::as_str).unwrap_or("")
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list(&self, kind: RecordKind, query: &RecordQuery) -> Result<RecordPage, RecordsError> {
        let rows = self.rows.read().await;
        let needle = query.search_term().map(str::to_lowercase);

        let mut matched: Vec<&Value> = rows
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|row| needle.as_deref().is_none_or(|n| matches_search(kind, row, n)))
                    .collect()
            })
            .unwrap_or_default();

        // ISO-8601 timestamps order lexicographically.
        matched.sort_by(|a, b| created_at(b).cmp(created_at(a)));

        let total = matched.len() as u64;
        let records = matched
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .map(|row| Record::from_row(kind, row.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage { records, total })
    }

    async fn get(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, RecordsError> {
        let rows = self.rows.read().await;
        rows.get(&kind)
            .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)))
            .map(|row| Record::from_row(kind, row.clone()))
            .transpose()
    }

    async fn patch(&self, kind: RecordKind, id: i64, changes: Value) -> Result<Record, RecordsError> {
        let Value::Object(changes) = changes else {
            return Err(RecordsError::InvalidPatch(
                "changes must be a JSON object".into(),
            ));
        };

        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| RecordsError::NotFound {
                table: kind.table().to_string(),
                id,
            })?;

        if let Value::Object(fields) = row {
            for (key, value) in changes {
                // The primary key is immutable.
                if key != "id" {
                    fields.insert(key, value);
                }
            }
        }
        Record::from_row(kind, row.clone())
    }
}
