//! Records store trait — browsing and editing quality records.
//!
//! Two record families live in the store: RCA 8D reports and work orders.
//! Row contents are kept as opaque JSON; the store only needs to know each
//! family's table, display field, and searchable columns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecordsError;

/// The two record families the front end browses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    RcaReports,
    WorkOrders,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [Self::RcaReports, Self::WorkOrders];

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::RcaReports => "rca_8d_reports",
            Self::WorkOrders => "work_orders",
        }
    }

    /// Human-readable folder name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RcaReports => "RCA 8D Reports",
            Self::WorkOrders => "Work Orders",
        }
    }

    /// Column used as the record's display name.
    pub fn display_field(&self) -> &'static str {
        match self {
            Self::RcaReports => "rca_id",
            Self::WorkOrders => "wo_number",
        }
    }

    /// Columns matched by a free-text search.
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Self::RcaReports => &["rca_id", "part_number", "problem_description"],
            Self::WorkOrders => &["wo_number", "part_number", "customer_name"],
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rca" | "rca-reports" | "rca_8d_reports" => Ok(Self::RcaReports),
            "wo" | "work-orders" | "work_orders" => Ok(Self::WorkOrders),
            other => Err(format!("unknown record kind '{other}' (expected rca or wo)")),
        }
    }
}

/// One row from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub kind: RecordKind,
    /// Value of the kind's display field, or `"#<id>"` when absent.
    pub name: String,
    pub content: serde_json::Value,
}

impl Record {
    /// Wrap a raw row. Rows without a numeric `id` are rejected.
    pub fn from_row(kind: RecordKind, content: serde_json::Value) -> Result<Self, RecordsError> {
        let id = content
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| RecordsError::Decode(format!("row in {} has no numeric id", kind.table())))?;
        let name = content
            .get(kind.display_field())
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("#{id}"));
        Ok(Self {
            id,
            kind,
            name,
            content,
        })
    }
}

/// A paged, optionally filtered listing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Free-text search over the kind's search fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    1000
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            search: None,
        }
    }
}

impl RecordQuery {
    /// Row offset of the first record on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    /// The search term, if it has any non-whitespace content.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: u64,
}

/// The core RecordStore trait.
///
/// Implementations: REST (PostgREST-style), in-memory (for testing).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The store name (e.g., "rest", "in_memory").
    fn name(&self) -> &str;

    /// List one page of records, newest first.
    async fn list(&self, kind: RecordKind, query: &RecordQuery) -> Result<RecordPage, RecordsError>;

    /// Fetch a single record by id.
    async fn get(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, RecordsError>;

    /// Apply a partial update and return the updated record.
    async fn patch(
        &self,
        kind: RecordKind,
        id: i64,
        changes: serde_json::Value,
    ) -> Result<Record, RecordsError>;
}
