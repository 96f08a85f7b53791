//! REST records store.
//!
//! Speaks the PostgREST dialect served under `{base_url}/rest/v1`:
//! filtered, paginated listing with an exact total count, and partial
//! updates keyed by record id.

use async_trait::async_trait;
use crownwell_config::AppConfig;
use crownwell_core::error::RecordsError;
use crownwell_core::records::{Record, RecordKind, RecordPage, RecordQuery, RecordStore};
use tracing::{debug, warn};

/// A records store backed by a PostgREST endpoint.
pub struct RestRecordStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl RestRecordStore {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, RecordsError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RecordsError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RecordsError> {
        Self::new(config.base_url.clone(), config.effective_anon_key())
    }

    fn table_url(&self, kind: RecordKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn request(&self, method: reqwest::Method, kind: RecordKind) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(kind))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    /// `or=` filter matching `term` against every search field of `kind`.
    fn search_filter(kind: RecordKind, term: &str) -> String {
        let term = sanitize_search(term);
        let clauses: Vec<String> = kind
            .search_fields()
            .iter()
            .map(|field| format!("{field}.ilike.*{term}*"))
            .collect();
        format!("({})", clauses.join(","))
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<serde_json::Value>, RecordsError> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Records API returned error");
            return Err(RecordsError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| RecordsError::Decode(format!("Failed to parse rows: {e}")))
    }
}

/// Strip characters that would break a PostgREST `or=(...)` expression.
fn sanitize_search(term: &str) -> String {
    term.trim().chars().filter(|c| !matches!(c, ',' | '(' | ')')).collect()
}

/// Total row count from a `Content-Range: 0-24/3573` header.
fn parse_content_range(header: &str) -> Option<u64> {
    header.split_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl RecordStore for RestRecordStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list(&self, kind: RecordKind, query: &RecordQuery) -> Result<RecordPage, RecordsError> {
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".into()),
            ("order", "created_at.desc".into()),
            ("limit", query.page_size.to_string()),
            ("offset", query.offset().to_string()),
        ];
        if let Some(term) = query.search_term() {
            params.push(("or", Self::search_filter(kind, term)));
        }

        debug!(table = kind.table(), page = query.page, search = ?query.search_term(), "Listing records");

        let response = self
            .request(reqwest::Method::GET, kind)
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await
            .map_err(|e| RecordsError::Network(e.to_string()))?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let records = Self::rows(response)
            .await?
            .into_iter()
            .map(|row| Record::from_row(kind, row))
            .collect::<Result<Vec<_>, _>>()?;

        let total = total.unwrap_or(records.len() as u64);
        debug!(table = kind.table(), loaded = records.len(), total, "Loaded records");
        Ok(RecordPage { records, total })
    }

    async fn get(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, RecordsError> {
        let response = self
            .request(reqwest::Method::GET, kind)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| RecordsError::Network(e.to_string()))?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .map(|row| Record::from_row(kind, row))
            .transpose()
    }

    async fn patch(
        &self,
        kind: RecordKind,
        id: i64,
        changes: serde_json::Value,
    ) -> Result<Record, RecordsError> {
        if !changes.is_object() {
            return Err(RecordsError::InvalidPatch(
                "changes must be a JSON object".into(),
            ));
        }

        debug!(table = kind.table(), id, "Saving record changes");

        let response = self
            .request(reqwest::Method::PATCH, kind)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&changes)
            .send()
            .await
            .map_err(|e| RecordsError::Network(e.to_string()))?;

        let row = Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecordsError::NotFound {
                table: kind.table().to_string(),
                id,
            })?;
        Record::from_row(kind, row)
    }
}
