//! `crownwell records` — Browse and edit RCA 8D reports and work orders.

use crownwell_config::AppConfig;
use crownwell_core::error::RecordsError;
use crownwell_core::records::{RecordKind, RecordQuery, RecordStore};
use crownwell_records::RestRecordStore;

fn open_store() -> crownwell_core::Result<(AppConfig, RestRecordStore)> {
    let config = AppConfig::load()?;
    let store = RestRecordStore::from_config(&config)?;
    Ok((config, store))
}

/// Parse the `changes` argument of `records patch`.
fn parse_changes(text: &str) -> crownwell_core::Result<serde_json::Value> {
    let changes: serde_json::Value = serde_json::from_str(text)?;
    if !changes.is_object() {
        return Err(RecordsError::InvalidPatch("changes must be a JSON object".into()).into());
    }
    Ok(changes)
}

pub async fn list(
    kind: &str,
    search: Option<String>,
    page: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: RecordKind = kind.parse()?;
    let (config, store) = open_store()?;

    let query = RecordQuery {
        page: page.max(1),
        page_size: config.records.page_size,
        search,
    };
    let result = store.list(kind, &query).await?;

    println!(
        "{} — page {} ({} of {} total)\n",
        kind.label(),
        query.page,
        result.records.len(),
        result.total
    );
    for record in &result.records {
        println!("  {:>8}  {}", record.id, record.name);
    }

    let shown = query.offset() + result.records.len() as u64;
    if result.total > shown {
        println!("\n  More results: --page {}", query.page + 1);
    }
    Ok(())
}

pub async fn show(kind: &str, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let kind: RecordKind = kind.parse()?;
    let (_, store) = open_store()?;

    let record = store
        .get(kind, id)
        .await?
        .ok_or_else(|| format!("{} #{id} not found", kind.label()))?;

    println!("{} ({})\n", record.name, kind.label());
    println!("{}", serde_json::to_string_pretty(&record.content)?);
    Ok(())
}

pub async fn patch(kind: &str, id: i64, changes: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind: RecordKind = kind.parse()?;
    let changes = parse_changes(changes)?;
    let (_, store) = open_store()?;

    let record = store.patch(kind, id, changes).await?;
    println!("✅ Saved {}", record.name);
    println!("{}", serde_json::to_string_pretty(&record.content)?);
    Ok(())
}
