//! Turning finished chat turns into things worth showing: conversation
//! titles and tables built from tool result data.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// How many tool tables a session keeps around.
pub const MAX_TABLES: usize = 5;

const TITLE_MAX_CHARS: usize = 48;

static RECORD_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9]D-\d{3,5}").expect("record number pattern is valid"));

/// First 8D-style record number (e.g. `8D-1042`) mentioned in `text`.
pub fn extract_record_number(text: &str) -> Option<&str> {
    RECORD_NUMBER.find(text).map(|m| m.as_str())
}

/// Conversation title for a first user message.
pub fn derive_title(text: &str) -> String {
    if let Some(number) = extract_record_number(text) {
        return number.to_string();
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "Recent Chat".to_string();
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        let short: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", short.trim_end())
    } else {
        trimmed.to_string()
    }
}

/// Tabular view of a tool result's `data` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolTable {
    pub tool_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ToolTable {
    /// Build a table from an array of objects; headers are the keys of the
    /// first row. Anything else yields `None`.
    pub fn from_data(tool_name: &str, data: &Value) -> Option<Self> {
        let items = data.as_array()?;
        let headers: Vec<String> = items.first()?.as_object()?.keys().cloned().collect();

        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| headers.iter().map(|h| cell(obj.get(h))).collect())
            .collect();

        Some(Self {
            tool_name: tool_name.to_string(),
            headers,
            rows,
        })
    }

    /// Render as aligned plain-text columns.
    pub fn render(&self) -> String {
        const MAX_WIDTH: usize = 40;

        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .min(MAX_WIDTH)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| {
                    let clipped: String = c.chars().take(*w).collect();
                    format!("{clipped:<w$}", w = *w)
                })
                .collect::<Vec<_>>()
                .join(" │ ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&self.headers));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        out.push_str(&rule.join("─┼─"));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The most recent tool tables of a session, newest last.
#[derive(Debug, Default)]
pub struct TableHistory {
    tables: VecDeque<ToolTable>,
}

impl TableHistory {
    pub fn push(&mut self, table: ToolTable) {
        self.tables.push_back(table);
        while self.tables.len() > MAX_TABLES {
            self.tables.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolTable> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
