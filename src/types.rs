use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ui::Console;

/// Errors shown in the on-screen summary after a phase; the full log is kept.
const RECENT_ERRORS: usize = 5;

/// Top-level shape of an `ia metadata <item>` document. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub metadata: DescriptiveBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "size_in_bytes")]
    pub size: u64,
}

/// Bibliographic fields. The archive serves each as a string, a number, or a
/// list of strings depending on the item; absent fields become empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptiveBlock {
    #[serde(default, deserialize_with = "text_field")]
    pub title: String,
    #[serde(default, deserialize_with = "text_field")]
    pub creator: String,
    #[serde(default, deserialize_with = "text_field")]
    pub publisher: String,
    #[serde(default, deserialize_with = "text_field")]
    pub date: String,
    #[serde(default, deserialize_with = "text_field")]
    pub subject: String,
    #[serde(default, deserialize_with = "text_field")]
    pub language: String,
    #[serde(default, deserialize_with = "text_field")]
    pub description: String,
    #[serde(default, deserialize_with = "text_field", rename = "call number")]
    pub call_number: String,
}

// `size` comes back as a JSON number or a decimal string; anything else is 0.
fn size_in_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_text(&value))
}

fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(values) => values
            .iter()
            .map(flatten_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

#[derive(Debug, Serialize)]
pub struct SizeReportRow {
    #[serde(rename = "Item ID")]
    pub item_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "PDF Count")]
    pub pdf_count: usize,
    #[serde(rename = "Size (Bytes)")]
    pub size_bytes: u64,
    #[serde(rename = "Size (Formatted)")]
    pub size_formatted: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadMetadataRow {
    #[serde(rename = "ItemID")]
    pub item_id: String,
    #[serde(rename = "FileName")]
    pub file_name: String,
    pub title: String,
    pub creator: String,
    pub publisher: String,
    pub date: String,
    pub subject: String,
    pub language: String,
    pub description: String,
    pub call_number: String,
}

/// Append-only record of per-item failures, owned by the run flow and lent to
/// whichever aggregator runs. Never consulted for control decisions.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn record(&mut self, entry: String) {
        warn!("{}", entry);
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn recent(&self) -> &[String] {
        let start = self.entries.len().saturating_sub(RECENT_ERRORS);
        &self.entries[start..]
    }

    /// Shows the most recent entries in red with a count of anything older.
    /// Prints nothing when the log is empty.
    pub fn print_recent(&self, console: &dyn Console, header: &str) {
        if self.entries.is_empty() {
            return;
        }
        console.alert(header);
        for entry in self.recent() {
            console.alert(&format!(" - {}", entry));
        }
        if self.entries.len() > RECENT_ERRORS {
            console.alert(&format!(" ... and {} more", self.entries.len() - RECENT_ERRORS));
        }
    }
}
