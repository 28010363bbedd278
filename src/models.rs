//! Core data models for tab captures.
//!
//! A browser extension posts either one tab (`tabData`) or a batch
//! (`tabsData`). The server stamps the payload with a receipt time and
//! writes it as a [`StoredArtifact`]; [`LatestPointer`] names the most
//! recent one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of one browser tab at capture time.
///
/// Fields the extension sends beyond `url`, `title`, `textContent` and
/// `content` are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(
        rename = "textContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text_content: Option<String>,
    /// Page extraction result, usually `{ textContent, headings, links, ... }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TabRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text_content: None,
            content: None,
            extra: Map::new(),
        }
    }

    /// Best available page text: top-level `textContent`, else
    /// `content.textContent`.
    pub fn page_text(&self) -> Option<&str> {
        if let Some(text) = self.text_content.as_deref().filter(|t| !t.is_empty()) {
            return Some(text);
        }
        self.content
            .as_ref()
            .and_then(|c| c.get("textContent"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Page text truncated to `max_chars` with a trailing `...`.
    pub fn content_preview(&self, max_chars: usize) -> String {
        match self.page_text() {
            Some(text) => {
                let mut preview: String = text.chars().take(max_chars).collect();
                preview.push_str("...");
                preview
            }
            None => "No content available".to_string(),
        }
    }
}

/// Which payload key an artifact was written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "tabData")]
    TabData,
    #[serde(rename = "tabsData")]
    TabsData,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::TabData => "tabData",
            DataType::TabsData => "tabsData",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /active_tab`: exactly one of the two keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestPayload {
    #[serde(rename = "tabData")]
    Single(TabRecord),
    #[serde(rename = "tabsData")]
    Batch(Vec<TabRecord>),
}

impl IngestPayload {
    pub fn data_type(&self) -> DataType {
        match self {
            IngestPayload::Single(_) => DataType::TabData,
            IngestPayload::Batch(_) => DataType::TabsData,
        }
    }

    pub fn tab_count(&self) -> usize {
        match self {
            IngestPayload::Single(_) => 1,
            IngestPayload::Batch(tabs) => tabs.len(),
        }
    }

    pub fn into_tabs(self) -> Vec<TabRecord> {
        match self {
            IngestPayload::Single(tab) => vec![tab],
            IngestPayload::Batch(tabs) => tabs,
        }
    }
}

/// One persisted ingestion: the payload plus the server receipt time.
///
/// Other top-level keys the client sent are kept in `extra`. `payload`
/// must stay declared before `extra` so the tab key is claimed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    #[serde(flatten)]
    pub payload: IngestPayload,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredArtifact {
    pub fn new(payload: IngestPayload, timestamp: impl Into<String>) -> Self {
        Self {
            payload,
            timestamp: timestamp.into(),
            extra: Map::new(),
        }
    }
}

/// Contents of `latest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    pub timestamp: String,
    pub filename: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
}
