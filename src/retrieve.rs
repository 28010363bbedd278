//! Retrieval of the most recent capture.
//!
//! [`load_latest`] is the strict form and reports why nothing could be
//! loaded. [`list_tabs`] is what readers normally call: every failure is
//! logged and collapses to an empty list, since "no data yet" is an
//! ordinary state for the dashboard.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{DataType, TabRecord};
use crate::store::{StoreError, TabStore};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no capture has been stored yet")]
    MissingPointer,
    #[error("latest pointer names {0}, which does not exist")]
    MissingArtifact(String),
    #[error("unreadable capture data: {0}")]
    CorruptArtifact(#[source] StoreError),
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for RetrievalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { .. } | StoreError::InvalidName(_) => {
                RetrievalError::CorruptArtifact(err)
            }
            StoreError::Io { .. } => RetrievalError::Storage(err),
        }
    }
}

/// The capture currently named by the latest pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabSnapshot {
    pub timestamp: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    pub filename: String,
    pub tabs: Vec<TabRecord>,
}

pub async fn load_latest(store: &dyn TabStore) -> Result<TabSnapshot, RetrievalError> {
    let pointer = store
        .read_latest()
        .await?
        .ok_or(RetrievalError::MissingPointer)?;

    let artifact = store
        .read_artifact(&pointer.filename)
        .await?
        .ok_or_else(|| RetrievalError::MissingArtifact(pointer.filename.clone()))?;

    Ok(TabSnapshot {
        timestamp: artifact.timestamp,
        data_type: artifact.payload.data_type(),
        filename: pointer.filename,
        tabs: artifact.payload.into_tabs(),
    })
}

/// Like [`load_latest`], but any failure yields `None` after logging it.
pub async fn latest_snapshot(store: &dyn TabStore) -> Option<TabSnapshot> {
    match load_latest(store).await {
        Ok(snapshot) => Some(snapshot),
        Err(RetrievalError::MissingPointer) => {
            tracing::debug!("no tab data received yet");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "error reading tab data");
            None
        }
    }
}

/// Tabs from the latest capture, or an empty list.
pub async fn list_tabs(store: &dyn TabStore) -> Vec<TabRecord> {
    latest_snapshot(store)
        .await
        .map(|s| s.tabs)
        .unwrap_or_default()
}

/// `2024-05-01T14:03:22.123456` → `May 01, 2024 at 02:03 PM`. Input that
/// does not parse is returned unchanged.
pub fn format_timestamp(timestamp: &str) -> String {
    let parsed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").or_else(|_| {
        chrono::DateTime::parse_from_rfc3339(timestamp).map(|dt| dt.naive_local())
    });
    match parsed {
        Ok(dt) => dt.format("%B %d, %Y at %I:%M %p").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, ingest_payload};
    use crate::models::{IngestPayload, LatestPointer, StoredArtifact};
    use crate::store::{FsStore, MemoryStore, LATEST_FILENAME};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let store = MemoryStore::new();
        assert!(list_tabs(&store).await.is_empty());
        assert!(matches!(
            load_latest(&store).await,
            Err(RetrievalError::MissingPointer)
        ));
    }

    #[tokio::test]
    async fn test_single_tab_roundtrip() {
        let store = MemoryStore::new();
        let tab = json!({
            "url": "https://example.com",
            "title": "Example",
            "content": { "textContent": "Hello", "headings": [{ "level": "h1", "text": "Hi" }] }
        });
        ingest(&store, json!({ "tabData": tab.clone() }).to_string().as_bytes())
            .await
            .unwrap();

        let tabs = list_tabs(&store).await;
        assert_eq!(tabs.len(), 1);
        assert_eq!(serde_json::to_value(&tabs[0]).unwrap(), tab);
    }

    #[tokio::test]
    async fn test_batch_roundtrip_keeps_order() {
        let store = MemoryStore::new();
        let tabs: Vec<TabRecord> = (0..5)
            .map(|i| TabRecord::new(format!("https://site{}.dev", i), format!("Site {}", i)))
            .collect();
        ingest_payload(
            &store,
            IngestPayload::Batch(tabs.clone()),
            chrono::Local::now(),
        )
        .await
        .unwrap();

        assert_eq!(list_tabs(&store).await, tabs);
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let store = MemoryStore::new();
        ingest(&store, br#"{"tabsData": [{"url": "u", "title": "t"}]}"#)
            .await
            .unwrap();
        let first = list_tabs(&store).await;
        let second = list_tabs(&store).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_newer_capture_replaces_older() {
        let store = MemoryStore::new();
        ingest(&store, br#"{"tabsData": [{"url": "old", "title": "Old"}]}"#)
            .await
            .unwrap();
        ingest(&store, br#"{"tabData": {"url": "new", "title": "New"}}"#)
            .await
            .unwrap();

        let snapshot = load_latest(&store).await.unwrap();
        assert_eq!(snapshot.data_type, DataType::TabData);
        assert_eq!(snapshot.tabs.len(), 1);
        assert_eq!(snapshot.tabs[0].title, "New");
        assert_eq!(store.artifact_count(), 2);
    }

    #[tokio::test]
    async fn test_dangling_pointer_is_empty() {
        let store = MemoryStore::new();
        store
            .write_latest(&LatestPointer {
                timestamp: "t".to_string(),
                filename: "tabs_gone.json".to_string(),
                data_type: DataType::TabsData,
            })
            .await
            .unwrap();
        assert!(list_tabs(&store).await.is_empty());
        assert!(matches!(
            load_latest(&store).await,
            Err(RetrievalError::MissingArtifact(name)) if name == "tabs_gone.json"
        ));
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("tabs_bad.json"), "{ truncated").unwrap();
        std::fs::write(
            tmp.path().join(LATEST_FILENAME),
            r#"{"timestamp": "t", "filename": "tabs_bad.json", "dataType": "tabsData"}"#,
        )
        .unwrap();

        assert!(list_tabs(&store).await.is_empty());
        assert!(matches!(
            load_latest(&store).await,
            Err(RetrievalError::CorruptArtifact(_))
        ));
    }

    #[tokio::test]
    async fn test_artifact_without_tabs_key_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("tabs_x.json"), r#"{"timestamp": "t"}"#).unwrap();
        std::fs::write(
            tmp.path().join(LATEST_FILENAME),
            r#"{"timestamp": "t", "filename": "tabs_x.json", "dataType": "tabsData"}"#,
        )
        .unwrap();
        assert!(list_tabs(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_carries_receipt_time() {
        let store = MemoryStore::new();
        let artifact = StoredArtifact::new(
            IngestPayload::Batch(vec![TabRecord::new("u", "t")]),
            "2024-05-01T14:03:22.123456",
        );
        let name = store.create_artifact("tabs_a.json", &artifact).await.unwrap();
        store
            .write_latest(&LatestPointer {
                timestamp: artifact.timestamp.clone(),
                filename: name,
                data_type: DataType::TabsData,
            })
            .await
            .unwrap();

        let snapshot = latest_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.timestamp, "2024-05-01T14:03:22.123456");
        assert_eq!(snapshot.filename, "tabs_a.json");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2024-05-01T14:03:22.123456"),
            "May 01, 2024 at 02:03 PM"
        );
        assert_eq!(
            format_timestamp("2024-12-24T09:15:00"),
            "December 24, 2024 at 09:15 AM"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }
}
