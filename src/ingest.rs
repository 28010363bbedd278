//! Ingestion of tab captures.
//!
//! Flow for one request: parse JSON → decode into [`IngestPayload`] →
//! stamp with the receipt time → write a new artifact → replace the
//! latest pointer. The two writes are not transactional; if the pointer
//! write fails the artifact stays on disk and readers keep seeing the
//! previous capture.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{DataType, IngestPayload, LatestPointer, StoredArtifact, TabRecord};
use crate::store::{StoreError, TabStore};

/// Maximum length of the URL fragment embedded in single-tab file names.
pub const URL_PART_MAX_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("Invalid data format: {0}")]
    InvalidShape(String),
    #[error("Failed to store tab data: {0}")]
    StorageFailure(#[from] StoreError),
}

impl IngestError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::MalformedJson(_) => "malformed_json",
            IngestError::InvalidShape(_) => "invalid_shape",
            IngestError::StorageFailure(_) => "storage_failure",
        }
    }
}

/// Successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub filename: String,
    pub timestamp: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
}

/// A decoded `POST /active_tab` body.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub payload: IngestPayload,
    /// Top-level keys other than the tab key, minus any client `timestamp`.
    pub extra: Map<String, Value>,
}

impl IngestRequest {
    /// Decode a request body that has already parsed as JSON.
    ///
    /// The body must be an object carrying exactly one of `tabData` or
    /// `tabsData`. Only presence and basic shape are checked.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        let Value::Object(mut obj) = value else {
            return Err(IngestError::InvalidShape(
                "expected a JSON object".to_string(),
            ));
        };

        let payload = match (obj.remove("tabData"), obj.remove("tabsData")) {
            (Some(single), None) => serde_json::from_value::<TabRecord>(single)
                .map(IngestPayload::Single)
                .map_err(|e| IngestError::InvalidShape(format!("tabData: {}", e)))?,
            (None, Some(batch)) => serde_json::from_value::<Vec<TabRecord>>(batch)
                .map(IngestPayload::Batch)
                .map_err(|e| IngestError::InvalidShape(format!("tabsData: {}", e)))?,
            (Some(_), Some(_)) => {
                return Err(IngestError::InvalidShape(
                    "payload must not contain both tabData and tabsData".to_string(),
                ))
            }
            (None, None) => {
                return Err(IngestError::InvalidShape(
                    "payload must contain tabData or tabsData".to_string(),
                ))
            }
        };

        // The receipt time replaces whatever the client sent.
        obj.remove("timestamp");
        Ok(Self {
            payload,
            extra: obj,
        })
    }
}

/// Parse and decode raw request bytes.
pub fn decode_body(body: &[u8]) -> Result<IngestRequest, IngestError> {
    let value: Value = serde_json::from_slice(body).map_err(IngestError::MalformedJson)?;
    IngestRequest::from_value(value)
}

/// Receipt timestamp: local clock, microsecond precision, no offset.
pub fn format_receipt_time(now: DateTime<Local>) -> String {
    now.naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// URL fragment used in single-tab file names.
pub fn sanitize_url(url: &str) -> String {
    let url = if url.is_empty() { "unknown" } else { url };
    url.replace("://", "_")
        .replace(['/', '\\'], "_")
        .chars()
        .take(URL_PART_MAX_CHARS)
        .collect()
}

/// `tabs_<ts>.json` for batches, `tab_<ts>_<url>.json` for one tab, with
/// `:` in the timestamp replaced by `-`.
pub fn artifact_filename(payload: &IngestPayload, timestamp: &str) -> String {
    let ts = timestamp.replace(':', "-");
    match payload {
        IngestPayload::Batch(_) => format!("tabs_{}.json", ts),
        IngestPayload::Single(tab) => format!("tab_{}_{}.json", ts, sanitize_url(&tab.url)),
    }
}

/// Ingest a raw request body, stamping it with the current time.
pub async fn ingest(store: &dyn TabStore, body: &[u8]) -> Result<Ack, IngestError> {
    let request = decode_body(body)?;
    ingest_request(store, request, Local::now()).await
}

/// Persist an already-decoded payload received at `now`.
pub async fn ingest_payload(
    store: &dyn TabStore,
    payload: IngestPayload,
    now: DateTime<Local>,
) -> Result<Ack, IngestError> {
    let request = IngestRequest {
        payload,
        extra: Map::new(),
    };
    ingest_request(store, request, now).await
}

/// Persist a decoded request, extra top-level keys included.
pub async fn ingest_request(
    store: &dyn TabStore,
    request: IngestRequest,
    now: DateTime<Local>,
) -> Result<Ack, IngestError> {
    let IngestRequest { payload, extra } = request;
    let timestamp = format_receipt_time(now);
    let name = artifact_filename(&payload, &timestamp);
    let data_type = payload.data_type();
    let tab_count = payload.tab_count();

    let artifact = StoredArtifact {
        payload,
        timestamp: timestamp.clone(),
        extra,
    };
    let filename = store.create_artifact(&name, &artifact).await?;

    store
        .write_latest(&LatestPointer {
            timestamp: timestamp.clone(),
            filename: filename.clone(),
            data_type,
        })
        .await?;

    tracing::info!(%filename, %data_type, tabs = tab_count, "stored tab data");

    Ok(Ack {
        filename,
        timestamp,
        data_type,
    })
}
