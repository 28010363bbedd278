//! Storage abstraction for tab captures.
//!
//! The [`TabStore`] trait covers the two kinds of state the system has:
//! an append-only set of artifact files and a single-slot
//! [`LatestPointer`]. Ingestion and retrieval share nothing but a store
//! handle, which is passed explicitly.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`FsStore`] | a directory of `tab_*.json` / `tabs_*.json` files plus `latest.json` |
//! | [`MemoryStore`] | tests |

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::models::{LatestPointer, StoredArtifact};

pub use fs::FsStore;
pub use memory::MemoryStore;

/// File name of the pointer record inside the storage directory.
pub const LATEST_FILENAME: &str = "latest.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt JSON in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid artifact file name: {0:?}")]
    InvalidName(String),
}

#[async_trait]
pub trait TabStore: Send + Sync {
    /// Persist a new artifact under `name`, or under `name` with a `-N`
    /// counter on its timestamp if that file already exists. Returns the name actually used.
    async fn create_artifact(&self, name: &str, artifact: &StoredArtifact)
        -> Result<String, StoreError>;

    /// `Ok(None)` when the file does not exist.
    async fn read_artifact(&self, filename: &str) -> Result<Option<StoredArtifact>, StoreError>;

    /// Replace the pointer record.
    async fn write_latest(&self, pointer: &LatestPointer) -> Result<(), StoreError>;

    /// `Ok(None)` when no ingestion has happened yet.
    async fn read_latest(&self) -> Result<Option<LatestPointer>, StoreError>;

    /// All artifact file names, sorted.
    async fn list_artifacts(&self) -> Result<Vec<String>, StoreError>;

    async fn remove_artifact(&self, filename: &str) -> Result<(), StoreError>;
}

/// Reject names that could escape the storage directory.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name == LATEST_FILENAME
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn is_artifact_name(name: &str) -> bool {
    (name.starts_with("tab_") || name.starts_with("tabs_")) && name.ends_with(".json")
}

/// Collision name: the counter goes on the timestamp segment, so it cannot
/// be mistaken for part of a sanitized URL.
///
/// `tabs_TS.json` → `tabs_TS-2.json`, `tab_TS_https_a.dev.json` → `tab_TS-2_https_a.dev.json`.
pub(crate) fn suffixed_name(name: &str, n: usize) -> String {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let prefix_len = if name.starts_with("tabs_") {
        "tabs_".len()
    } else if name.starts_with("tab_") {
        "tab_".len()
    } else {
        0
    };
    let split_at = if prefix_len == 0 {
        stem.len()
    } else {
        let rest = &stem[prefix_len..];
        prefix_len + rest.find('_').unwrap_or(rest.len())
    };
    format!("{}-{}{}", &name[..split_at], n, &name[split_at..])
}
