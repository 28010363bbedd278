//! In-memory [`TabStore`] for tests.
//!
//! Same naming rules as the filesystem store, with the artifacts and the
//! pointer held behind `std::sync::RwLock`.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{is_artifact_name, suffixed_name, validate_name, StoreError, TabStore};
use crate::models::{LatestPointer, StoredArtifact};

#[derive(Default)]
pub struct MemoryStore {
    artifacts: RwLock<BTreeMap<String, StoredArtifact>>,
    latest: RwLock<Option<LatestPointer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl TabStore for MemoryStore {
    async fn create_artifact(
        &self,
        name: &str,
        artifact: &StoredArtifact,
    ) -> Result<String, StoreError> {
        validate_name(name)?;
        let mut artifacts = self.artifacts.write().unwrap_or_else(|e| e.into_inner());

        let mut candidate = name.to_string();
        let mut n = 0;
        while artifacts.contains_key(&candidate) {
            n += 1;
            candidate = suffixed_name(name, n);
        }
        artifacts.insert(candidate.clone(), artifact.clone());
        Ok(candidate)
    }

    async fn read_artifact(&self, filename: &str) -> Result<Option<StoredArtifact>, StoreError> {
        validate_name(filename)?;
        let artifacts = self.artifacts.read().unwrap_or_else(|e| e.into_inner());
        Ok(artifacts.get(filename).cloned())
    }

    async fn write_latest(&self, pointer: &LatestPointer) -> Result<(), StoreError> {
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(pointer.clone());
        Ok(())
    }

    async fn read_latest(&self) -> Result<Option<LatestPointer>, StoreError> {
        Ok(self
            .latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn list_artifacts(&self) -> Result<Vec<String>, StoreError> {
        let artifacts = self.artifacts.read().unwrap_or_else(|e| e.into_inner());
        Ok(artifacts
            .keys()
            .filter(|k| is_artifact_name(k))
            .cloned()
            .collect())
    }

    async fn remove_artifact(&self, filename: &str) -> Result<(), StoreError> {
        validate_name(filename)?;
        self.artifacts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(filename);
        Ok(())
    }
}
