//! Directory-backed [`TabStore`].
//!
//! Artifacts are created with `create_new`, so an existing file is never
//! overwritten. `latest.json` is replaced through a temp file and a rename,
//! so a concurrent reader sees either the old pointer or the new one.
//! There is no locking: two writers racing on the pointer resolve as last
//! rename wins.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

use super::{
    is_artifact_name, suffixed_name, validate_name, StoreError, TabStore, LATEST_FILENAME,
};
use crate::models::{LatestPointer, StoredArtifact};

const MAX_NAME_ATTEMPTS: usize = 1000;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path)(e)),
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl TabStore for FsStore {
    async fn create_artifact(
        &self,
        name: &str,
        artifact: &StoredArtifact,
    ) -> Result<String, StoreError> {
        validate_name(name)?;
        let bytes = to_pretty_json(artifact, &self.path_of(name))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                name.to_string()
            } else {
                suffixed_name(name, attempt)
            };
            let path = self.path_of(&candidate);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_err(&path)(e)),
            };

            file.write_all(&bytes).await.map_err(io_err(&path))?;
            file.flush().await.map_err(io_err(&path))?;
            return Ok(candidate);
        }

        Err(StoreError::Io {
            path: self.path_of(name),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "no free artifact file name after repeated attempts",
            ),
        })
    }

    async fn read_artifact(&self, filename: &str) -> Result<Option<StoredArtifact>, StoreError> {
        validate_name(filename)?;
        let path = self.path_of(filename);
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };
        let artifact =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })?;
        Ok(Some(artifact))
    }

    async fn write_latest(&self, pointer: &LatestPointer) -> Result<(), StoreError> {
        let target = self.path_of(LATEST_FILENAME);
        let bytes = to_pretty_json(pointer, &target)?;

        let tmp = self.path_of(&format!(
            ".{}.{}.{}.tmp",
            LATEST_FILENAME,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err(&tmp))?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(&target)(e));
        }
        Ok(())
    }

    async fn read_latest(&self) -> Result<Option<LatestPointer>, StoreError> {
        let path = self.path_of(LATEST_FILENAME);
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };
        let pointer =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })?;
        Ok(Some(pointer))
    }

    async fn list_artifacts(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(io_err(&self.dir))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&self.dir))? {
            if let Some(name) = entry.file_name().to_str() {
                if is_artifact_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn remove_artifact(&self, filename: &str) -> Result<(), StoreError> {
        validate_name(filename)?;
        let path = self.path_of(filename);
        tokio::fs::remove_file(&path).await.map_err(io_err(&path))
    }
}
