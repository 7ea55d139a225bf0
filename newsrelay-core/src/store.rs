//! Durable storage for registered destinations.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::model::{DestinationId, TenantId};

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or saving destinations.
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The stored document is not a JSON object of strings.
    #[error("Invalid destination document: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
/// Persistence behind the destination registry.
pub trait DestinationStore: Send + Sync {
    /// Load every stored tenant to destination pair.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backing storage is unreadable.
    async fn load(&self) -> Result<Vec<(TenantId, DestinationId)>, StoreError>;

    /// Replace the stored pairs with `entries`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backing storage cannot be written.
    async fn save(&self, entries: &[(TenantId, DestinationId)]) -> Result<(), StoreError>;
}

/// Stores destinations as a pretty-printed JSON object `{"tenant": "channel"}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl DestinationStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<(TenantId, DestinationId)>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Self::io_error(&self.path, err)),
        };

        let document: BTreeMap<TenantId, DestinationId> = serde_json::from_slice(&bytes)?;
        Ok(document.into_iter().collect())
    }

    async fn save(&self, entries: &[(TenantId, DestinationId)]) -> Result<(), StoreError> {
        let document: BTreeMap<&TenantId, &DestinationId> = entries
            .iter()
            .map(|(tenant, destination)| (tenant, destination))
            .collect();
        let bytes = serde_json::to_vec_pretty(&document)?;

        // Write beside the target and rename so readers never see half a file.
        let mut staging = OsString::from(self.path.as_os_str());
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|err| Self::io_error(&staging, err))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|err| Self::io_error(&self.path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("channels.json"));
        assert!(store.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn saved_entries_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("channels.json"));
        let entries = vec![
            (TenantId::from("1"), DestinationId::from("10")),
            (TenantId::from("2"), DestinationId::from("20")),
        ];

        store.save(&entries).await.expect("save");
        assert_eq!(store.load().await.expect("load"), entries);

        let raw = std::fs::read_to_string(store.path()).expect("read file");
        assert!(raw.contains("\"1\": \"10\""), "unexpected document: {raw}");
    }

    #[tokio::test]
    async fn reads_hand_written_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("channels.json");
        std::fs::write(&path, r#"{ "guild": "channel" }"#).expect("write fixture");

        let entries = JsonFileStore::new(path).load().await.expect("load");
        assert_eq!(
            entries,
            vec![(TenantId::from("guild"), DestinationId::from("channel"))]
        );
    }

    #[tokio::test]
    async fn malformed_document_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("channels.json");
        std::fs::write(&path, "[1, 2]").expect("write fixture");

        let result = JsonFileStore::new(path).load().await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }
}
