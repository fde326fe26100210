//! Dataset ingestion
//!
//! The pipeline controller calls an ingestor once per run to turn a
//! `DatasetSource` into a `DatasetHandle` shared by every training job.
//! Parsing and validating the data itself is left to the training jobs.

use async_trait::async_trait;
use gantry_core::domain::dataset::{DatasetHandle, DatasetSource};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("dataset source not found: {0}")]
    NotFound(String),

    #[error("dataset source is empty: {0}")]
    Empty(String),

    #[error("failed to read dataset {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Dataset-ingestion collaborator
#[async_trait]
pub trait DatasetIngestor: Send + Sync {
    async fn ingest(&self, source: &DatasetSource) -> Result<DatasetHandle, IngestionError>;
}

/// Ingests a single dataset file from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileIngestor;

impl FileIngestor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatasetIngestor for FileIngestor {
    async fn ingest(&self, source: &DatasetSource) -> Result<DatasetHandle, IngestionError> {
        let location = source.location.clone();
        let io_err = |source| IngestionError::Io {
            location: location.clone(),
            source,
        };

        let metadata = match tokio::fs::metadata(&location).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestionError::NotFound(location.clone()));
            }
            Err(e) => return Err(io_err(e)),
        };

        if !metadata.is_file() {
            return Err(IngestionError::NotFound(location.clone()));
        }
        if metadata.len() == 0 {
            return Err(IngestionError::Empty(location.clone()));
        }

        let mut file = tokio::fs::File::open(&location).await.map_err(io_err)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        let mut size_bytes = 0u64;

        loop {
            let n = file.read(&mut buf).await.map_err(io_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
        }

        let fingerprint = format!("{:x}", hasher.finalize());

        info!(
            "Ingested dataset {} ({} bytes, sha256 {})",
            location, size_bytes, fingerprint
        );

        Ok(DatasetHandle {
            id: Uuid::new_v4(),
            location,
            fingerprint,
            size_bytes,
            ingested_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(&path, "abc").unwrap();

        let handle = FileIngestor::new()
            .ingest(&DatasetSource::new(path.to_string_lossy()))
            .await
            .unwrap();

        assert_eq!(handle.size_bytes, 3);
        // sha256("abc")
        assert_eq!(
            handle.fingerprint,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_missing_source() {
        let err = FileIngestor::new()
            .ingest(&DatasetSource::new("/nonexistent/prices.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let err = FileIngestor::new()
            .ingest(&DatasetSource::new(path.to_string_lossy()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Empty(_)));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileIngestor::new()
            .ingest(&DatasetSource::new(dir.path().to_string_lossy()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::NotFound(_)));
    }
}
