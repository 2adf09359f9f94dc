//! Extraction cache.
//!
//! The file at the cache path is the source of truth: its presence is the
//! cache key and its contents are validated on every read that the memo
//! cannot vouch for. The in-process moka memo is keyed by path and tagged
//! with the file's modification time and length, so a rewritten file is
//! always re-read.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use moka::future::Cache;
use thiserror::Error;

use clausewise_core::{ContractExtraction, StructuredOutput};

/// Errors from the extraction cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cached extraction at {} is invalid: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Cache I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identity of a cache file on disk at the time it was read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

/// File-backed extraction cache with an in-memory memo in front.
#[derive(Clone)]
pub struct ExtractionCache {
    memo: Cache<PathBuf, (FileStamp, Arc<ContractExtraction>)>,
}

impl ExtractionCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            memo: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Load the extraction cached at `path`.
    ///
    /// `Ok(None)` when no file exists. A file that is not valid JSON or does
    /// not match the extraction schema is [`CacheError::Corrupt`].
    pub async fn load(&self, path: &Path) -> Result<Option<ContractExtraction>, CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.memo.invalidate(path).await;
                return Ok(None);
            }
            Err(e) => return Err(io_err(e)),
        };
        let stamp = FileStamp::of(&metadata);

        if let Some((seen, hit)) = self.memo.get(path).await {
            if seen == stamp {
                tracing::debug!(path = %path.display(), "Extraction cache memo hit");
                return Ok(Some(hit.as_ref().clone()));
            }
            tracing::debug!(path = %path.display(), "Cache file changed on disk, re-reading");
        }

        let contents = tokio::fs::read_to_string(path).await.map_err(io_err)?;
        let extraction = match ContractExtraction::from_json_str(&contents) {
            Ok(extraction) => extraction,
            Err(e) => {
                self.memo.invalidate(path).await;
                return Err(CacheError::Corrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        self.memo
            .insert(path.to_path_buf(), (stamp, Arc::new(extraction.clone())))
            .await;
        Ok(Some(extraction))
    }

    /// Persist `extraction` at `path`, creating parent directories.
    pub async fn store(&self, path: &Path, extraction: &ContractExtraction) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(extraction).map_err(|e| CacheError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, json).await.map_err(io_err)?;

        let stamp = FileStamp::of(&tokio::fs::metadata(path).await.map_err(io_err)?);
        self.memo
            .insert(path.to_path_buf(), (stamp, Arc::new(extraction.clone())))
            .await;
        tracing::info!(path = %path.display(), "Extraction cached");
        Ok(())
    }
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new(64)
    }
}
