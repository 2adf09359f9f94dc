//! Document loading.
//!
//! Two loaders share one interface and are chosen by [`LoaderKind`]:
//! [`FileLoader`] reads just the given file; [`DirectoryLoader`] reads every
//! text file next to it (or inside it, when given a directory).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::LoaderKind;

/// Errors from loading documents.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No readable text documents in {}", .0.display())]
    Empty(PathBuf),
}

/// How much metadata to render with a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMode {
    All,
    None,
    Minimal,
}

/// A loaded text document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text with a `key: value` metadata header, per `mode`.
    pub fn get_content(&self, mode: MetadataMode) -> String {
        let header: Vec<String> = match mode {
            MetadataMode::None => Vec::new(),
            MetadataMode::Minimal => self
                .metadata
                .get("file_name")
                .map(|name| vec![format!("file_name: {}", name)])
                .unwrap_or_default(),
            MetadataMode::All => self
                .metadata
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect(),
        };

        if header.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\n{}", header.join("\n"), self.text)
        }
    }

    async fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let io_err = |source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        };
        let text = tokio::fs::read_to_string(path).await.map_err(io_err)?;
        let meta = tokio::fs::metadata(path).await.map_err(io_err)?;

        let mut doc = Document::new(text)
            .with_metadata("file_path", path.display().to_string())
            .with_metadata("file_size", meta.len().to_string())
            .with_metadata("file_type", file_type(path));

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            doc = doc.with_metadata("file_name", name);
        }
        if let Ok(modified) = meta.modified() {
            let modified: DateTime<Utc> = modified.into();
            doc = doc.with_metadata("last_modified_date", modified.format("%Y-%m-%d").to_string());
        }
        Ok(doc)
    }
}

fn file_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") => "text/markdown",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

/// Loads documents from a path.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError>;
}

/// Reads exactly the file it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

#[async_trait]
impl DocumentLoader for FileLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::MissingSource(path.to_path_buf()));
        }
        Ok(vec![Document::from_path(path).await?])
    }
}

/// Reads every UTF-8 file in a directory, non-recursively, sorted by name.
///
/// Given a file, reads the file's parent directory. Hidden files and files
/// that are not valid UTF-8 are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLoader;

impl DirectoryLoader {
    fn resolve_dir(path: &Path) -> Result<PathBuf, LoaderError> {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
        if path.is_file() {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            return Ok(parent.to_path_buf());
        }
        Err(LoaderError::MissingSource(path.to_path_buf()))
    }
}

#[async_trait]
impl DocumentLoader for DirectoryLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError> {
        let dir = Self::resolve_dir(path)?;
        let io_err = |source| LoaderError::Io {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let file_path = entry.path();
            let hidden = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true);
            if !hidden && file_path.is_file() {
                files.push(file_path);
            }
        }
        files.sort();

        let mut docs = Vec::with_capacity(files.len());
        for file_path in files {
            match Document::from_path(&file_path).await {
                Ok(doc) => docs.push(doc),
                Err(LoaderError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::InvalidData =>
                {
                    tracing::warn!(path = %file_path.display(), "Skipping non-text file");
                }
                Err(e) => return Err(e),
            }
        }

        if docs.is_empty() {
            return Err(LoaderError::Empty(dir));
        }
        Ok(docs)
    }
}

/// The loader selected by configuration.
pub fn loader_for(kind: LoaderKind) -> Arc<dyn DocumentLoader> {
    match kind {
        LoaderKind::File => Arc::new(FileLoader),
        LoaderKind::Directory => Arc::new(DirectoryLoader),
    }
}
