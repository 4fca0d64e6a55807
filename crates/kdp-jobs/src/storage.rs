//! Where finished PDFs go

use crate::error::{JobError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `name` and return a URL for it
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Keeps files in memory; URLs use the `memory://` scheme
#[derive(Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(name).cloned()
    }

    /// Stored names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        self.files.lock().await.insert(name.to_string(), bytes);
        Ok(format!("memory://{}", name))
    }
}

/// Writes files below a root directory and returns `file://` URLs
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        if escapes || name.is_empty() {
            return Err(JobError::Storage(format!("Invalid file name: {}", name)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        log::debug!("Wrote {}", absolute.display());
        Ok(format!("file://{}", absolute.display()))
    }
}
