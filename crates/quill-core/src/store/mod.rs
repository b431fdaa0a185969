//! File storage collaborators.
//!
//! The pipeline addresses files purely by path string: "does this path
//! have content, read it, write it, append to it". [`VaultStore`] backs
//! that contract with the filesystem; [`MemoryStore`] backs it with a map
//! for tests and embedding. [`ActivityLog`] is the explicit append-only
//! run log the orchestrator reports into.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Path-keyed file storage.
///
/// Object-safe so the orchestrator can hold an `Arc<dyn FileStore>`. No
/// directory-traversal semantics beyond "does this path already have
/// content".
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &str) -> bool;
    async fn read(&self, path: &str) -> Result<String>;
    async fn write(&self, path: &str, content: &str) -> Result<()>;
    async fn append(&self, path: &str, content: &str) -> Result<()>;
}

// Compile-time assertion: FileStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn FileStore) {}
};

/// Filesystem-backed store rooted at a vault directory.
///
/// Paths are resolved relative to the root; parent directories are
/// created on write.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn ensure_parent(&self, full: &Path) -> Result<()> {
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for VaultStore {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    async fn read(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("failed to read {}", full.display()))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path);
        self.ensure_parent(&full).await?;
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("failed to write {}", full.display()))
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path);
        self.ensure_parent(&full).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await
            .with_context(|| format!("failed to open {} for append", full.display()))?;
        file.write_all(content.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", full.display()))
    }
}

/// In-memory store for tests and library embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, e.g. a template fixture.
    pub async fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.lock().await.insert(path.into(), content.into());
    }

    /// Snapshot of all stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn exists(&self, path: &str) -> bool {
        self.files.lock().await.contains_key(path)
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.files
            .lock()
            .await
            .get(path)
            .cloned()
            .with_context(|| format!("no file at {path}"))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        self.files
            .lock()
            .await
            .entry(path.to_string())
            .or_default()
            .push_str(content);
        Ok(())
    }
}

/// Append-only activity log.
///
/// An explicit collaborator passed into the orchestrator; each entry's
/// first line is prefixed with a UTC timestamp.
#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn FileStore>,
    path: String,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn FileStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append one entry (possibly multi-line) to the log.
    pub async fn append(&self, entry: &str) -> Result<()> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("[{timestamp}] {entry}\n");
        self.store.append(&self.path, &line).await
    }

    /// Read the full log; empty when it does not exist yet.
    pub async fn read_all(&self) -> String {
        if self.store.exists(&self.path).await {
            self.store.read(&self.path).await.unwrap_or_default()
        } else {
            String::new()
        }
    }
}
