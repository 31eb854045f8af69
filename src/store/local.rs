//! Object store over a local directory tree
//!
//! The configured root directory plays the role of the bucket; the bucket
//! name is only used in messages. Keys are `/`-separated paths relative to
//! the root and are listed in lexicographic order, matching S3's listing
//! order. Pages are cut at `page_size` keys and the continuation token is
//! the last key of the previous page.
//!
//! The tree is walked once per listing: a first-page request takes a fresh
//! snapshot and continuation requests page through it. Symlinks to files
//! are listed under the link's name; symlinks to directories are not
//! descended into.

use crate::error::{ExplainerError, Result};
use crate::models::LogObjectKey;
use crate::store::{ListPage, ObjectStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// [`ObjectStore`] serving files below a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    page_size: usize,
    snapshot: Arc<Mutex<Option<Arc<Vec<String>>>>>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Self {
        LocalStore {
            root: root.into(),
            page_size: page_size.max(1),
            snapshot: Arc::new(Mutex::new(None)),
        }
    }

    /// Sorted keys for this listing
    ///
    /// Walks the tree when a listing starts, or when a continuation arrives
    /// without a snapshot to page through.
    async fn listing_keys(
        &self,
        continuation: Option<&str>,
    ) -> std::io::Result<Arc<Vec<String>>> {
        let mut snapshot = self.snapshot.lock().await;
        if continuation.is_some() {
            if let Some(keys) = snapshot.as_ref() {
                return Ok(keys.clone());
            }
        }

        let keys = Arc::new(self.all_keys().await?);
        *snapshot = Some(keys.clone());
        Ok(keys)
    }

    /// Walk the root and return every file as a key, sorted
    async fn all_keys(&self) -> std::io::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                let is_file = if file_type.is_dir() {
                    pending.push(path.clone());
                    false
                } else if file_type.is_symlink() {
                    // Dangling links are skipped rather than failing the walk.
                    fs::metadata(&path)
                        .await
                        .map(|meta| meta.is_file())
                        .unwrap_or(false)
                } else {
                    file_type.is_file()
                };

                if is_file {
                    if let Some(key) = self.key_for(&path) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    fn path_for(&self, key: &LogObjectKey) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for part in key.as_str().split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let keys = self.listing_keys(continuation).await.map_err(|e| {
            ExplainerError::listing(
                bucket,
                prefix,
                format!("Cannot read {}: {}", self.root.display(), e),
            )
        })?;

        let start = continuation.map_or(0, |after| {
            keys.partition_point(|key| key.as_str() <= after)
        });
        let mut matching = keys[start..].iter().filter(|key| key.starts_with(prefix));

        let page: Vec<LogObjectKey> = matching
            .by_ref()
            .take(self.page_size)
            .map(|key| LogObjectKey::new(key.as_str()))
            .collect();
        let more = matching.next().is_some();

        debug!(
            "Listed {} keys under {} (prefix={:?}, more={})",
            page.len(),
            self.root.display(),
            prefix,
            more
        );

        let next = if more {
            page.last().map(|key| key.as_str().to_string())
        } else {
            None
        };
        Ok(ListPage { keys: page, next })
    }

    async fn get(&self, _bucket: &str, key: &LogObjectKey, dest: &Path) -> Result<u64> {
        let source = self
            .path_for(key)
            .ok_or_else(|| ExplainerError::fetch(key.as_str(), "Key is not a valid relative path"))?;

        fs::copy(&source, dest).await.map_err(|e| {
            ExplainerError::fetch(
                key.as_str(),
                format!("Cannot copy {}: {}", source.display(), e),
            )
        })
    }
}
