//! Object fetcher: downloads selected log objects into scratch storage
//!
//! Downloads run concurrently, one task per key, gated by a semaphore so
//! that at most `max_concurrent` transfers are in flight. A failed download
//! is reported for its key and never cancels the others.

use crate::error::{ExplainerError, Result};
use crate::metrics::RunMetrics;
use crate::models::LogObjectKey;
use crate::store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A downloaded scratch artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedObject {
    /// Position of the key in the selected list
    pub index: usize,
    pub key: LogObjectKey,
    /// Local copy, unique per key within one scratch directory
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of one download attempt
#[derive(Debug)]
pub struct FetchResult {
    pub index: usize,
    pub key: LogObjectKey,
    pub outcome: Result<FetchedObject>,
    pub duration: Duration,
}

/// Downloads in flight, yielding results in completion order
///
/// Dropping the batch aborts any download that has not finished yet.
pub struct FetchBatch {
    rx: mpsc::Receiver<FetchResult>,
    workers: JoinSet<()>,
}

impl FetchBatch {
    /// Next finished download, or `None` once every worker is done
    pub async fn next(&mut self) -> Option<FetchResult> {
        self.rx.recv().await
    }

    /// Wait for the workers to exit and report any that panicked
    pub async fn join(mut self) -> Vec<ExplainerError> {
        let mut errors = Vec::new();
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                errors.push(ExplainerError::InternalError(format!(
                    "Fetch worker failed: {}",
                    e
                )));
            }
        }
        errors
    }
}

/// Fetcher for moving objects from the store to local scratch files
pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
    max_concurrent: usize,
    metrics: Arc<RunMetrics>,
}

impl ObjectFetcher {
    /// Create a new ObjectFetcher
    ///
    /// # Arguments
    /// * `store` - Backend to download from
    /// * `max_concurrent` - Maximum number of downloads in flight
    pub fn new(store: Arc<dyn ObjectStore>, max_concurrent: usize) -> Self {
        ObjectFetcher {
            store,
            max_concurrent: max_concurrent.max(1),
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    /// Record download counters into a shared collector
    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Scratch file for the `index`-th selected key
    ///
    /// The index prefix keeps names unique even when two keys share a file
    /// name under different prefixes. The original file name, including a
    /// `.gz` extension, is kept so compression can be detected from it.
    pub fn scratch_path_for(scratch_dir: &Path, index: usize, key: &LogObjectKey) -> PathBuf {
        let name: String = key
            .file_name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        scratch_dir.join(format!("{:04}-{}", index, name))
    }

    /// Download one object to `dest`, creating parent directories
    ///
    /// # Returns
    /// * `Ok(u64)` with the number of bytes written
    /// * `Err(ExplainerError::Fetch)` naming the key if the download fails
    pub async fn fetch(&self, bucket: &str, key: &LogObjectKey, dest: &Path) -> Result<u64> {
        fetch_one(self.store.as_ref(), bucket, key, dest).await
    }

    /// Start downloading every key into `scratch_dir`
    ///
    /// Must be called from within a tokio runtime. Results arrive through
    /// the returned [`FetchBatch`] as downloads complete.
    pub fn fetch_all(
        &self,
        bucket: &str,
        keys: &[LogObjectKey],
        scratch_dir: &Path,
    ) -> FetchBatch {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, rx) = mpsc::channel(keys.len().max(1));
        let mut workers = JoinSet::new();

        for (index, key) in keys.iter().cloned().enumerate() {
            let sem = semaphore.clone();
            let store = self.store.clone();
            let metrics = self.metrics.clone();
            let tx = tx.clone();
            let bucket = bucket.to_string();
            let dest = Self::scratch_path_for(scratch_dir, index, &key);

            workers.spawn(async move {
                let started = Instant::now();
                let outcome = match sem.acquire_owned().await {
                    Ok(_permit) => fetch_one(store.as_ref(), &bucket, &key, &dest)
                        .await
                        .map(|bytes| FetchedObject {
                            index,
                            key: key.clone(),
                            path: dest,
                            bytes,
                        }),
                    Err(e) => Err(ExplainerError::InternalError(format!(
                        "Fetch semaphore closed: {}",
                        e
                    ))),
                };
                let duration = started.elapsed();
                metrics.record_fetch(outcome.as_ref().ok().map(|o| o.bytes), duration);

                // The receiver is gone only if the run was abandoned.
                let _ = tx
                    .send(FetchResult {
                        index,
                        key,
                        outcome,
                        duration,
                    })
                    .await;
            });
        }

        FetchBatch { rx, workers }
    }
}

async fn fetch_one(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &LogObjectKey,
    dest: &Path,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ExplainerError::fetch(
                key.as_str(),
                format!("Cannot create {}: {}", parent.display(), e),
            )
        })?;
    }

    debug!("Fetching s3://{}/{} -> {}", bucket, key, dest.display());

    match store.get(bucket, key, dest).await {
        Ok(bytes) => {
            debug!("Fetched key={} bytes={}", key, bytes);
            Ok(bytes)
        }
        Err(e) => {
            warn!("Fetch failed for key={}: {}", key, e);
            // Leave nothing half-written behind for the parser to pick up.
            let _ = tokio::fs::remove_file(dest).await;
            Err(match e {
                ExplainerError::Fetch { .. } => e,
                other => ExplainerError::fetch(key.as_str(), other.to_string()),
            })
        }
    }
}
