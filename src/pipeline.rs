//! End-to-end analysis run
//!
//! Catalog → selector → fetcher → parser → aggregator → report. Discovery
//! and analysis are separate steps so that a caller can show what was
//! selected before the downloads start.

use crate::aggregator::OutcomeAggregator;
use crate::catalog::ObjectCatalog;
use crate::config::{BackendKind, ExplainerConfig};
use crate::error::{ExplainerError, Result};
use crate::fetcher::{FetchedObject, ObjectFetcher};
use crate::histogram::Histogram;
use crate::metrics::{RunMetrics, RunStats};
use crate::models::LogObjectKey;
use crate::parser::{FileSummary, LogParser};
use crate::report::CacheReport;
use crate::selector::select_latest;
use crate::store::{AwsCliStore, LocalStore, ObjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

const SCRATCH_PREFIX: &str = "cdn_log_explainer_";

/// Keys found by the catalog and the window chosen for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub listed: usize,
    pub selected: Vec<LogObjectKey>,
}

/// Result of fetching and parsing the selected objects
#[derive(Debug)]
pub struct Analysis {
    pub histogram: Histogram,
    /// Objects whose counts made it into the histogram
    pub parsed: Vec<LogObjectKey>,
    /// Fetch and decode failures, one per affected object
    pub failures: Vec<ExplainerError>,
    /// Scratch directory left on disk when downloads are retained
    pub kept_dir: Option<PathBuf>,
}

/// Everything a complete run produces
#[derive(Debug)]
pub struct RunOutcome {
    pub discovery: Discovery,
    pub report: CacheReport,
    pub failures: Vec<ExplainerError>,
    pub kept_dir: Option<PathBuf>,
    pub stats: RunStats,
}

/// Build the store backend named by the configuration
pub fn store_from_config(config: &ExplainerConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        BackendKind::AwsCli => Ok(Arc::new(AwsCliStore::new(
            config.aws_cli_path.clone(),
            config.page_size,
        ))),
        BackendKind::Local => {
            let root = config.local_root.clone().ok_or_else(|| {
                ExplainerError::ConfigError(
                    "local_root is required when backend is 'local'".to_string(),
                )
            })?;
            Ok(Arc::new(LocalStore::new(root, config.page_size)))
        }
    }
}

/// Coordinates one analysis run
pub struct Explainer {
    config: ExplainerConfig,
    store: Arc<dyn ObjectStore>,
    parser: LogParser,
    metrics: Arc<RunMetrics>,
}

impl Explainer {
    pub fn new(config: ExplainerConfig, store: Arc<dyn ObjectStore>) -> Self {
        let parser = LogParser::new(config.primary_field.clone(), config.fallback_field.clone());
        Explainer {
            config,
            store,
            parser,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    /// Validate the configuration and build the matching store backend
    pub fn from_config(config: ExplainerConfig) -> Result<Self> {
        config.validate()?;
        let store = store_from_config(&config)?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// List the bucket and pick the most recent objects
    ///
    /// # Returns
    /// * `Err(ExplainerError::Listing)` if the store cannot be listed
    /// * `Err(ExplainerError::NoObjects)` if the listing is empty
    pub async fn discover(&self) -> Result<Discovery> {
        let bucket = &self.config.bucket;
        let prefix = &self.config.prefix;

        let keys = ObjectCatalog::new(self.store.clone())
            .list_keys(bucket, prefix)
            .await
            .map_err(|e| {
                error!("Listing failed: {}", e);
                e
            })?;

        if keys.is_empty() {
            return Err(ExplainerError::NoObjects {
                bucket: bucket.clone(),
                prefix: prefix.clone(),
            });
        }

        let selected = select_latest(&keys, self.config.latest);
        self.metrics.record_listing(keys.len(), selected.len());
        info!(
            "Selected {} of {} objects (latest={})",
            selected.len(),
            keys.len(),
            self.config.latest
        );

        Ok(Discovery {
            listed: keys.len(),
            selected,
        })
    }

    /// Fetch, parse and aggregate the selected objects
    ///
    /// Failures on individual objects are collected in
    /// [`Analysis::failures`]. The call fails only if objects were selected
    /// and none could be fetched, or if the run deadline passes.
    pub async fn analyze(&self, selected: &[LogObjectKey]) -> Result<Analysis> {
        let scratch = self.scratch_dir()?;
        debug!("Scratch directory: {}", scratch.path().display());

        let work = self.fetch_and_aggregate(selected, scratch.path().to_path_buf());
        let progress = match self.config.run_timeout() {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                ExplainerError::Timeout(format!(
                    "fetch and parse did not finish within {:?}",
                    limit
                ))
            })??,
            None => work.await?,
        };

        if !selected.is_empty() && progress.fetched == 0 {
            return Err(ExplainerError::NothingFetched {
                attempted: selected.len(),
            });
        }

        let kept_dir = if self.config.keep {
            Some(scratch.into_path())
        } else {
            None
        };

        let Progress {
            aggregator,
            failures,
            mut parsed,
            ..
        } = progress;
        info!(
            "Aggregated {} files ({} data lines), {} failures",
            aggregator.files(),
            aggregator.data_lines(),
            failures.len()
        );

        parsed.sort_by_key(|(index, _)| *index);
        Ok(Analysis {
            histogram: aggregator.finish(),
            parsed: parsed.into_iter().map(|(_, key)| key).collect(),
            failures,
            kept_dir,
        })
    }

    /// Discover, analyze and build the report
    pub async fn run(&self) -> Result<RunOutcome> {
        let discovery = self.discover().await?;
        let analysis = self.analyze(&discovery.selected).await?;
        let report = CacheReport::from_histogram(&analysis.histogram, self.config.top_n);
        let stats = self.metrics.get_stats();

        info!(
            "Run complete: listed={} selected={} fetched={} parsed={} fetch_failures={} decode_failures={} coverage={:.0}% avg_fetch={:?}",
            stats.objects_listed,
            stats.objects_selected,
            stats.objects_fetched,
            stats.objects_parsed,
            stats.fetch_failures,
            stats.decode_failures,
            stats.coverage() * 100.0,
            stats.avg_fetch_duration()
        );

        Ok(RunOutcome {
            discovery,
            report,
            failures: analysis.failures,
            kept_dir: analysis.kept_dir,
            stats,
        })
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.config.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn fetch_and_aggregate(
        &self,
        selected: &[LogObjectKey],
        scratch: PathBuf,
    ) -> Result<Progress> {
        let fetcher = ObjectFetcher::new(self.store.clone(), self.config.max_concurrent_fetches)
            .with_metrics(self.metrics.clone());
        let mut batch = fetcher.fetch_all(&self.config.bucket, selected, &scratch);

        let mut progress = Progress::default();

        while let Some(result) = batch.next().await {
            let object = match result.outcome {
                Ok(object) => object,
                Err(e) => {
                    warn!("Skipping key={}: {}", result.key, e);
                    progress.failures.push(e);
                    continue;
                }
            };
            progress.fetched += 1;

            match self.parse(&object).await {
                Ok(summary) => {
                    debug!(
                        "Parsed key={} lines={} labels={}",
                        object.key,
                        summary.data_lines,
                        summary.histogram.len()
                    );
                    progress.aggregator.absorb(&summary);
                    progress.parsed.push((object.index, object.key.clone()));
                }
                Err(e) => {
                    warn!("Discarding key={}: {}", object.key, e);
                    progress.failures.push(e);
                }
            }

            if !self.config.keep {
                if let Err(e) = tokio::fs::remove_file(&object.path).await {
                    warn!("Could not remove {}: {}", object.path.display(), e);
                }
            }
        }

        progress.failures.extend(batch.join().await);
        Ok(progress)
    }

    async fn parse(&self, object: &FetchedObject) -> Result<FileSummary> {
        let parser = self.parser.clone();
        let path = object.path.clone();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || parser.parse_file(&path))
            .await
            .map_err(|e| ExplainerError::InternalError(format!("Parse task failed: {}", e)))?;

        self.metrics.record_parse(
            result.as_ref().ok().map(|summary| summary.data_lines),
            started.elapsed(),
        );
        result
    }
}

#[derive(Default)]
struct Progress {
    aggregator: OutcomeAggregator,
    failures: Vec<ExplainerError>,
    fetched: usize,
    parsed: Vec<(usize, LogObjectKey)>,
}
