//! CDN Log Explainer command line
//!
//! Lists CDN standard logs in a bucket, analyzes the latest N objects and
//! prints a Hit / Miss / RefreshHit report on stdout. Logs go to stderr.
//!
//! # Usage
//! ```bash
//! cdn-log-explainer --bucket my-cf-logs --prefix cloudfront/ --latest 5
//!
//! # Logs already synced to disk
//! cdn-log-explainer --bucket local --backend local --local-root ./logs
//! ```
//!
//! Exit codes: 0 when a report was printed, 2 when the listing was empty,
//! 1 on any other failure.

use anyhow::Context;
use cdn_log_explainer::{BackendKind, Explainer, ExplainerConfig, ExplainerError};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Count Hit/Miss/RefreshHit from CDN standard logs in S3.", long_about = None)]
struct Args {
    /// Bucket name
    #[arg(long)]
    bucket: Option<String>,

    /// Optional prefix (folder) where logs live, e.g. cloudfront-logs/
    #[arg(long)]
    prefix: Option<String>,

    /// Download and analyze the latest N log objects [default: 3]
    #[arg(long, allow_negative_numbers = true)]
    latest: Option<i64>,

    /// Keep downloaded files (default: delete them after parsing)
    #[arg(long)]
    keep: bool,

    /// YAML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Object store backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Directory served as the bucket by the local backend
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// Maximum number of objects fetched at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Parent directory for downloaded files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Give up on fetching and parsing after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    AwsCli,
    Local,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::AwsCli => BackendKind::AwsCli,
            Backend::Local => BackendKind::Local,
        }
    }
}

/// Load the optional config file and layer command-line flags on top
fn build_config(args: &Args) -> anyhow::Result<ExplainerConfig> {
    let mut config = match &args.config {
        Some(path) => ExplainerConfig::read_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExplainerConfig::default(),
    };

    if let Some(bucket) = &args.bucket {
        config.bucket = bucket.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(latest) = args.latest {
        config.latest = latest;
    }
    if args.keep {
        config.keep = true;
    }
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(root) = &args.local_root {
        config.local_root = Some(root.clone());
    }
    if let Some(max) = args.max_concurrent {
        config.max_concurrent_fetches = max;
    }
    if let Some(dir) = &args.scratch_dir {
        config.scratch_dir = Some(dir.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config.run_timeout_secs = Some(secs);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_quick_checks(err: &ExplainerError) {
    let hints = err.remediation_hint();
    if hints.is_empty() {
        return;
    }
    eprintln!("\nQuick checks:");
    for hint in hints {
        eprintln!("  {}", hint);
    }
}

async fn run(config: ExplainerConfig) -> Result<(), ExplainerError> {
    let explainer = Explainer::from_config(config)?;
    let bucket = explainer.config().bucket.clone();

    let discovery = explainer.discover().await?;
    println!(
        "Found {} objects. Analyzing latest {}:",
        discovery.listed,
        discovery.selected.len()
    );
    for key in &discovery.selected {
        println!("  - s3://{}/{}", bucket, key);
    }

    let analysis = explainer.analyze(&discovery.selected).await?;
    for failure in &analysis.failures {
        warn!("{}", failure);
    }

    let report = cdn_log_explainer::CacheReport::from_histogram(
        &analysis.histogram,
        explainer.config().top_n,
    );
    println!("{}", report);

    if let Some(dir) = &analysis.kept_dir {
        println!("Kept downloaded files in: {}", dir.display());
    }

    let stats = explainer.metrics().get_stats();
    info!(
        "Done: fetched={} bytes={} parsed={} lines={} fetch_failures={} decode_failures={} coverage={:.0}% avg_fetch={:?}",
        stats.objects_fetched,
        stats.bytes_fetched,
        stats.objects_parsed,
        stats.data_lines,
        stats.fetch_failures,
        stats.decode_failures,
        stats.coverage() * 100.0,
        stats.avg_fetch_duration()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        if e.is_fatal() {
            error!("Run failed: {}", e);
        }
        match &e {
            ExplainerError::NoObjects { .. } => println!("{}", e),
            _ => eprintln!("{}", e),
        }
        print_quick_checks(&e);
        std::process::exit(e.exit_code());
    }
}
