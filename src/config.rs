//! Configuration management for the log explainer

use crate::error::{ExplainerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which object store backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Shell out to the AWS CLI
    AwsCli,
    /// Treat a local directory as the bucket root
    Local,
}

/// Configuration for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplainerConfig {
    /// Bucket holding the CDN standard logs
    #[serde(default)]
    pub bucket: String,

    /// Optional key prefix where the logs live, e.g. `cloudfront-logs/`
    #[serde(default)]
    pub prefix: String,

    /// Number of most recent objects to analyze (default: 3)
    #[serde(default = "default_latest")]
    pub latest: i64,

    /// Keep downloaded files after the report (default: false)
    #[serde(default)]
    pub keep: bool,

    /// Maximum number of objects fetched and parsed at once (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// Parent directory for the scratch directory (default: system temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Object store backend (default: aws_cli)
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// AWS CLI executable (default: "aws")
    #[serde(default = "default_aws_cli_path")]
    pub aws_cli_path: String,

    /// Keys requested per listing page (default: 1000)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Root directory for the local backend
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    /// Column holding the cache outcome (default: "x-edge-result-type")
    #[serde(default = "default_primary_field")]
    pub primary_field: String,

    /// Column consulted when the primary one is empty
    /// (default: "x-edge-response-result-type")
    #[serde(default = "default_fallback_field")]
    pub fallback_field: String,

    /// Number of other outcomes listed in the report (default: 20)
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Overall deadline for fetching and parsing, in seconds (default: none)
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

// Default value functions for serde
fn default_latest() -> i64 {
    3
}

fn default_max_concurrent() -> usize {
    4
}

fn default_backend() -> BackendKind {
    BackendKind::AwsCli
}

fn default_aws_cli_path() -> String {
    "aws".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_primary_field() -> String {
    "x-edge-result-type".to_string()
}

fn default_fallback_field() -> String {
    "x-edge-response-result-type".to_string()
}

fn default_top_n() -> usize {
    crate::report::DEFAULT_TOP_N
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        ExplainerConfig {
            bucket: String::new(),
            prefix: String::new(),
            latest: default_latest(),
            keep: false,
            max_concurrent_fetches: default_max_concurrent(),
            scratch_dir: None,
            backend: default_backend(),
            aws_cli_path: default_aws_cli_path(),
            page_size: default_page_size(),
            local_root: None,
            primary_field: default_primary_field(),
            fallback_field: default_fallback_field(),
            top_n: default_top_n(),
            run_timeout_secs: None,
        }
    }
}

impl ExplainerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(ExplainerConfig)` if loading and validation succeed
    /// * `Err(ExplainerError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file without validating it
    ///
    /// For callers that layer more settings (e.g. command-line flags) on top
    /// and validate the merged result.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ExplainerError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            ExplainerError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ExplainerConfig = serde_yaml::from_str(content).map_err(|e| {
            ExplainerError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - bucket must not be empty
    /// - max_concurrent_fetches, page_size and top_n must be > 0
    /// - outcome column names must not be empty
    /// - the local backend needs local_root
    /// - run_timeout_secs, when set, must be > 0
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(ExplainerError::ConfigError(
                "bucket must not be empty".to_string(),
            ));
        }

        if self.max_concurrent_fetches == 0 {
            return Err(ExplainerError::ConfigError(
                "max_concurrent_fetches must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(ExplainerError::ConfigError(
                "page_size must be greater than 0".to_string(),
            ));
        }

        if self.top_n == 0 {
            return Err(ExplainerError::ConfigError(
                "top_n must be greater than 0".to_string(),
            ));
        }

        if self.primary_field.is_empty() || self.fallback_field.is_empty() {
            return Err(ExplainerError::ConfigError(
                "primary_field and fallback_field must not be empty".to_string(),
            ));
        }

        if self.backend == BackendKind::Local && self.local_root.is_none() {
            return Err(ExplainerError::ConfigError(
                "local_root is required when backend is 'local'".to_string(),
            ));
        }

        if self.backend == BackendKind::AwsCli && self.aws_cli_path.is_empty() {
            return Err(ExplainerError::ConfigError(
                "aws_cli_path must not be empty".to_string(),
            ));
        }

        if self.run_timeout_secs == Some(0) {
            return Err(ExplainerError::ConfigError(
                "run_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}
