//! CDN Log Explainer
//!
//! Counts CDN cache outcomes (Hit / Miss / RefreshHit) from standard access
//! logs held in an object store, and reports their share of all cacheable
//! requests.
//!
//! # Overview
//!
//! A run lists the log objects under a bucket prefix, takes the most recent
//! few, downloads them to a scratch directory, and streams each one through
//! a parser that learns the column layout from the file's own `#Fields:`
//! directive. Per-file counts are merged into a single histogram which is
//! rendered as a text report.
//!
//! ```text
//! ObjectCatalog → select_latest → ObjectFetcher → LogParser → OutcomeAggregator → CacheReport
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cdn_log_explainer::{Explainer, ExplainerConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExplainerConfig {
//!     bucket: "my-cf-logs".to_string(),
//!     prefix: "cloudfront/".to_string(),
//!     latest: 5,
//!     ..Default::default()
//! };
//!
//! let outcome = Explainer::from_config(config)?.run().await?;
//! println!("{}", outcome.report);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Listing failures and an empty listing end the run. A download or decode
//! failure only removes that object from the totals and is returned in
//! [`RunOutcome::failures`]. Data lines the parser cannot classify are not
//! errors: they show up in the report as `Other:(missing_fields_header)` or
//! `Other:(missing_outcome)`.
//!
//! # Limitations
//!
//! "Most recent" means the tail of the listing, which is lexicographic. This
//! matches recency for CDN standard logs, whose names embed the hour, but
//! not for arbitrary key layouts. Entries duplicated across objects are
//! counted once per appearance.

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod histogram;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod selector;
pub mod store;

// Re-export commonly used types
pub use aggregator::OutcomeAggregator;
pub use catalog::ObjectCatalog;
pub use config::{BackendKind, ExplainerConfig};
pub use error::{ExplainerError, Result};
pub use fetcher::{FetchBatch, FetchResult, FetchedObject, ObjectFetcher};
pub use histogram::Histogram;
pub use metrics::{RunMetrics, RunStats};
pub use models::{LogObjectKey, Outcome, TARGET_OUTCOMES};
pub use parser::{FieldIndex, FileSummary, LogParser};
pub use pipeline::{Analysis, Discovery, Explainer, RunOutcome};
pub use report::CacheReport;
pub use selector::select_latest;
pub use store::{AwsCliStore, ListPage, LocalStore, ObjectStore};
