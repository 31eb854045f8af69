//! Error types for the log explainer

use thiserror::Error;

/// Result type alias for explainer operations
pub type Result<T> = std::result::Result<T, ExplainerError>;

/// Error types that can occur while listing, fetching, or parsing log objects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplainerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Listing failed for s3://{bucket}/{prefix}: {message}")]
    Listing {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("No objects found in s3://{bucket}/{prefix}")]
    NoObjects { bucket: String, prefix: String },

    #[error("Fetch failed for key {key}: {message}")]
    Fetch { key: String, message: String },

    #[error("Could not decode {path}: {message}")]
    Decode { path: String, message: String },

    #[error("None of the {attempted} selected objects could be fetched")]
    NothingFetched { attempted: usize },

    #[error("Run deadline exceeded: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ExplainerError {
    fn from(err: std::io::Error) -> Self {
        ExplainerError::IoError(err.to_string())
    }
}

impl ExplainerError {
    /// Determine if this error ends the run
    ///
    /// Fetch and decode failures only remove one object from the totals.
    /// Everything else leaves nothing meaningful to report.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExplainerError::Fetch { .. } => false,
            ExplainerError::Decode { .. } => false,

            ExplainerError::ConfigError(_) => true,
            ExplainerError::Listing { .. } => true,
            ExplainerError::NoObjects { .. } => true,
            ExplainerError::NothingFetched { .. } => true,
            ExplainerError::Timeout(_) => true,
            ExplainerError::IoError(_) => true,
            ExplainerError::InternalError(_) => true,
        }
    }

    /// Process exit code for a run that ended with this error
    ///
    /// An empty listing is distinguished from a retrieval failure so that
    /// wrappers can tell "wrong prefix" apart from "no access".
    pub fn exit_code(&self) -> i32 {
        match self {
            ExplainerError::NoObjects { .. } => 2,
            _ => 1,
        }
    }

    /// Shell commands an operator can run to diagnose the failure
    pub fn remediation_hint(&self) -> Vec<String> {
        match self {
            ExplainerError::Listing { bucket, prefix, .. } => vec![
                "aws sts get-caller-identity".to_string(),
                format!("aws s3 ls s3://{}/{} --recursive | tail -n 20", bucket, prefix),
            ],
            ExplainerError::NoObjects { bucket, .. } => vec![format!(
                "aws s3 ls s3://{}/ --recursive | head",
                bucket
            )],
            ExplainerError::Fetch { .. } | ExplainerError::NothingFetched { .. } => {
                vec!["aws sts get-caller-identity".to_string()]
            }
            _ => Vec::new(),
        }
    }

    /// Create a Listing error for the given location
    pub fn listing(bucket: &str, prefix: &str, message: impl Into<String>) -> Self {
        ExplainerError::Listing {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message: message.into(),
        }
    }

    /// Create a Fetch error for the given key
    pub fn fetch(key: &str, message: impl Into<String>) -> Self {
        ExplainerError::Fetch {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create a Decode error for the given local path
    pub fn decode(path: impl AsRef<std::path::Path>, message: impl Into<String>) -> Self {
        ExplainerError::Decode {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }
}
