//! Core data models for the log explainer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome labels reported as core categories, in report order
pub const TARGET_OUTCOMES: [&str; 3] = ["Hit", "Miss", "RefreshHit"];

/// Prefix applied to every non-target label when it is rolled into the histogram
pub const OTHER_PREFIX: &str = "Other:";

/// Note recorded for data lines that carry neither outcome column
pub const MISSING_OUTCOME: &str = "(missing_outcome)";

/// Note recorded for data lines seen before any `#Fields:` directive
pub const MISSING_FIELDS_HEADER: &str = "(missing_fields_header)";

/// Opaque key of one object in the store
///
/// Ordering between keys is whatever the store's listing returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogObjectKey(String);

impl LogObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        LogObjectKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is a directory marker rather than a real object
    pub fn is_directory_marker(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Last path segment of the key, or `"log"` when the key has none
    pub fn file_name(&self) -> &str {
        match self.0.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "log",
        }
    }
}

impl fmt::Display for LogObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogObjectKey {
    fn from(key: &str) -> Self {
        LogObjectKey::new(key)
    }
}

impl From<String> for LogObjectKey {
    fn from(key: String) -> Self {
        LogObjectKey(key)
    }
}

/// Classification of one data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One of [`TARGET_OUTCOMES`]
    Target(&'static str),
    /// Any other observed value, kept verbatim
    Other(String),
    /// Neither outcome column was present or non-empty
    Missing,
    /// The line appeared before the file declared its columns
    NoFieldsHeader,
}

impl Outcome {
    /// Classify an extracted outcome value
    ///
    /// Empty values count as missing. Matching against the target set is
    /// exact and case-sensitive.
    pub fn classify(value: &str) -> Self {
        if value.is_empty() {
            return Outcome::Missing;
        }
        match TARGET_OUTCOMES.iter().find(|target| **target == value) {
            Some(target) => Outcome::Target(target),
            None => Outcome::Other(value.to_string()),
        }
    }

    /// Histogram label this outcome is counted under
    pub fn label(&self) -> String {
        match self {
            Outcome::Target(name) => (*name).to_string(),
            Outcome::Other(value) => format!("{}{}", OTHER_PREFIX, value),
            Outcome::Missing => format!("{}{}", OTHER_PREFIX, MISSING_OUTCOME),
            Outcome::NoFieldsHeader => format!("{}{}", OTHER_PREFIX, MISSING_FIELDS_HEADER),
        }
    }
}

/// Whether a histogram label is one of the core categories
pub fn is_target_label(label: &str) -> bool {
    TARGET_OUTCOMES.contains(&label)
}
