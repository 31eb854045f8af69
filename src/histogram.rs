//! Outcome histogram shared by the parser, aggregator, and report

use crate::models::{is_target_label, Outcome, TARGET_OUTCOMES};
use std::collections::HashMap;

/// Mapping from outcome label to count
///
/// Counts only grow. Target and non-target labels live in the same map so
/// that merging is uniform across both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: HashMap<String, u64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of an outcome
    pub fn record(&mut self, outcome: &Outcome) {
        self.add(outcome.label(), 1);
    }

    /// Add `n` to the count for `label`
    pub fn add(&mut self, label: impl Into<String>, n: u64) {
        if n == 0 {
            return;
        }
        *self.counts.entry(label.into()).or_insert(0) += n;
    }

    /// Sum another histogram into this one
    ///
    /// Associative and commutative, so files can be merged in any order.
    pub fn merge(&mut self, other: &Histogram) {
        for (label, count) in &other.counts {
            self.add(label.clone(), *count);
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Sum of the three core categories
    pub fn core_total(&self) -> u64 {
        TARGET_OUTCOMES.iter().map(|label| self.get(label)).sum()
    }

    /// Sum of every label, core and other
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Labels outside the core categories with their counts, unordered
    pub fn others(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts
            .iter()
            .filter(|(label, _)| !is_target_label(label))
            .map(|(label, count)| (label.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, u64)> for Histogram {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for (label, count) in iter {
            histogram.add(label, count);
        }
        histogram
    }
}
