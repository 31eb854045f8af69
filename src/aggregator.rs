//! Run-wide aggregation of per-file outcome counts

use crate::histogram::Histogram;
use crate::parser::FileSummary;

/// Owns the run histogram while files are being merged into it
///
/// Merging is a plain per-label sum, so the order in which files finish does
/// not affect the totals. Lines duplicated across objects are counted as
/// many times as they appear.
#[derive(Debug, Default)]
pub struct OutcomeAggregator {
    histogram: Histogram,
    files: usize,
    data_lines: u64,
}

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's counts into the run totals
    pub fn absorb(&mut self, summary: &FileSummary) {
        self.histogram.merge(&summary.histogram);
        self.data_lines += summary.data_lines;
        self.files += 1;
    }

    /// Number of files absorbed so far
    pub fn files(&self) -> usize {
        self.files
    }

    pub fn data_lines(&self) -> u64 {
        self.data_lines
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Hand the final histogram to the report
    pub fn finish(self) -> Histogram {
        self.histogram
    }
}
