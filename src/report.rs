//! Human-readable cache outcome report
//!
//! Building and rendering a report is pure: it takes a [`Histogram`] value
//! and produces text, leaving printing to the caller.

use crate::histogram::Histogram;
use crate::models::TARGET_OUTCOMES;
use std::fmt;

/// Default length of the other-outcomes list
pub const DEFAULT_TOP_N: usize = 20;

/// Count and share of one core category
#[derive(Debug, Clone, PartialEq)]
pub struct CoreOutcome {
    pub label: &'static str,
    pub count: u64,
    /// Percentage of the core total, in `[0, 100]`
    pub percent: f64,
}

/// Summary computed from a final histogram
#[derive(Debug, Clone, PartialEq)]
pub struct CacheReport {
    /// Sum of Hit, Miss and RefreshHit
    pub core_total: u64,
    /// Sum of every label, including other outcomes and parsing notes
    pub total: u64,
    /// Core categories in fixed report order
    pub core: Vec<CoreOutcome>,
    /// Non-core labels by descending count, ties by label, truncated
    pub others: Vec<(String, u64)>,
    /// Limit applied to `others`
    pub top_n: usize,
}

/// `n` as a percentage of `d`, defined as 0 when `d` is 0
pub fn percent(n: u64, d: u64) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 * 100.0 / d as f64
    }
}

impl CacheReport {
    /// Compute the report, keeping at most `top_n` other outcomes
    pub fn from_histogram(histogram: &Histogram, top_n: usize) -> Self {
        let core_total = histogram.core_total();

        let core = TARGET_OUTCOMES
            .iter()
            .map(|label| {
                let count = histogram.get(label);
                CoreOutcome {
                    label,
                    count,
                    percent: percent(count, core_total),
                }
            })
            .collect();

        let mut others: Vec<(String, u64)> = histogram
            .others()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        others.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        others.truncate(top_n);

        CacheReport {
            core_total,
            total: histogram.total(),
            core,
            others,
            top_n,
        }
    }

    /// Count for a core category, 0 for anything else
    pub fn core_count(&self, label: &str) -> u64 {
        self.core
            .iter()
            .find(|c| c.label == label)
            .map_or(0, |c| c.count)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "=== CloudFront Cache Outcome Report (Standard Logs) ===")?;
        writeln!(f, "Core total (Hit/Miss/RefreshHit): {}", self.core_total)?;
        writeln!(f, "All counted lines/notes:          {}", self.total)?;
        writeln!(f)?;

        writeln!(f, "Core outcomes:")?;
        for outcome in &self.core {
            writeln!(
                f,
                "  {:<10} {:>8}   ({:.1}% of core)",
                outcome.label, outcome.count, outcome.percent
            )?;
        }

        if !self.others.is_empty() {
            writeln!(f)?;
            writeln!(f, "Other outcomes / parsing notes (top {}):", self.top_n)?;
            for (label, count) in &self.others {
                writeln!(f, "  {:<28} {:>8}", label, count)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Interpretation (ops):")?;
        writeln!(f, "  • High Hit% usually means lower latency & lower origin load.")?;
        writeln!(f, "  • High Miss% suggests caching policy mismatch, uncacheable headers,")?;
        writeln!(f, "    query-string/cookie variance, or origin Cache-Control behavior.")?;
        writeln!(
            f,
            "  • RefreshHit means CloudFront revalidated with origin and served cached content (often good)."
        )?;
        writeln!(f, "=======================================================")
    }
}
