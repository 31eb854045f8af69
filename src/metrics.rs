//! Run statistics for the explainer
//!
//! Counters are atomics so that concurrent fetch/parse workers can record
//! into a shared collector without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for one run
#[derive(Debug, Default)]
pub struct RunMetrics {
    // Discovery
    objects_listed: AtomicU64,
    objects_selected: AtomicU64,

    // Retrieval
    objects_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    bytes_fetched: AtomicU64,

    // Parsing
    objects_parsed: AtomicU64,
    decode_failures: AtomicU64,
    data_lines: AtomicU64,

    // Latency (stored as microseconds)
    total_fetch_duration_us: AtomicU64,
    total_parse_duration_us: AtomicU64,
}

/// Snapshot of run metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub objects_listed: u64,
    pub objects_selected: u64,
    pub objects_fetched: u64,
    pub fetch_failures: u64,
    pub bytes_fetched: u64,
    pub objects_parsed: u64,
    pub decode_failures: u64,
    pub data_lines: u64,
    pub total_fetch_duration_us: u64,
    pub total_parse_duration_us: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of the listing and of the selected window
    pub fn record_listing(&self, listed: usize, selected: usize) {
        self.objects_listed.store(listed as u64, Ordering::Relaxed);
        self.objects_selected.store(selected as u64, Ordering::Relaxed);
    }

    /// Record a download attempt
    ///
    /// # Arguments
    /// * `bytes` - Bytes written, or `None` if the download failed
    /// * `duration` - Time spent on the attempt
    pub fn record_fetch(&self, bytes: Option<u64>, duration: Duration) {
        match bytes {
            Some(bytes) => {
                self.objects_fetched.fetch_add(1, Ordering::Relaxed);
                self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
            }
            None => {
                self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.total_fetch_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a parse attempt
    ///
    /// # Arguments
    /// * `data_lines` - Lines counted, or `None` if the file could not be decoded
    /// * `duration` - Time spent parsing
    pub fn record_parse(&self, data_lines: Option<u64>, duration: Duration) {
        match data_lines {
            Some(lines) => {
                self.objects_parsed.fetch_add(1, Ordering::Relaxed);
                self.data_lines.fetch_add(lines, Ordering::Relaxed);
            }
            None => {
                self.decode_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.total_parse_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Fields are read independently; a snapshot taken while workers are
    /// still running may mix values from slightly different moments.
    pub fn get_stats(&self) -> RunStats {
        RunStats {
            objects_listed: self.objects_listed.load(Ordering::Relaxed),
            objects_selected: self.objects_selected.load(Ordering::Relaxed),
            objects_fetched: self.objects_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
            objects_parsed: self.objects_parsed.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            data_lines: self.data_lines.load(Ordering::Relaxed),
            total_fetch_duration_us: self.total_fetch_duration_us.load(Ordering::Relaxed),
            total_parse_duration_us: self.total_parse_duration_us.load(Ordering::Relaxed),
        }
    }
}

impl RunStats {
    /// Fraction of selected objects that made it into the totals, in `[0, 1]`
    pub fn coverage(&self) -> f64 {
        if self.objects_selected == 0 {
            0.0
        } else {
            self.objects_parsed as f64 / self.objects_selected as f64
        }
    }

    /// Average download time per attempt
    pub fn avg_fetch_duration(&self) -> Duration {
        let attempts = self.objects_fetched + self.fetch_failures;
        if attempts == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.total_fetch_duration_us / attempts)
        }
    }
}
