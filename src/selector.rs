//! Recency selection over listing order
//!
//! The "most recent" objects are taken as the trailing window of the listing.
//! That only tracks recency when keys sort chronologically, which holds for
//! CDN standard logs (their names embed `YYYY-MM-DD-HH`) but is not checked.
//! No metadata-based sorting is attempted.

use crate::models::LogObjectKey;

/// Pick the last `n` keys of `keys`
///
/// Returns the whole list when it has `n` or fewer entries and nothing when
/// `n <= 0`. Order is preserved.
pub fn select_latest(keys: &[LogObjectKey], n: i64) -> Vec<LogObjectKey> {
    if n <= 0 {
        return Vec::new();
    }
    let n = usize::try_from(n).unwrap_or(usize::MAX);
    let start = keys.len().saturating_sub(n);
    keys[start..].to_vec()
}
