//! End-to-end runs against the local store backend

use async_trait::async_trait;
use cdn_log_explainer::{
    BackendKind, Explainer, ExplainerConfig, ExplainerError, ListPage, LocalStore,
    LogObjectKey, ObjectStore,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const HEADER: &str = "#Version: 1.0\n#Fields: date time x-edge-location sc-bytes c-ip cs-method x-edge-result-type x-edge-response-result-type\n";

fn line(outcome: &str) -> String {
    format!("2025-12-29\t12:00:01\tIAD89-C1\t1045\t192.0.2.10\tGET\t{}\t{}\n", outcome, outcome)
}

fn log_text(outcomes: &[&str]) -> String {
    let mut text = HEADER.to_string();
    for outcome in outcomes {
        text.push_str(&line(outcome));
    }
    text
}

fn write_plain(root: &Path, key: &str, text: &str) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn write_gz(root: &Path, key: &str, text: &str) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn local_config(root: &Path, scratch: &Path) -> ExplainerConfig {
    ExplainerConfig {
        bucket: "cf-logs".to_string(),
        prefix: "cf/".to_string(),
        backend: BackendKind::Local,
        local_root: Some(root.to_path_buf()),
        scratch_dir: Some(scratch.to_path_buf()),
        ..Default::default()
    }
}

fn scratch_entries(scratch: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(scratch).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            for inner in std::fs::read_dir(&path).unwrap() {
                found.push(inner.unwrap().path());
            }
        }
        found.push(path);
    }
    found
}

/// Wraps a store and fails downloads of selected keys
struct FlakyStore {
    inner: LocalStore,
    failing: Vec<String>,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> cdn_log_explainer::Result<ListPage> {
        self.inner.list_page(bucket, prefix, continuation).await
    }

    async fn get(
        &self,
        bucket: &str,
        key: &LogObjectKey,
        dest: &Path,
    ) -> cdn_log_explainer::Result<u64> {
        if self.failing.iter().any(|k| k == key.as_str()) {
            return Err(ExplainerError::fetch(key.as_str(), "simulated 503 SlowDown"));
        }
        self.inner.get(bucket, key, dest).await
    }
}

/// Store whose downloads never finish in time
struct StalledStore {
    inner: LocalStore,
}

#[async_trait]
impl ObjectStore for StalledStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> cdn_log_explainer::Result<ListPage> {
        self.inner.list_page(bucket, prefix, continuation).await
    }

    async fn get(
        &self,
        _bucket: &str,
        _key: &LogObjectKey,
        _dest: &Path,
    ) -> cdn_log_explainer::Result<u64> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }
}

#[tokio::test]
async fn test_gzip_and_plain_objects_end_to_end() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_gz(
        root.path(),
        "cf/E1.2025-12-29-10.aaaa.gz",
        &log_text(&["Hit", "Hit", "Miss", "Hit"]),
    );
    write_plain(
        root.path(),
        "cf/E1.2025-12-29-11.bbbb",
        &log_text(&["RefreshHit", "Error", "RefreshHit"]),
    );

    let explainer = Explainer::from_config(local_config(root.path(), scratch.path())).unwrap();
    let outcome = explainer.run().await.unwrap();

    assert_eq!(outcome.discovery.listed, 2);
    assert_eq!(outcome.discovery.selected.len(), 2);
    assert!(outcome.failures.is_empty());

    let report = &outcome.report;
    assert_eq!(report.core_total, 6);
    assert_eq!(report.core_count("Hit"), 3);
    assert_eq!(report.core_count("Miss"), 1);
    assert_eq!(report.core_count("RefreshHit"), 2);
    assert_eq!(report.others, vec![("Other:Error".to_string(), 1)]);

    let text = report.render();
    assert!(text.contains("(50.0% of core)"));
    assert!(text.contains("(16.7% of core)"));
    assert!(text.contains("(33.3% of core)"));

    assert_eq!(outcome.stats.objects_fetched, 2);
    assert_eq!(outcome.stats.objects_parsed, 2);
    assert_eq!(outcome.stats.data_lines, 7);
}

#[tokio::test]
async fn test_only_latest_objects_are_analyzed() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/2025-12-27.log", &log_text(&["Miss"]));
    write_plain(root.path(), "cf/2025-12-28.log", &log_text(&["Hit"]));
    write_plain(root.path(), "cf/2025-12-29.log", &log_text(&["Hit"]));

    let mut config = local_config(root.path(), scratch.path());
    config.latest = 2;
    let explainer = Explainer::from_config(config).unwrap();

    let discovery = explainer.discover().await.unwrap();
    assert_eq!(discovery.listed, 3);
    assert_eq!(
        discovery.selected,
        vec![
            LogObjectKey::new("cf/2025-12-28.log"),
            LogObjectKey::new("cf/2025-12-29.log"),
        ]
    );

    let analysis = explainer.analyze(&discovery.selected).await.unwrap();
    assert_eq!(analysis.histogram.get("Hit"), 2);
    assert_eq!(analysis.histogram.get("Miss"), 0);
    assert_eq!(analysis.parsed, discovery.selected);
}

#[tokio::test]
async fn test_scratch_files_removed_unless_kept() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit"]));

    let explainer = Explainer::from_config(local_config(root.path(), scratch.path())).unwrap();
    let outcome = explainer.run().await.unwrap();
    assert!(outcome.kept_dir.is_none());
    assert!(scratch_entries(scratch.path()).is_empty());

    let mut config = local_config(root.path(), scratch.path());
    config.keep = true;
    let outcome = Explainer::from_config(config).unwrap().run().await.unwrap();
    let kept = outcome.kept_dir.expect("scratch dir should be kept");
    assert!(kept.starts_with(scratch.path()));
    assert_eq!(std::fs::read_dir(&kept).unwrap().count(), 1);
}

#[tokio::test]
async fn test_fetch_failure_is_isolated() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit", "Hit"]));
    write_plain(root.path(), "cf/b.log", &log_text(&["Miss"]));
    write_plain(root.path(), "cf/c.log", &log_text(&["Hit"]));

    let store = Arc::new(FlakyStore {
        inner: LocalStore::new(root.path(), 100),
        failing: vec!["cf/b.log".to_string()],
    });
    let explainer = Explainer::new(local_config(root.path(), scratch.path()), store);

    let outcome = explainer.run().await.unwrap();
    assert_eq!(outcome.report.core_count("Hit"), 3);
    assert_eq!(outcome.report.core_count("Miss"), 0);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        &outcome.failures[0],
        ExplainerError::Fetch { key, .. } if key == "cf/b.log"
    ));
    assert_eq!(outcome.stats.fetch_failures, 1);
    assert!((outcome.stats.coverage() - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_all_fetches_failing_is_fatal() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit"]));

    let store = Arc::new(FlakyStore {
        inner: LocalStore::new(root.path(), 100),
        failing: vec!["cf/a.log".to_string()],
    });
    let explainer = Explainer::new(local_config(root.path(), scratch.path()), store);

    let err = explainer.run().await.unwrap_err();
    assert_eq!(err, ExplainerError::NothingFetched { attempted: 1 });
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_corrupt_archive_contributes_nothing() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit"]));

    // Valid gzip header followed by garbage, so decoding fails part-way.
    let mut bytes = vec![0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];
    bytes.extend_from_slice(b"this is not a deflate stream at all");
    let path = root.path().join("cf/b.log.gz");
    std::fs::write(path, bytes).unwrap();

    let explainer = Explainer::from_config(local_config(root.path(), scratch.path())).unwrap();
    let outcome = explainer.run().await.unwrap();

    assert_eq!(outcome.report.core_count("Hit"), 1);
    assert_eq!(outcome.report.total, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(outcome.failures[0], ExplainerError::Decode { .. }));
    assert_eq!(outcome.stats.decode_failures, 1);
}

#[tokio::test]
async fn test_empty_listing_exit_code() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "elsewhere/a.log", &log_text(&["Hit"]));

    let explainer = Explainer::from_config(local_config(root.path(), scratch.path())).unwrap();
    let err = explainer.run().await.unwrap_err();
    assert!(matches!(err, ExplainerError::NoObjects { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let config = local_config(&root.path().join("missing"), scratch.path());

    let err = Explainer::from_config(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, ExplainerError::Listing { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!err.remediation_hint().is_empty());
}

#[tokio::test]
async fn test_zero_latest_still_reports() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit"]));

    let mut config = local_config(root.path(), scratch.path());
    config.latest = 0;
    let outcome = Explainer::from_config(config).unwrap().run().await.unwrap();
    assert!(outcome.discovery.selected.is_empty());
    assert_eq!(outcome.report.core_total, 0);
    assert!(outcome.report.render().contains("(0.0% of core)"));
}

#[tokio::test]
async fn test_run_deadline() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(root.path(), "cf/a.log", &log_text(&["Hit"]));

    let mut config = local_config(root.path(), scratch.path());
    config.run_timeout_secs = Some(1);
    let store = Arc::new(StalledStore {
        inner: LocalStore::new(root.path(), 100),
    });

    let err = Explainer::new(config, store).run().await.unwrap_err();
    assert!(matches!(err, ExplainerError::Timeout(_)));
}

#[tokio::test]
async fn test_files_with_different_layouts() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    write_plain(
        root.path(),
        "cf/a.log",
        "#Fields: x-edge-result-type c-ip\nHit\t192.0.2.1\n",
    );
    write_plain(
        root.path(),
        "cf/b.log",
        "#Fields: c-ip sc-status x-edge-result-type\n192.0.2.2\t200\tMiss\n",
    );
    write_plain(root.path(), "cf/c.log", "192.0.2.3\t200\tHit\n");

    let explainer = Explainer::from_config(local_config(root.path(), scratch.path())).unwrap();
    let outcome = explainer.run().await.unwrap();

    assert_eq!(outcome.report.core_count("Hit"), 1);
    assert_eq!(outcome.report.core_count("Miss"), 1);
    assert_eq!(
        outcome.report.others,
        vec![("Other:(missing_fields_header)".to_string(), 1)]
    );
}
