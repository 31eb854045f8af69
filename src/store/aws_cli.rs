//! Object store backed by the AWS CLI
//!
//! Listing uses `aws s3api list-objects-v2` with `--max-items` /
//! `--starting-token` so that pagination is visible to the catalog. Fetching
//! uses `aws s3 cp`. Credentials, regions and request signing are entirely
//! the CLI's concern.

use crate::error::{ExplainerError, Result};
use crate::models::LogObjectKey;
use crate::store::{ListPage, ObjectStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// `list-objects-v2 --output json` response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ListObjectsOutput {
    #[serde(rename = "Contents", default)]
    contents: Vec<ObjectEntry>,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    #[serde(rename = "Key")]
    key: String,
}

/// [`ObjectStore`] that shells out to the `aws` executable
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    program: String,
    page_size: usize,
}

impl AwsCliStore {
    /// Create a store using `program` as the CLI executable
    ///
    /// # Arguments
    /// * `program` - Name or path of the AWS CLI (usually `"aws"`)
    /// * `page_size` - Keys requested per listing call
    pub fn new(program: impl Into<String>, page_size: usize) -> Self {
        AwsCliStore {
            program: program.into(),
            page_size: page_size.max(1),
        }
    }

    /// Run the CLI and return stdout, turning every failure into a message
    ///
    /// The child is killed if the returned future is dropped, e.g. when the
    /// run deadline passes mid-download.
    async fn run(&self, args: &[String]) -> std::result::Result<String, String> {
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .env("AWS_PAGER", "")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    format!(
                        "Command not found. Install AWS CLI v2 and ensure '{}' is on PATH.",
                        self.program
                    )
                } else {
                    format!("Failed to start {}: {}", self.program, e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let detail = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                format!("exit status {}", output.status)
            };
            return Err(format!("Command failed: {} {}\n{}", self.program, args.join(" "), detail));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list_args(&self, bucket: &str, prefix: &str, continuation: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "s3api".to_string(),
            "list-objects-v2".to_string(),
            "--bucket".to_string(),
            bucket.to_string(),
            "--output".to_string(),
            "json".to_string(),
            "--max-items".to_string(),
            self.page_size.to_string(),
        ];
        if !prefix.is_empty() {
            args.push("--prefix".to_string());
            args.push(prefix.to_string());
        }
        if let Some(token) = continuation {
            args.push("--starting-token".to_string());
            args.push(token.to_string());
        }
        args
    }
}

/// Parse the JSON printed by `aws s3api list-objects-v2`
///
/// An empty listing makes the CLI print nothing at all, which is treated as
/// an empty final page.
pub(crate) fn parse_list_output(stdout: &str) -> serde_json::Result<ListPage> {
    if stdout.trim().is_empty() {
        return Ok(ListPage::default());
    }

    let parsed: ListObjectsOutput = serde_json::from_str(stdout)?;
    Ok(ListPage {
        keys: parsed
            .contents
            .into_iter()
            .map(|entry| LogObjectKey::new(entry.key))
            .collect(),
        next: parsed.next_token.filter(|token| !token.is_empty()),
    })
}

#[async_trait]
impl ObjectStore for AwsCliStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let args = self.list_args(bucket, prefix, continuation);
        let stdout = self
            .run(&args)
            .await
            .map_err(|message| ExplainerError::listing(bucket, prefix, message))?;

        parse_list_output(&stdout).map_err(|e| {
            warn!("Unparseable listing output for s3://{}/{}: {}", bucket, prefix, e);
            ExplainerError::listing(bucket, prefix, format!("Unparseable listing output: {}", e))
        })
    }

    async fn get(&self, bucket: &str, key: &LogObjectKey, dest: &Path) -> Result<u64> {
        let args = vec![
            "s3".to_string(),
            "cp".to_string(),
            format!("s3://{}/{}", bucket, key),
            dest.display().to_string(),
            "--only-show-errors".to_string(),
        ];
        self.run(&args)
            .await
            .map_err(|message| ExplainerError::fetch(key.as_str(), message))?;

        let metadata = tokio::fs::metadata(dest).await.map_err(|e| {
            ExplainerError::fetch(key.as_str(), format!("Downloaded file missing: {}", e))
        })?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_output_with_token() {
        let stdout = r#"{
            "Contents": [
                {"Key": "cf/E1.2025-12-29-10.a.gz", "Size": 120},
                {"Key": "cf/E1.2025-12-29-11.b.gz", "Size": 98}
            ],
            "NextToken": "eyJDb250aW51YXRpb25Ub2tlbiI6IG51bGx9"
        }"#;
        let page = parse_list_output(stdout).unwrap();
        assert_eq!(page.keys.len(), 2);
        assert_eq!(page.keys[0].as_str(), "cf/E1.2025-12-29-10.a.gz");
        assert_eq!(page.next.as_deref(), Some("eyJDb250aW51YXRpb25Ub2tlbiI6IG51bGx9"));
    }

    #[test]
    fn test_parse_list_output_last_page() {
        let page = parse_list_output(r#"{"Contents": [{"Key": "a.gz"}]}"#).unwrap();
        assert_eq!(page.keys, vec![LogObjectKey::new("a.gz")]);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_parse_list_output_empty() {
        assert_eq!(parse_list_output("").unwrap(), ListPage::default());
        assert_eq!(parse_list_output("{}").unwrap(), ListPage::default());
    }

    #[test]
    fn test_parse_list_output_invalid() {
        assert!(parse_list_output("not json").is_err());
    }

    #[test]
    fn test_list_args_include_prefix_and_token() {
        let store = AwsCliStore::new("aws", 500);
        let args = store.list_args("logs", "cf/", Some("tok"));
        assert!(args.windows(2).any(|w| w[0] == "--prefix" && w[1] == "cf/"));
        assert!(args.windows(2).any(|w| w[0] == "--starting-token" && w[1] == "tok"));
        assert!(args.windows(2).any(|w| w[0] == "--max-items" && w[1] == "500"));

        let args = store.list_args("logs", "", None);
        assert!(!args.contains(&"--prefix".to_string()));
        assert!(!args.contains(&"--starting-token".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_download_kills_cli() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("finished");
        let script = dir.path().join("fake-aws");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nsleep 2\ntouch '{}'\n", marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = AwsCliStore::new(script.display().to_string(), 10);
        let dest = dir.path().join("E1.gz");
        let key = LogObjectKey::new("cf/E1.gz");
        let result =
            tokio::time::timeout(Duration::from_millis(300), store.get("logs", &key, &dest)).await;
        assert!(result.is_err(), "download should still be running");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "CLI kept running after the download was abandoned");
    }

    #[tokio::test]
    async fn test_missing_binary_is_listing_error() {
        let store = AwsCliStore::new("definitely-not-an-aws-cli-binary", 10);
        let err = store.list_page("logs", "cf/", None).await.unwrap_err();
        match err {
            ExplainerError::Listing { bucket, prefix, message } => {
                assert_eq!(bucket, "logs");
                assert_eq!(prefix, "cf/");
                assert!(message.contains("Command not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
