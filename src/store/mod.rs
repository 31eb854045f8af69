//! Object store backends
//!
//! The pipeline consumes exactly two capabilities from a store: paginated
//! listing under a prefix and downloading one object to a local path. Both
//! are expressed by [`ObjectStore`] so that the rest of the crate never
//! depends on a particular store's wire protocol.
//!
//! - [`AwsCliStore`]: drives the AWS CLI, which owns credentials and signing
//! - [`LocalStore`]: serves a local directory tree as if it were a bucket

use crate::error::Result;
use crate::models::LogObjectKey;
use async_trait::async_trait;
use std::path::Path;

pub mod aws_cli;
pub mod local;

pub use aws_cli::AwsCliStore;
pub use local::LocalStore;

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in the order the store returned them
    pub keys: Vec<LogObjectKey>,
    /// Token to request the next page, `None` on the last page
    pub next: Option<String>,
}

impl ListPage {
    pub fn last(keys: Vec<LogObjectKey>) -> Self {
        ListPage { keys, next: None }
    }
}

/// Minimal object store capability used by the catalog and fetcher
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`
    ///
    /// `continuation` is the `next` token of the previous page, or `None` for
    /// the first page. Errors are reported as
    /// [`ExplainerError::Listing`](crate::error::ExplainerError::Listing).
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage>;

    /// Download one object to `dest` and return the number of bytes written
    ///
    /// The parent directory of `dest` already exists. Errors are reported as
    /// [`ExplainerError::Fetch`](crate::error::ExplainerError::Fetch).
    async fn get(&self, bucket: &str, key: &LogObjectKey, dest: &Path) -> Result<u64>;
}
