//! Object catalog: complete key listing under a prefix

use crate::error::Result;
use crate::models::LogObjectKey;
use crate::store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Lists every object key under a bucket prefix, following pagination
pub struct ObjectCatalog {
    store: Arc<dyn ObjectStore>,
}

impl ObjectCatalog {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        ObjectCatalog { store }
    }

    /// List all keys under `prefix`
    ///
    /// Pages are requested until the store stops returning a continuation
    /// token and are concatenated in the order received. Directory markers
    /// (keys ending in `/`) are dropped.
    ///
    /// # Returns
    /// * `Ok(Vec<LogObjectKey>)` in listing order, possibly empty
    /// * `Err(ExplainerError::Listing)` if any page request fails
    pub async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<LogObjectKey>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .list_page(bucket, prefix, continuation.as_deref())
                .await?;
            pages += 1;

            debug!(
                "Listing page {} for s3://{}/{}: {} keys, more={}",
                pages,
                bucket,
                prefix,
                page.keys.len(),
                page.next.is_some()
            );

            keys.extend(page.keys.into_iter().filter(|k| !k.is_directory_marker()));

            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        info!(
            "Listed {} objects in s3://{}/{} across {} pages",
            keys.len(),
            bucket,
            prefix,
            pages
        );
        Ok(keys)
    }
}
