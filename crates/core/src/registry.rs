//! Bucket openers keyed by URL scheme
//!
//! Drivers register an opener for their scheme at startup, e.g.
//! `sb_s3::register(&mut registry)`, and callers open buckets from URLs
//! such as `s3://my-bucket?region=us-east-1`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};
use crate::traits::Bucket;

/// Opens a bucket from a URL of one scheme
#[async_trait]
pub trait BucketOpener: Send + Sync {
    async fn open_bucket(&self, url: &Url) -> Result<Arc<dyn Bucket>>;
}

/// Scheme to opener map
#[derive(Default)]
pub struct Registry {
    openers: HashMap<String, Arc<dyn BucketOpener>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `opener` for `scheme`; each scheme may be registered once
    pub fn register(
        &mut self,
        scheme: impl Into<String>,
        opener: Arc<dyn BucketOpener>,
    ) -> Result<()> {
        let scheme = scheme.into();
        if self.openers.contains_key(&scheme) {
            return Err(Error::Config(format!(
                "scheme '{scheme}' is already registered"
            )));
        }
        self.openers.insert(scheme, opener);
        Ok(())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.openers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Open the bucket a URL points at
    pub async fn open(&self, url: &str) -> Result<Arc<dyn Bucket>> {
        let url = Url::parse(url)?;
        let opener = self
            .openers
            .get(url.scheme())
            .ok_or_else(|| Error::UnknownScheme(url.scheme().to_string()))?;
        tracing::debug!(scheme = url.scheme(), "opening bucket");
        opener.open_bucket(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingOpener;

    #[async_trait]
    impl BucketOpener for RejectingOpener {
        async fn open_bucket(&self, url: &Url) -> Result<Arc<dyn Bucket>> {
            Err(Error::Config(format!("cannot open {}", url.host_str().unwrap_or(""))))
        }
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = Registry::new();
        registry.register("mem", Arc::new(RejectingOpener)).unwrap();
        let result = registry.register("mem", Arc::new(RejectingOpener));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_schemes_sorted() {
        let mut registry = Registry::new();
        registry.register("s3", Arc::new(RejectingOpener)).unwrap();
        registry.register("mem", Arc::new(RejectingOpener)).unwrap();
        assert_eq!(registry.schemes(), vec!["mem", "s3"]);
    }

    #[tokio::test]
    async fn test_open_dispatches_by_scheme() {
        let mut registry = Registry::new();
        registry.register("mem", Arc::new(RejectingOpener)).unwrap();

        let err = registry.open("mem://bucket").await.err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: cannot open bucket");

        let err = registry.open("gs://bucket").await.err().unwrap();
        assert!(matches!(err, Error::UnknownScheme(ref s) if s == "gs"));

        let err = registry.open("not a url").await.err().unwrap();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
