//! Opening S3 buckets from URLs
//!
//! `s3://<bucket>?region=..&endpoint=..&disableSSL=true&s3ForcePathStyle=true`
//!
//! The URL host is the bucket name. Credentials come from the default AWS
//! provider chain.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use sb_core::{Bucket, BucketOpener, Error, Registry, Result};
use url::Url;

use crate::bucket::S3Bucket;

/// URL scheme handled by this driver
pub const SCHEME: &str = "s3";

/// Client settings taken from a bucket URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    /// Host name or full URL of an S3-compatible endpoint
    pub endpoint: Option<String>,
    /// Use plain HTTP for a host-only endpoint
    pub disable_ssl: bool,
    pub force_path_style: bool,
}

impl S3Config {
    /// Parse the bucket and query options of an `s3://` URL
    pub fn from_url(url: &Url) -> Result<Self> {
        if url.scheme() != SCHEME {
            return Err(Error::UnknownScheme(url.scheme().to_string()));
        }
        let bucket = url.host_str().unwrap_or_default();
        if bucket.is_empty() {
            return Err(Error::InvalidArgument(format!("URL '{url}' has no bucket name")));
        }

        let mut config = S3Config {
            bucket: bucket.to_string(),
            ..Default::default()
        };
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "region" => config.region = Some(value.into_owned()),
                "endpoint" => config.endpoint = Some(value.into_owned()),
                "disableSSL" => config.disable_ssl = value == "true",
                "s3ForcePathStyle" => config.force_path_style = value == "true",
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown query parameter '{other}' in bucket URL"
                    )));
                }
            }
        }
        Ok(config)
    }

    /// Endpoint URL with a scheme, if an endpoint was given
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?;
        if endpoint.contains("://") {
            return Some(endpoint.to_string());
        }
        let scheme = if self.disable_ssl { "http" } else { "https" };
        Some(format!("{scheme}://{endpoint}"))
    }

    /// Build an SDK client for these settings
    pub async fn client(&self) -> aws_sdk_s3::Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = self.endpoint_url() {
            loader = loader.endpoint_url(endpoint);
        } else if self.disable_ssl {
            tracing::debug!("disableSSL has no effect without an endpoint");
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .build();
        aws_sdk_s3::Client::from_conf(s3_config)
    }
}

/// Opener for `s3://` URLs
#[derive(Debug, Default)]
pub struct S3Opener;

#[async_trait]
impl BucketOpener for S3Opener {
    async fn open_bucket(&self, url: &Url) -> Result<Arc<dyn Bucket>> {
        let config = S3Config::from_url(url)?;
        tracing::debug!(
            bucket = %config.bucket,
            region = ?config.region,
            endpoint = ?config.endpoint,
            "opening S3 bucket"
        );
        let client = config.client().await;
        let bucket = S3Bucket::open(client, config.bucket)?;
        Ok(Arc::new(bucket))
    }
}

/// Register the S3 opener under the `s3` scheme
pub fn register(registry: &mut Registry) -> Result<()> {
    registry.register(SCHEME, Arc::new(S3Opener))
}
