//! Target path parsing
//!
//! A target names an object or prefix either through a full bucket URL
//! (`s3://bucket/key?region=us-east-1`) or through an alias
//! (`alias/key`). Keys are taken verbatim; no percent-decoding is applied.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// A parsed target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPath {
    /// Bucket URL (scheme, bucket and query, no path) plus key
    Url { bucket_url: String, key: String },
    /// Alias name plus key
    Alias { alias: String, key: String },
}

impl TargetPath {
    /// Object key or prefix (may be empty)
    pub fn key(&self) -> &str {
        match self {
            TargetPath::Url { key, .. } | TargetPath::Alias { key, .. } => key,
        }
    }

    /// Whether the key has directory semantics
    pub fn is_dir(&self) -> bool {
        let key = self.key();
        key.is_empty() || key.ends_with('/')
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPath::Url { bucket_url, key } => write!(f, "{bucket_url} {key}"),
            TargetPath::Alias { alias, key } => write!(f, "{alias}/{key}"),
        }
    }
}

/// Parse a target string
pub fn parse_target(path: &str) -> Result<TargetPath> {
    if path.is_empty() {
        return Err(Error::InvalidArgument("Path cannot be empty".into()));
    }

    if let Some((scheme, rest)) = path.split_once("://") {
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        let (bucket, key) = location.split_once('/').unwrap_or((location, ""));
        if bucket.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "URL '{path}' does not name a bucket"
            )));
        }

        let bucket_url = match query {
            Some(query) => format!("{scheme}://{bucket}?{query}"),
            None => format!("{scheme}://{bucket}"),
        };
        Url::parse(&bucket_url)?;

        return Ok(TargetPath::Url {
            bucket_url,
            key: key.to_string(),
        });
    }

    let (alias, key) = path.split_once('/').unwrap_or((path, ""));
    if !is_valid_alias_name(alias) {
        return Err(Error::InvalidArgument(format!(
            "Invalid path '{path}'. Use alias/key or scheme://bucket/key"
        )));
    }

    Ok(TargetPath::Alias {
        alias: alias.to_string(),
        key: key.to_string(),
    })
}

/// Check if a string is a valid alias name
fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
