//! Bucket, Reader and Writer contracts
//!
//! These traits define the uniform blob storage operations. Drivers such as
//! sb-s3 implement them; callers only depend on this crate.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Default expiry for signed URLs
pub const DEFAULT_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Backend-specific value carried next to a normalized one
///
/// Use [`Raw::downcast_ref`] with the driver's concrete type; it returns
/// `None` when the payload is of a different type.
#[derive(Clone)]
pub struct Raw(Arc<dyn Any + Send + Sync>);

impl Raw {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an already shared value without cloning it
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).is::<T>()
    }
}

impl fmt::Debug for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Raw(..)")
    }
}

/// Hook that may mutate the backend-native request before it is sent
///
/// The request is passed as `&mut dyn Any`; downcast it to the driver's
/// input type (for S3: `ListObjectsV2Input`, `GetObjectInput` or
/// `sb_s3::UploadInput`). Returning an error aborts the operation.
#[derive(Clone)]
pub struct RequestHook(Arc<dyn Fn(&mut dyn Any) -> Result<()> + Send + Sync>);

impl RequestHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&mut dyn Any) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, request: &mut dyn Any) -> Result<()> {
        (self.0)(request)
    }
}

impl fmt::Debug for RequestHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestHook(..)")
    }
}

/// Normalized object attributes
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,

    /// User metadata; key case follows the backend's convention
    pub metadata: HashMap<String, String>,

    /// Last modification time
    pub mod_time: Option<Timestamp>,

    /// Size in bytes
    pub size: u64,

    /// MD5 of the content, absent when the backend cannot prove it
    pub md5: Option<Vec<u8>>,

    /// Raw backend response
    pub raw: Option<Raw>,
}

/// Attributes fixed when a reader is opened
#[derive(Debug, Clone, Default)]
pub struct ReaderAttributes {
    pub content_type: Option<String>,
    pub mod_time: Option<Timestamp>,

    /// Size of the whole object, not of the requested range
    pub size: u64,
}

/// One entry of a listing page
#[derive(Debug, Clone, Default)]
pub struct ListObject {
    /// Object key, or the shared prefix for a virtual directory
    pub key: String,

    /// Size in bytes (0 for directories)
    pub size: u64,

    pub mod_time: Option<Timestamp>,

    pub md5: Option<Vec<u8>>,

    /// Whether this entry is a virtual directory
    pub is_dir: bool,

    pub raw: Option<Raw>,
}

impl ListObject {
    /// Create a virtual directory entry
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_dir: true,
            ..Default::default()
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries, sorted by key
    pub objects: Vec<ListObject>,

    /// Opaque token for the next page; `None` when the listing is exhausted
    pub next_page_token: Option<Vec<u8>>,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only list keys starting with this prefix
    pub prefix: String,

    /// Group keys sharing a prefix up to this delimiter into directories.
    /// Empty means a flat listing.
    pub delimiter: String,

    /// Maximum entries per page; 0 selects the driver default
    pub page_size: usize,

    /// Token from a previous page; `None` requests the first page
    pub page_token: Option<Vec<u8>>,

    pub before_list: Option<RequestHook>,
}

/// Options for range readers
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub before_read: Option<RequestHook>,
}

/// Options for writers
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    pub content_type: Option<String>,

    /// Upload part size in bytes; 0 selects the driver default
    pub buffer_size: usize,

    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,

    /// Precomputed MD5 of the full content, checked by the backend
    pub content_md5: Option<Vec<u8>>,

    pub metadata: HashMap<String, String>,

    pub before_write: Option<RequestHook>,

    /// Cancelling this token aborts the in-flight upload
    pub cancel: Option<CancellationToken>,
}

/// Options for signed URLs
#[derive(Debug, Clone)]
pub struct SignedUrlOptions {
    pub expiry: Duration,
}

impl Default for SignedUrlOptions {
    fn default() -> Self {
        Self {
            expiry: DEFAULT_SIGNED_URL_EXPIRY,
        }
    }
}

/// Sequential reader over a byte range of one object
///
/// Dropping the reader releases the underlying response; `close` does the
/// same and reports any error.
pub trait Reader: AsyncRead + Send + Unpin {
    fn attributes(&self) -> &ReaderAttributes;

    /// Raw backend response
    fn raw(&self) -> Option<&Raw>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Single-use sink for one object
///
/// Nothing is durable until `close` returns `Ok`. Dropping a writer without
/// closing it abandons the upload.
#[async_trait]
pub trait Writer: Send {
    /// Append bytes; may wait while the backend catches up
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Finish the upload and return its outcome
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A bucket of blobs
///
/// Implementations are shared read-only across tasks.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Fetch object attributes
    async fn attributes(&self, key: &str) -> Result<Attributes>;

    /// Open a reader at `offset`; `length` of `None` reads to the end
    ///
    /// A `length` of `Some(0)` still fetches one byte at `offset` to learn the
    /// object size, so it fails on a zero-byte object.
    async fn new_range_reader(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
        opts: &ReaderOptions,
    ) -> Result<Box<dyn Reader>>;

    /// Open a writer for `key`
    async fn new_writer(&self, key: &str, opts: WriterOptions) -> Result<Box<dyn Writer>>;

    /// Fetch one page of a listing
    async fn list_page(&self, opts: &ListOptions) -> Result<ListPage>;

    /// Delete an object; fails with `NotFound` if it does not exist
    async fn delete(&self, key: &str) -> Result<()>;

    /// Produce a time-limited URL for reading `key`
    async fn signed_url(&self, key: &str, opts: &SignedUrlOptions) -> Result<String>;

    /// Backend client handle
    fn raw_client(&self) -> Raw;
}
