//! S3 implementation of the Bucket contract

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::operation::delete_object::DeleteObjectInput;
use aws_sdk_s3::operation::get_object::GetObjectInput;
use aws_sdk_s3::operation::head_object::HeadObjectInput;
use sb_core::{
    Attributes, Bucket, Error, ListOptions, ListPage, Raw, Reader, ReaderOptions, Result,
    SignedUrlOptions, Writer, WriterOptions,
};
use tokio_util::sync::CancellationToken;

use crate::api::S3Api;
use crate::attrs::attributes_from_head;
use crate::error::S3Error;
use crate::upload::{UploadConfig, UploadInput};
use crate::writer::S3Writer;
use crate::{list, reader};

/// Longest expiry S3 accepts for a presigned URL
pub const MAX_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A bucket backed by S3
///
/// Immutable after construction and cheap to share behind an `Arc`.
pub struct S3Bucket {
    name: String,
    api: Arc<dyn S3Api>,
    raw: Raw,
}

impl S3Bucket {
    /// Bucket `name` accessed through an SDK client
    pub fn open(client: aws_sdk_s3::Client, name: impl Into<String>) -> Result<Self> {
        let raw = Raw::new(client.clone());
        Self::build(Arc::new(client), raw, name.into())
    }

    /// Bucket `name` accessed through any [`S3Api`] implementation
    pub fn with_api<A: S3Api + 'static>(api: Arc<A>, name: impl Into<String>) -> Result<Self> {
        let raw = Raw::from_arc(Arc::clone(&api) as Arc<dyn Any + Send + Sync>);
        Self::build(api, raw, name.into())
    }

    fn build(api: Arc<dyn S3Api>, raw: Raw, name: String) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("bucket name is required".into()));
        }
        Ok(Self { name, api, raw })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SDK client, when the bucket was opened with one
    pub fn client(&self) -> Option<&aws_sdk_s3::Client> {
        self.raw.downcast_ref()
    }

    fn upload_input(&self, key: &str, opts: &WriterOptions) -> UploadInput {
        UploadInput {
            content_type: opts.content_type.clone(),
            cache_control: opts.cache_control.clone(),
            content_disposition: opts.content_disposition.clone(),
            content_encoding: opts.content_encoding.clone(),
            content_language: opts.content_language.clone(),
            content_md5: opts
                .content_md5
                .as_deref()
                .map(aws_smithy_types::base64::encode),
            metadata: (!opts.metadata.is_empty()).then(|| opts.metadata.clone()),
            ..UploadInput::new(&self.name, key)
        }
    }
}

#[async_trait]
impl Bucket for S3Bucket {
    async fn attributes(&self, key: &str) -> Result<Attributes> {
        tracing::debug!(bucket = %self.name, key, "HeadObject");
        let input = HeadObjectInput::builder()
            .bucket(&self.name)
            .key(key)
            .build()
            .map_err(S3Error::from)?;
        let head = self.api.head_object(input).await?;
        Ok(attributes_from_head(head))
    }

    async fn new_range_reader(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
        opts: &ReaderOptions,
    ) -> Result<Box<dyn Reader>> {
        let mut input = reader::build_request(&self.name, key, offset, length)?;
        if let Some(hook) = &opts.before_read {
            hook.call(&mut input)?;
        }
        tracing::debug!(bucket = %self.name, key, range = ?input.range, "GetObject");
        let reader = reader::open(self.api.as_ref(), input, length).await?;
        Ok(Box::new(reader))
    }

    async fn new_writer(&self, key: &str, opts: WriterOptions) -> Result<Box<dyn Writer>> {
        let mut input = self.upload_input(key, &opts);
        if let Some(hook) = &opts.before_write {
            hook.call(&mut input)?;
        }
        let config = UploadConfig::new().part_size(opts.buffer_size as u64);
        let cancel = opts
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        tracing::debug!(bucket = %self.name, key, part_size = config.part_size, "opening writer");

        Ok(Box::new(S3Writer::new(
            Arc::clone(&self.api),
            input,
            config,
            cancel,
        )))
    }

    async fn list_page(&self, opts: &ListOptions) -> Result<ListPage> {
        let mut input = list::build_request(&self.name, opts)?;
        if let Some(hook) = &opts.before_list {
            hook.call(&mut input)?;
        }
        tracing::debug!(
            bucket = %self.name,
            prefix = ?input.prefix,
            delimiter = ?input.delimiter,
            "ListObjectsV2"
        );
        Ok(list::send(self.api.as_ref(), input).await?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // S3 reports success for missing keys; check first so the caller gets NotFound
        self.attributes(key).await?;

        tracing::debug!(bucket = %self.name, key, "DeleteObject");
        let input = DeleteObjectInput::builder()
            .bucket(&self.name)
            .key(key)
            .build()
            .map_err(S3Error::from)?;
        self.api.delete_object(input).await?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, opts: &SignedUrlOptions) -> Result<String> {
        if opts.expiry.is_zero() || opts.expiry > MAX_SIGNED_URL_EXPIRY {
            return Err(Error::InvalidArgument(format!(
                "signed URL expiry must be between 1s and {}s",
                MAX_SIGNED_URL_EXPIRY.as_secs()
            )));
        }
        let input = GetObjectInput::builder()
            .bucket(&self.name)
            .key(key)
            .build()
            .map_err(S3Error::from)?;
        Ok(self.api.presign_get_object(input, opts.expiry).await?)
    }

    fn raw_client(&self) -> Raw {
        self.raw.clone()
    }
}
