//! Upload manager
//!
//! Consumes a stream of byte chunks and stores it as one object. Bodies that
//! fit in a single part go out as one PutObject; longer bodies use a
//! multipart upload, which is aborted on any failure or cancellation so no
//! orphaned parts are left behind.

use std::collections::HashMap;

use aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadInput;
use aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadInput;
use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadInput;
use aws_sdk_s3::operation::put_object::PutObjectInput;
use aws_sdk_s3::operation::upload_part::UploadPartInput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, StorageClass};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::api::S3Api;
use crate::error::S3Error;

/// Default part size: 5 MiB
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Part size in bytes
    pub part_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl UploadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part size; 0 keeps the default, other values are clamped
    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = if size == 0 {
            DEFAULT_PART_SIZE
        } else {
            size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        };
        self
    }
}

/// Request parameters of an upload
///
/// This is the value a `before_write` hook receives. It is applied to the
/// PutObject or CreateMultipartUpload request, whichever the upload ends up
/// using; `content_md5` only applies to PutObject.
#[derive(Debug, Clone, Default)]
pub struct UploadInput {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    /// Base64-encoded MD5 of the whole body
    pub content_md5: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub storage_class: Option<StorageClass>,
}

impl UploadInput {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    fn put_object(&self, body: Bytes) -> Result<PutObjectInput, S3Error> {
        let length = body.len() as i64;
        Ok(PutObjectInput::builder()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(body))
            .content_length(length)
            .set_content_type(self.content_type.clone())
            .set_cache_control(self.cache_control.clone())
            .set_content_disposition(self.content_disposition.clone())
            .set_content_encoding(self.content_encoding.clone())
            .set_content_language(self.content_language.clone())
            .set_content_md5(self.content_md5.clone())
            .set_metadata(self.metadata.clone())
            .set_storage_class(self.storage_class.clone())
            .build()?)
    }

    fn create_multipart_upload(&self) -> Result<CreateMultipartUploadInput, S3Error> {
        Ok(CreateMultipartUploadInput::builder()
            .bucket(&self.bucket)
            .key(&self.key)
            .set_content_type(self.content_type.clone())
            .set_cache_control(self.cache_control.clone())
            .set_content_disposition(self.content_disposition.clone())
            .set_content_encoding(self.content_encoding.clone())
            .set_content_language(self.content_language.clone())
            .set_metadata(self.metadata.clone())
            .set_storage_class(self.storage_class.clone())
            .build()?)
    }
}

/// Splits a chunk stream into parts of `part_size` bytes
///
/// One chunk beyond the current part is read ahead so that a body of
/// exactly one part is recognized as complete.
struct PartReader<S> {
    body: S,
    pending: BytesMut,
    part_size: usize,
    eof: bool,
}

impl<S> PartReader<S>
where
    S: Stream<Item = Bytes> + Unpin,
{
    fn new(body: S, part_size: u64) -> Self {
        Self {
            body,
            pending: BytesMut::new(),
            part_size: usize::try_from(part_size).unwrap_or(usize::MAX),
            eof: false,
        }
    }

    async fn next_part(&mut self) -> Option<Bytes> {
        while !self.eof && self.pending.len() <= self.part_size {
            match self.body.next().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None => self.eof = true,
            }
        }
        if self.pending.is_empty() {
            return None;
        }
        let n = self.pending.len().min(self.part_size);
        Some(self.pending.split_to(n).freeze())
    }

    fn is_finished(&self) -> bool {
        self.eof && self.pending.is_empty()
    }
}

#[derive(Default)]
struct UploadState {
    /// Set while a multipart upload exists that has not been completed
    upload_id: Option<String>,
}

/// Upload `body` as one object
///
/// Returns once the object is durable or the upload has failed. Cancelling
/// `cancel` stops the upload with [`S3Error::Canceled`].
pub async fn upload<S>(
    api: &dyn S3Api,
    input: UploadInput,
    config: UploadConfig,
    body: S,
    cancel: CancellationToken,
) -> Result<(), S3Error>
where
    S: Stream<Item = Bytes> + Unpin + Send,
{
    let mut state = UploadState::default();

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(S3Error::Canceled),
        result = run(api, &input, &config, body, &mut state) => result,
    };

    if let Err(e) = &result {
        tracing::debug!(bucket = %input.bucket, key = %input.key, error = %e, "upload failed");
        if let Some(upload_id) = state.upload_id.take() {
            abort(api, &input, upload_id).await;
        }
    }
    result
}

async fn run<S>(
    api: &dyn S3Api,
    input: &UploadInput,
    config: &UploadConfig,
    body: S,
    state: &mut UploadState,
) -> Result<(), S3Error>
where
    S: Stream<Item = Bytes> + Unpin + Send,
{
    let mut parts = PartReader::new(body, config.part_size);
    let first = parts.next_part().await.unwrap_or_default();

    if parts.is_finished() {
        tracing::debug!(bucket = %input.bucket, key = %input.key, size = first.len(), "PutObject");
        api.put_object(input.put_object(first)?).await?;
        return Ok(());
    }

    let created = api
        .create_multipart_upload(input.create_multipart_upload()?)
        .await?;
    let upload_id = created.upload_id.ok_or_else(|| {
        S3Error::InvalidRequest("CreateMultipartUpload returned no upload id".to_string())
    })?;
    state.upload_id = Some(upload_id.clone());
    tracing::debug!(bucket = %input.bucket, key = %input.key, %upload_id, "multipart upload started");

    let mut completed = Vec::new();
    let mut next = Some(first);
    while let Some(data) = next {
        let part_number = completed.len() + 1;
        if part_number > MAX_PARTS {
            return Err(S3Error::InvalidRequest(format!(
                "upload exceeds {MAX_PARTS} parts of {} bytes",
                config.part_size
            )));
        }
        let part_number = part_number as i32;

        let request = UploadPartInput::builder()
            .bucket(&input.bucket)
            .key(&input.key)
            .upload_id(&upload_id)
            .part_number(part_number)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data))
            .build()?;
        let output = api.upload_part(request).await?;
        completed.push(
            CompletedPart::builder()
                .set_e_tag(output.e_tag)
                .part_number(part_number)
                .build(),
        );

        next = parts.next_part().await;
    }

    let parts_count = completed.len();
    let request = CompleteMultipartUploadInput::builder()
        .bucket(&input.bucket)
        .key(&input.key)
        .upload_id(&upload_id)
        .multipart_upload(
            CompletedMultipartUpload::builder()
                .set_parts(Some(completed))
                .build(),
        )
        .build()?;
    api.complete_multipart_upload(request).await?;
    state.upload_id = None;
    tracing::debug!(bucket = %input.bucket, key = %input.key, parts = parts_count, "multipart upload completed");

    Ok(())
}

async fn abort(api: &dyn S3Api, input: &UploadInput, upload_id: String) {
    let request = AbortMultipartUploadInput::builder()
        .bucket(&input.bucket)
        .key(&input.key)
        .upload_id(&upload_id)
        .build();
    let result = match request {
        Ok(request) => api.abort_multipart_upload(request).await.map(|_| ()),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        tracing::warn!(%upload_id, key = %input.key, error = %e, "failed to abort multipart upload");
    }
}
