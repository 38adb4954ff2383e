//! In-memory S3 for tests
//!
//! Stores objects in a sorted map and emulates the parts of S3 the driver
//! relies on: ranged GETs with `Content-Range`, ListObjectsV2 with
//! delimiters and continuation tokens, and multipart uploads. ETags are
//! quoted 32-digit hex for single PUTs and carry a `-<parts>` suffix for
//! multipart uploads; they are not real MD5s.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::operation::abort_multipart_upload::{
    AbortMultipartUploadInput, AbortMultipartUploadOutput,
};
use aws_sdk_s3::operation::complete_multipart_upload::{
    CompleteMultipartUploadInput, CompleteMultipartUploadOutput,
};
use aws_sdk_s3::operation::create_multipart_upload::{
    CreateMultipartUploadInput, CreateMultipartUploadOutput,
};
use aws_sdk_s3::operation::delete_object::{DeleteObjectInput, DeleteObjectOutput};
use aws_sdk_s3::operation::get_object::{GetObjectInput, GetObjectOutput};
use aws_sdk_s3::operation::head_object::{HeadObjectInput, HeadObjectOutput};
use aws_sdk_s3::operation::list_objects_v2::{ListObjectsV2Input, ListObjectsV2Output};
use aws_sdk_s3::operation::put_object::{PutObjectInput, PutObjectOutput};
use aws_sdk_s3::operation::upload_part::{UploadPartInput, UploadPartOutput};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{CommonPrefix, Object, StorageClass};
use bytes::{Bytes, BytesMut};

use crate::api::S3Api;
use crate::error::S3Error;

#[derive(Debug, Clone, Default)]
pub(crate) struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_md5: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub storage_class: Option<StorageClass>,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Calls {
    pub head_object: usize,
    pub get_object: usize,
    pub list_objects_v2: usize,
    pub delete_object: usize,
    pub put_object: usize,
    pub create_multipart_upload: usize,
    pub upload_part: usize,
    pub complete_multipart_upload: usize,
    pub abort_multipart_upload: usize,
}

struct PendingUpload {
    key: String,
    object: StoredObject,
    parts: BTreeMap<i32, Bytes>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    uploads: HashMap<String, PendingUpload>,
    next_upload: u64,
    fail_put: Option<S3Error>,
    fail_parts_after: Option<i32>,
    calls: Calls,
}

#[derive(Default)]
pub(crate) struct MemoryS3 {
    state: Mutex<State>,
}

fn fake_etag(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}{:016x}", hasher.finish(), data.len())
}

fn now() -> DateTime {
    DateTime::from_secs(1_700_000_000)
}

fn no_such_key() -> S3Error {
    S3Error::service("NoSuchKey", "The specified key does not exist.")
}

/// Parse `bytes=<start>-[<end>]` against an object of `size` bytes
fn parse_range(range: &str, size: u64) -> Result<(u64, u64), S3Error> {
    let invalid = || S3Error::service("InvalidRange", "The requested range is not satisfiable");
    let spec = range.strip_prefix("bytes=").ok_or_else(invalid)?;
    let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
    let start: u64 = start.parse().map_err(|_| invalid())?;
    if start >= size {
        return Err(invalid());
    }
    let end = match end {
        "" => size - 1,
        end => end.parse::<u64>().map_err(|_| invalid())?.min(size - 1),
    };
    Ok((start, end))
}

async fn collect(body: ByteStream) -> Result<Bytes, S3Error> {
    body.collect()
        .await
        .map(|data| data.into_bytes())
        .map_err(|e| S3Error::InvalidRequest(e.to_string()))
}

impl MemoryS3 {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        let data = Bytes::copy_from_slice(data);
        let object = StoredObject {
            etag: format!("\"{}\"", fake_etag(&data)),
            data,
            ..Default::default()
        };
        self.state().objects.insert(key.to_string(), object);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state().objects.get(key).map(|o| o.data.clone())
    }

    pub fn stored(&self, key: &str) -> Option<StoredObject> {
        self.state().objects.get(key).cloned()
    }

    pub fn calls(&self) -> Calls {
        self.state().calls
    }

    pub fn pending_uploads(&self) -> usize {
        self.state().uploads.len()
    }

    /// Fail every PutObject with `err`
    pub fn fail_put(&self, err: S3Error) {
        self.state().fail_put = Some(err);
    }

    /// Fail every UploadPart with a part number above `n`
    pub fn fail_parts_after(&self, n: i32) {
        self.state().fail_parts_after = Some(n);
    }
}

#[async_trait]
impl S3Api for MemoryS3 {
    async fn head_object(&self, input: HeadObjectInput) -> Result<HeadObjectOutput, S3Error> {
        let mut state = self.state();
        state.calls.head_object += 1;
        let key = input.key.unwrap_or_default();
        let object = state
            .objects
            .get(&key)
            .ok_or_else(|| S3Error::service("NotFound", "Not Found"))?;

        Ok(HeadObjectOutput::builder()
            .content_length(object.data.len() as i64)
            .e_tag(&object.etag)
            .last_modified(now())
            .set_content_type(object.content_type.clone())
            .set_cache_control(object.cache_control.clone())
            .set_content_disposition(object.content_disposition.clone())
            .set_content_encoding(object.content_encoding.clone())
            .set_content_language(object.content_language.clone())
            .set_metadata(object.metadata.clone())
            .build())
    }

    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error> {
        let mut state = self.state();
        state.calls.get_object += 1;
        let key = input.key.unwrap_or_default();
        let object = state.objects.get(&key).ok_or_else(no_such_key)?;
        let size = object.data.len() as u64;

        let mut output = GetObjectOutput::builder()
            .e_tag(&object.etag)
            .last_modified(now())
            .set_content_type(object.content_type.clone());
        let data = match input.range.as_deref() {
            Some(range) => {
                let (start, end) = parse_range(range, size)?;
                output = output.content_range(format!("bytes {start}-{end}/{size}"));
                object.data.slice(start as usize..=end as usize)
            }
            None => object.data.clone(),
        };

        Ok(output
            .content_length(data.len() as i64)
            .body(ByteStream::from(data))
            .build())
    }

    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, S3Error> {
        let mut state = self.state();
        state.calls.list_objects_v2 += 1;
        let prefix = input.prefix.unwrap_or_default();
        let delimiter = input.delimiter.filter(|d| !d.is_empty());
        let max_keys = input.max_keys.unwrap_or(1000).max(1) as usize;
        let after = input.continuation_token;
        if after.as_deref() == Some("") {
            return Err(S3Error::service(
                "InvalidArgument",
                "The continuation token provided is incorrect",
            ));
        }

        // every entry, objects and common prefixes alike, in key order
        let mut prefixes = BTreeSet::new();
        let mut entries: Vec<(String, bool)> = Vec::new();
        for key in state.objects.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match delimiter.as_deref().and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    let common = format!("{prefix}{}", &rest[..end]);
                    if prefixes.insert(common.clone()) {
                        entries.push((common, true));
                    }
                }
                None => entries.push((key.clone(), false)),
            }
        }
        entries.sort();

        let remaining: Vec<_> = entries
            .into_iter()
            .filter(|(name, _)| after.as_ref().is_none_or(|after| name > after))
            .collect();
        let truncated = remaining.len() > max_keys;
        let page = &remaining[..remaining.len().min(max_keys)];

        let mut output = ListObjectsV2Output::builder()
            .key_count(page.len() as i32)
            .is_truncated(truncated);
        for (name, is_prefix) in page {
            if *is_prefix {
                output = output.common_prefixes(CommonPrefix::builder().prefix(name).build());
            } else if let Some(object) = state.objects.get(name) {
                output = output.contents(
                    Object::builder()
                        .key(name)
                        .size(object.data.len() as i64)
                        .e_tag(&object.etag)
                        .last_modified(now())
                        .build(),
                );
            }
        }
        if truncated {
            if let Some((last, _)) = page.last() {
                output = output.next_continuation_token(last);
            }
        }
        Ok(output.build())
    }

    async fn delete_object(
        &self,
        input: DeleteObjectInput,
    ) -> Result<DeleteObjectOutput, S3Error> {
        let mut state = self.state();
        state.calls.delete_object += 1;
        state.objects.remove(&input.key.unwrap_or_default());
        Ok(DeleteObjectOutput::builder().build())
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error> {
        self.state().calls.put_object += 1;
        let data = collect(input.body).await?;

        let mut state = self.state();
        if let Some(err) = state.fail_put.clone() {
            return Err(err);
        }
        let etag = format!("\"{}\"", fake_etag(&data));
        let object = StoredObject {
            data,
            etag: etag.clone(),
            content_type: input.content_type,
            cache_control: input.cache_control,
            content_disposition: input.content_disposition,
            content_encoding: input.content_encoding,
            content_language: input.content_language,
            content_md5: input.content_md5,
            metadata: input.metadata,
            storage_class: input.storage_class,
        };
        state.objects.insert(input.key.unwrap_or_default(), object);
        Ok(PutObjectOutput::builder().e_tag(etag).build())
    }

    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, S3Error> {
        let mut state = self.state();
        state.calls.create_multipart_upload += 1;
        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);

        let key = input.key.unwrap_or_default();
        let upload = PendingUpload {
            key: key.clone(),
            object: StoredObject {
                content_type: input.content_type,
                cache_control: input.cache_control,
                content_disposition: input.content_disposition,
                content_encoding: input.content_encoding,
                content_language: input.content_language,
                metadata: input.metadata,
                storage_class: input.storage_class,
                ..Default::default()
            },
            parts: BTreeMap::new(),
        };
        state.uploads.insert(upload_id.clone(), upload);

        Ok(CreateMultipartUploadOutput::builder()
            .key(key)
            .upload_id(upload_id)
            .build())
    }

    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, S3Error> {
        self.state().calls.upload_part += 1;
        let data = collect(input.body).await?;
        let part_number = input.part_number.unwrap_or_default();

        let mut state = self.state();
        if state.fail_parts_after.is_some_and(|n| part_number > n) {
            return Err(S3Error::service("InternalError", "We encountered an internal error."));
        }
        let upload_id = input.upload_id.unwrap_or_default();
        let upload = state
            .uploads
            .get_mut(&upload_id)
            .ok_or_else(|| S3Error::service("NoSuchUpload", "The specified upload does not exist."))?;
        upload.parts.insert(part_number, data);

        Ok(UploadPartOutput::builder()
            .e_tag(format!("\"part-{part_number}\""))
            .build())
    }

    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        let mut state = self.state();
        state.calls.complete_multipart_upload += 1;
        let upload_id = input.upload_id.unwrap_or_default();
        let upload = state
            .uploads
            .remove(&upload_id)
            .ok_or_else(|| S3Error::service("NoSuchUpload", "The specified upload does not exist."))?;

        let listed = input
            .multipart_upload
            .and_then(|m| m.parts)
            .unwrap_or_default();
        let mut data = BytesMut::new();
        for part in &listed {
            let number = part.part_number.unwrap_or_default();
            let bytes = upload
                .parts
                .get(&number)
                .ok_or_else(|| S3Error::service("InvalidPart", format!("part {number} missing")))?;
            data.extend_from_slice(bytes);
        }

        let data = data.freeze();
        let etag = format!("\"{}-{}\"", fake_etag(&data), listed.len());
        let object = StoredObject {
            data,
            etag: etag.clone(),
            ..upload.object
        };
        state.objects.insert(upload.key.clone(), object);

        Ok(CompleteMultipartUploadOutput::builder()
            .key(upload.key)
            .e_tag(etag)
            .build())
    }

    async fn abort_multipart_upload(
        &self,
        input: AbortMultipartUploadInput,
    ) -> Result<AbortMultipartUploadOutput, S3Error> {
        let mut state = self.state();
        state.calls.abort_multipart_upload += 1;
        state.uploads.remove(&input.upload_id.unwrap_or_default());
        Ok(AbortMultipartUploadOutput::builder().build())
    }

    async fn presign_get_object(
        &self,
        input: GetObjectInput,
        expires_in: Duration,
    ) -> Result<String, S3Error> {
        Ok(format!(
            "https://{}.s3.memory/{}?X-Amz-Expires={}",
            input.bucket.unwrap_or_default(),
            input.key.unwrap_or_default(),
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=10-14", 27).unwrap(), (10, 14));
        assert_eq!(parse_range("bytes=10-", 27).unwrap(), (10, 26));
        assert_eq!(parse_range("bytes=20-99", 27).unwrap(), (20, 26));
        assert!(parse_range("bytes=27-", 27).is_err());
    }
}
