//! The S3 operations the driver uses
//!
//! `S3Api` takes and returns the SDK's own input and output structs, so the
//! driver, the upload manager and the request hooks all work with native
//! types. `aws_sdk_s3::Client` is the production implementation; tests swap
//! in an in-memory S3 or a mock.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
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
use aws_sdk_s3::presigning::PresigningConfig;

use crate::error::S3Error;

/// S3 calls issued by the driver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait S3Api: Send + Sync {
    async fn head_object(&self, input: HeadObjectInput) -> Result<HeadObjectOutput, S3Error>;

    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error>;

    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, S3Error>;

    async fn delete_object(&self, input: DeleteObjectInput)
    -> Result<DeleteObjectOutput, S3Error>;

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error>;

    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, S3Error>;

    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, S3Error>;

    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, S3Error>;

    async fn abort_multipart_upload(
        &self,
        input: AbortMultipartUploadInput,
    ) -> Result<AbortMultipartUploadOutput, S3Error>;

    /// Sign a GET request locally; no network call is made
    async fn presign_get_object(
        &self,
        input: GetObjectInput,
        expires_in: Duration,
    ) -> Result<String, S3Error>;
}

#[async_trait]
impl S3Api for Client {
    async fn head_object(&self, input: HeadObjectInput) -> Result<HeadObjectOutput, S3Error> {
        self.head_object()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_version_id(input.version_id)
            .set_part_number(input.part_number)
            .set_request_payer(input.request_payer)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error> {
        self.get_object()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_range(input.range)
            .set_version_id(input.version_id)
            .set_if_match(input.if_match)
            .set_if_none_match(input.if_none_match)
            .set_part_number(input.part_number)
            .set_response_content_type(input.response_content_type)
            .set_response_content_disposition(input.response_content_disposition)
            .set_request_payer(input.request_payer)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, S3Error> {
        self.list_objects_v2()
            .set_bucket(input.bucket)
            .set_prefix(input.prefix)
            .set_delimiter(input.delimiter)
            .set_max_keys(input.max_keys)
            .set_continuation_token(input.continuation_token)
            .set_start_after(input.start_after)
            .set_fetch_owner(input.fetch_owner)
            .set_encoding_type(input.encoding_type)
            .set_optional_object_attributes(input.optional_object_attributes)
            .set_request_payer(input.request_payer)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn delete_object(
        &self,
        input: DeleteObjectInput,
    ) -> Result<DeleteObjectOutput, S3Error> {
        self.delete_object()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_version_id(input.version_id)
            .set_request_payer(input.request_payer)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error> {
        self.put_object()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .body(input.body)
            .set_content_length(input.content_length)
            .set_content_md5(input.content_md5)
            .set_content_type(input.content_type)
            .set_cache_control(input.cache_control)
            .set_content_disposition(input.content_disposition)
            .set_content_encoding(input.content_encoding)
            .set_content_language(input.content_language)
            .set_metadata(input.metadata)
            .set_storage_class(input.storage_class)
            .set_acl(input.acl)
            .set_server_side_encryption(input.server_side_encryption)
            .set_tagging(input.tagging)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, S3Error> {
        self.create_multipart_upload()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_content_type(input.content_type)
            .set_cache_control(input.cache_control)
            .set_content_disposition(input.content_disposition)
            .set_content_encoding(input.content_encoding)
            .set_content_language(input.content_language)
            .set_metadata(input.metadata)
            .set_storage_class(input.storage_class)
            .set_acl(input.acl)
            .set_server_side_encryption(input.server_side_encryption)
            .set_tagging(input.tagging)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, S3Error> {
        self.upload_part()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_upload_id(input.upload_id)
            .set_part_number(input.part_number)
            .set_content_length(input.content_length)
            .set_content_md5(input.content_md5)
            .body(input.body)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        self.complete_multipart_upload()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_upload_id(input.upload_id)
            .set_multipart_upload(input.multipart_upload)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn abort_multipart_upload(
        &self,
        input: AbortMultipartUploadInput,
    ) -> Result<AbortMultipartUploadOutput, S3Error> {
        self.abort_multipart_upload()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_upload_id(input.upload_id)
            .set_expected_bucket_owner(input.expected_bucket_owner)
            .send()
            .await
            .map_err(S3Error::from_sdk)
    }

    async fn presign_get_object(
        &self,
        input: GetObjectInput,
        expires_in: Duration,
    ) -> Result<String, S3Error> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| S3Error::InvalidRequest(e.to_string()))?;
        let request = self
            .get_object()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_version_id(input.version_id)
            .set_response_content_type(input.response_content_type)
            .set_response_content_disposition(input.response_content_disposition)
            .presigned(config)
            .await
            .map_err(S3Error::from_sdk)?;
        Ok(request.uri().to_string())
    }
}
