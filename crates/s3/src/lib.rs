//! sb-s3: S3 driver for the s3blob storage contract
//!
//! This crate implements the sb-core Bucket, Reader and Writer traits on
//! top of aws-sdk-s3. It is the only crate that directly depends on the
//! AWS SDK.
//!
//! Backend-specific values are reachable through `Raw`:
//! - `Bucket::raw_client`: `aws_sdk_s3::Client`
//! - `Attributes::raw`: `HeadObjectOutput`
//! - `Reader::raw`: `GetObjectOutput` (body detached)
//! - `ListObject::raw`: `types::Object`, or `types::CommonPrefix` for directories
//! - errors: `sb_core::Error::downcast_ref::<S3Error>()`
//!
//! Request hooks receive `ListObjectsV2Input`, `GetObjectInput` or
//! [`UploadInput`].

pub mod api;
pub mod attrs;
pub mod bucket;
pub mod error;
pub mod list;
pub mod opener;
pub mod reader;
pub mod upload;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use api::S3Api;
pub use attrs::etag_to_md5;
pub use bucket::S3Bucket;
pub use error::{S3Error, error_code};
pub use opener::{S3Config, S3Opener, register};
pub use reader::S3Reader;
pub use upload::{UploadConfig, UploadInput};
pub use writer::S3Writer;
