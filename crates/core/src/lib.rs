//! sb-core: Portable blob storage contract
//!
//! This crate provides the backend-independent pieces of s3blob:
//! - Bucket, Reader and Writer traits with normalized attribute types
//! - A small error taxonomy for backend failures
//! - Sequential pagination and convenience helpers
//! - A scheme registry for opening buckets from URLs
//! - Configuration, aliases and target path parsing
//!
//! Drivers (such as sb-s3) implement the traits; nothing here depends on a
//! storage SDK.

pub mod alias;
pub mod config;
pub mod error;
pub mod list;
pub mod ops;
pub mod path;
pub mod registry;
pub mod traits;

pub use alias::{Alias, AliasManager};
pub use config::{Config, ConfigManager};
pub use error::{BoxError, Error, ErrorCode, Result};
pub use list::ListIterator;
pub use path::{TargetPath, parse_target};
pub use registry::{BucketOpener, Registry};
pub use traits::{
    Attributes, Bucket, ListObject, ListOptions, ListPage, Raw, Reader, ReaderAttributes,
    ReaderOptions, RequestHook, SignedUrlOptions, Writer, WriterOptions,
};
