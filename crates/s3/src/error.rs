//! S3 error type and its classification
//!
//! `S3Error` is cloneable so that the terminal error of an upload can be
//! handed to every writer call that observes it.

use std::sync::Arc;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use sb_core::ErrorCode;
use thiserror::Error;

type SharedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by S3 calls
#[derive(Error, Debug, Clone)]
pub enum S3Error {
    /// The service answered with an error code
    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// The request did not produce a service response
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The operation was cancelled before it completed
    #[error("request canceled")]
    Canceled,
}

impl S3Error {
    /// Service error with a code and message
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        S3Error::Service {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Convert an SDK error, keeping it as the source
    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let code = err
            .as_service_error()
            .and_then(|e| e.code())
            .map(str::to_owned)
            .or_else(|| match err.raw_response().map(|r| r.status().as_u16()) {
                // HEAD responses carry no body, so there is no code to parse
                Some(404) => Some("NotFound".to_string()),
                _ => None,
            });
        let message = err
            .as_service_error()
            .and_then(|e| e.message())
            .map(str::to_owned)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        let source: SharedSource = Arc::new(err);

        match code {
            Some(code) => S3Error::Service {
                code,
                message,
                source: Some(source),
            },
            None => S3Error::Transport {
                message,
                source: Some(source),
            },
        }
    }

    /// S3 error code, when the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The underlying SDK error, for callers needing backend-specific detail
    pub fn sdk_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            S3Error::Service { source, .. } | S3Error::Transport { source, .. } => {
                source.as_deref()
            }
            _ => None,
        }
    }
}

impl From<BuildError> for S3Error {
    fn from(err: BuildError) -> Self {
        S3Error::InvalidRequest(err.to_string())
    }
}

/// Classify an S3 error into the portable taxonomy
pub fn error_code(err: &S3Error) -> ErrorCode {
    match err.code() {
        Some("NoSuchKey") | Some("NotFound") => ErrorCode::NotFound,
        _ => ErrorCode::Unknown,
    }
}

impl From<S3Error> for sb_core::Error {
    fn from(err: S3Error) -> Self {
        sb_core::Error::backend(error_code(&err), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_not_found() {
        assert_eq!(
            error_code(&S3Error::service("NoSuchKey", "The specified key does not exist.")),
            ErrorCode::NotFound
        );
        assert_eq!(
            error_code(&S3Error::service("NotFound", "Not Found")),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_error_code_unknown() {
        assert_eq!(
            error_code(&S3Error::service("AccessDenied", "Access Denied")),
            ErrorCode::Unknown
        );
        assert_eq!(
            error_code(&S3Error::service("NoSuchBucket", "no bucket")),
            ErrorCode::Unknown
        );
        assert_eq!(error_code(&S3Error::Canceled), ErrorCode::Unknown);
        assert_eq!(
            error_code(&S3Error::InvalidRequest("bad".into())),
            ErrorCode::Unknown
        );
    }

    #[test]
    fn test_into_core_error_keeps_source() {
        let err: sb_core::Error = S3Error::service("NoSuchKey", "missing").into();
        assert!(err.is_not_found());

        let s3 = err.downcast_ref::<S3Error>().unwrap();
        assert_eq!(s3.code(), Some("NoSuchKey"));
        assert_eq!(err.to_string(), "not found: NoSuchKey: missing");
    }

    #[test]
    fn test_display() {
        assert_eq!(S3Error::Canceled.to_string(), "request canceled");
        assert_eq!(
            S3Error::service("SlowDown", "Please reduce your request rate.").to_string(),
            "SlowDown: Please reduce your request rate."
        );
    }
}
