//! Error types for sb-core
//!
//! Backend failures are classified into a small, portable taxonomy
//! ([`ErrorCode`]) while keeping the driver's own error reachable for
//! callers that need backend-specific detail.

use std::fmt;

use thiserror::Error;

/// Result type alias for sb-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a storage driver
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Portable classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The key or object does not exist
    NotFound,
    /// Any other backend-reported fault
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::NotFound => f.write_str("not found"),
            ErrorCode::Unknown => f.write_str("unknown"),
        }
    }
}

/// Error types for sb-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Classified failure reported by a storage backend
    #[error("{code}: {source}")]
    Backend {
        code: ErrorCode,
        #[source]
        source: BoxError,
    },

    /// Caller supplied an invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file or bucket URL error
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No opener registered for a URL scheme
    #[error("No bucket opener registered for scheme '{0}'")]
    UnknownScheme(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Wrap a driver error with its classification
    pub fn backend(code: ErrorCode, source: impl Into<BoxError>) -> Self {
        Error::Backend {
            code,
            source: source.into(),
        }
    }

    /// Portable error code; anything that did not come from a backend is `Unknown`
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Backend { code, .. } => *code,
            _ => ErrorCode::Unknown,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    /// Access the driver's own error type, if this is a backend error of type `E`
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Backend { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidUrl(_) | Error::UnknownScheme(_) => 2,
            Error::Config(_) => 2,
            Error::AliasNotFound(_) => 5,
            Error::Backend {
                code: ErrorCode::NotFound,
                ..
            } => 5,
            _ => 1,
        }
    }
}
