//! Error types for FileFerry
//!
//! This module defines all error types used throughout the crate and the
//! transient/definitive classification the retry layer relies on.

use std::io::ErrorKind;
use thiserror::Error;

/// Main error type for FileFerry operations
#[derive(Error, Debug)]
pub enum FerryError {
    /// Invalid or incomplete operation options
    #[error("Configuration error: {0}")]
    Config(String),

    /// A path that must be a directory is missing or is a plain file
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A lock file for the target already exists
    #[error("Lock file already exists for '{0}'")]
    LockConflict(String),

    /// Could not reach or connect to a backend
    #[error("Connection error to '{endpoint}': {message}")]
    Connection {
        /// Endpoint that could not be reached, in `host:port` form
        endpoint: String,
        /// What the connection attempt reported
        message: String,
    },

    /// Backend authentication failed
    #[error("Authentication failed for '{user}@{host}': {message}")]
    Authentication {
        /// Login user the backend rejected
        user: String,
        /// Host the authentication was attempted against
        host: String,
        /// What the backend reported
        message: String,
    },

    /// A remote backend rejected or failed an operation
    #[error("{scheme} error at '{uri}': {message}")]
    Protocol {
        /// Backend protocol that reported the failure
        scheme: &'static str,
        /// Path the operation addressed
        uri: String,
        /// What the backend reported
        message: String,
    },

    /// I/O error during a backend operation
    #[error("I/O error at '{uri}': {source}")]
    Io {
        /// Path the operation addressed
        uri: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A block-streamed transfer failed part-way
    #[error("Streaming transfer failed for '{uri}': {source}")]
    Streaming {
        /// Destination of the streamed transfer
        uri: String,
        /// Failure that interrupted the stream
        #[source]
        source: Box<FerryError>,
    },

    /// URI names a scheme no provider handles
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// URI or path could not be parsed
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl FerryError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-a-directory error
    pub fn not_a_directory(uri: impl Into<String>) -> Self {
        Self::NotADirectory(uri.into())
    }

    /// Create a lock-conflict error
    pub fn lock_conflict(uri: impl Into<String>) -> Self {
        Self::LockConflict(uri.into())
    }

    /// Create a connection error
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(
        user: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            user: user.into(),
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error for a remote backend operation
    pub fn protocol(
        scheme: &'static str,
        uri: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Protocol {
            scheme,
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with URI context
    pub fn io(uri: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            uri: uri.into(),
            source,
        }
    }

    /// Wrap an error that occurred inside a block-streamed transfer
    pub fn streaming(uri: impl Into<String>, source: FerryError) -> Self {
        Self::Streaming {
            uri: uri.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error is transient (worth retrying)
    ///
    /// Connection and protocol failures are assumed to be flaky backends.
    /// Plain I/O errors are transient only for interruption and
    /// connection-class kinds; a `NotFound` or `PermissionDenied` will not
    /// heal by waiting. Streaming failures are never transient: the
    /// destination may already hold a partial write.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Protocol { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::TimedOut
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Get the URI associated with this error, if any
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::NotADirectory(uri)
            | Self::LockConflict(uri)
            | Self::Io { uri, .. }
            | Self::Streaming { uri, .. }
            | Self::Protocol { uri, .. } => Some(uri),
            _ => None,
        }
    }
}

/// Result type alias for FileFerry operations
pub type Result<T> = std::result::Result<T, FerryError>;

impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io {
            uri: String::new(),
            source: err,
        }
    }
}

impl From<url::ParseError> for FerryError {
    fn from(err: url::ParseError) -> Self {
        FerryError::InvalidPath(err.to_string())
    }
}

/// Extension trait for adding URI context to std::io::Result
pub trait IoResultExt<T> {
    /// Add URI context to an I/O error
    fn with_uri(self, uri: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_uri(self, uri: impl Into<String>) -> Result<T> {
        self.map_err(|e| FerryError::io(uri, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_uri() {
        let io_err = std::io::Error::new(ErrorKind::NotFound, "file not found");
        let err = FerryError::io("ftp://host/in/a.txt", io_err);
        assert_eq!(err.uri(), Some("ftp://host/in/a.txt"));
    }

    #[test]
    fn test_transience_classification() {
        assert!(FerryError::connection("sftp://host", "refused").is_transient());
        assert!(FerryError::protocol("ftp", "ftp://host/in", "550").is_transient());

        assert!(!FerryError::config("source directory not set").is_transient());
        assert!(!FerryError::lock_conflict("file:///out/a.txt.lock").is_transient());
        assert!(!FerryError::not_a_directory("/out").is_transient());
    }

    #[test]
    fn test_io_transience_depends_on_kind() {
        let timeout = FerryError::io("/a", std::io::Error::new(ErrorKind::TimedOut, "slow"));
        assert!(timeout.is_transient());

        let missing = FerryError::io("/a", std::io::Error::new(ErrorKind::NotFound, "gone"));
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_streaming_never_transient() {
        let inner = FerryError::io(
            "/dst/a.txt",
            std::io::Error::new(ErrorKind::ConnectionReset, "reset"),
        );
        assert!(inner.is_transient());
        let wrapped = FerryError::streaming("/dst/a.txt", inner);
        assert!(!wrapped.is_transient());
    }

    #[test]
    fn test_with_uri_extension() {
        let res: std::io::Result<()> = Err(std::io::Error::new(ErrorKind::Other, "boom"));
        let err = res.with_uri("/some/file").unwrap_err();
        assert_eq!(err.uri(), Some("/some/file"));
    }
}
