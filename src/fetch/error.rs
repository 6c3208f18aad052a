//! Error types for the fetch module.
//!
//! A [`FetchError`] never leaves an [`ImageFetcher`](super::ImageFetcher):
//! it is logged with its context and collapsed into a [`FailureKind`] on the
//! task's [`DownloadResult`](crate::DownloadResult).

use std::path::PathBuf;

use thiserror::Error;

use crate::task::FailureKind;

/// Errors that can occur while fetching and storing one image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The simulated fetcher was told to fail this task.
    #[error("simulated network failure for task {index}")]
    Simulated {
        /// Index of the failing task.
        index: usize,
    },

    /// File system error while storing the image.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Creates a network error, promoting reqwest timeouts to [`FetchError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Maps the error onto the failure kind recorded for the task.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::Simulated { .. } => FailureKind::Network,
            Self::Io { .. } => FailureKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/image.jpg");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/image.jpg"));
        assert_eq!(error.kind(), FailureKind::Network);
    }

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/image.jpg", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert_eq!(error.kind(), FailureKind::Network);
    }

    #[test]
    fn test_fetch_error_io_maps_to_io_kind() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = FetchError::io(PathBuf::from("/tmp/image_0.jpg"), io_error);
        assert!(error.to_string().contains("/tmp/image_0.jpg"));
        assert_eq!(error.kind(), FailureKind::Io);
    }

    #[test]
    fn test_fetch_error_simulated_is_network() {
        let error = FetchError::Simulated { index: 4 };
        assert!(error.to_string().contains('4'));
        assert_eq!(error.kind(), FailureKind::Network);
    }
}
