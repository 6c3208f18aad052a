//! Error types for the listing module.

use thiserror::Error;

use crate::task::FailureKind;

/// Errors that can occur while listing image URLs.
///
/// Any of these aborts the benchmark run: without a listing there is no
/// workload to compare.
#[derive(Debug, Error)]
pub enum ListError {
    /// The configured base URL cannot be parsed or joined.
    #[error("invalid listing base URL {url}: {source}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[error("failed to build listing HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network-level error reaching the listing endpoint.
    #[error("network error listing {url}: {source}")]
    Network {
        /// The listing URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Listing request timed out.
    #[error("timeout listing {url}")]
    Timeout {
        /// The listing URL.
        url: String,
    },

    /// Listing endpoint answered with a non-success status.
    #[error("HTTP {status} listing {url}")]
    HttpStatus {
        /// The listing URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response body is not the expected JSON array of entries.
    #[error("malformed listing from {url}: {source}")]
    Parse {
        /// The listing URL.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Listing decoded fine but held fewer entries than requested.
    #[error("listing returned {received} entries, {requested} requested")]
    ShortListing {
        /// Number of URLs asked for.
        requested: usize,
        /// Number of entries received.
        received: usize,
    },
}

impl ListError {
    /// Creates a network error, promoting reqwest timeouts to [`ListError::Timeout`].
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

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid base URL error.
    pub fn invalid_base_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            source,
        }
    }

    /// Classifies the error the same way task failures are classified.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Client(_) | Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } => {
                FailureKind::Network
            }
            Self::InvalidBaseUrl { .. } | Self::Parse { .. } | Self::ShortListing { .. } => {
                FailureKind::Parse
            }
        }
    }
}
