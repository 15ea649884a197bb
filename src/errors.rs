use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for monitoring API operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur when interacting with the monitoring API
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// The request URL could not be built from the endpoint and path
    #[error("Invalid request URL {url}: {source}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Failed to serialize a request body or payload
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The resource was rejected locally before any request was sent
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// HTTP request failed (connection, TLS, timeout or body read)
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// The API answered with a status outside of `[200, 400)`
    #[error("Monitoring API request failed with status {status}")]
    Api {
        /// HTTP status code
        status: u16,
    },

    /// The API answered successfully but the body could not be decoded
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The caller cancelled the operation before it completed
    #[error("Request cancelled")]
    Cancelled,
}

impl MonitorError {
    /// HTTP status code of an [`MonitorError::Api`] error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status } => Some(*status),
            _ => None,
        }
    }

    /// Whether the operation was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the error is retryable
    ///
    /// The client never retries on its own; this only classifies the failure
    /// for callers that want to.
    ///
    /// Returns `true` for:
    /// - Network/connection errors
    /// - Timeout errors
    /// - Server errors (5xx status codes)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(source) => {
                if let reqwest_middleware::Error::Reqwest(err) = source {
                    return err.is_connect() || err.is_timeout();
                }
                if let Some(reqwest_err) = StdError::source(source) {
                    if let Some(err) = reqwest_err.downcast_ref::<reqwest::Error>() {
                        return err.is_connect() || err.is_timeout();
                    }
                }
                false
            }
            Self::Api { status } => *status >= 500,
            _ => false,
        }
    }
}
