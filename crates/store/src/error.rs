use daysheet_core::error::CoreError;

/// Errors raised by a [`DocumentStore`](crate::DocumentStore) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The container or document does not exist (or is trashed).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The document is protected against writes.
    #[error("Resource is read-only: {0}")]
    ReadOnly(String),

    /// A cell range or value grid that does not fit the target.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API returned a non-2xx status code.
    #[error("Store API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No usable access token could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A response or uploaded file could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound {
                entity: "resource",
                name: id,
            },
            StoreError::ReadOnly(id) => CoreError::Locked(id),
            StoreError::InvalidRange(msg) => CoreError::Validation(msg),
            StoreError::Decode(msg) => CoreError::Internal(msg),
            other @ (StoreError::Request(_)
            | StoreError::Api { .. }
            | StoreError::Io(_)
            | StoreError::Auth(_)) => {
                CoreError::RemoteUnavailable(other.to_string())
            }
        }
    }
}
