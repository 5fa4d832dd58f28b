//! Error types for the AutoMark client.

use thiserror::Error;

/// Client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Fixture bundle could not be downloaded. Any cached copy is untouched.
    /// A server rejection keeps its text verbatim.
    #[error("{message}")]
    FetchFailure { message: String },

    /// The server rejected the request; `message` is its text verbatim.
    #[error("{message}")]
    Server { message: String },

    /// Network or transport error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Local cache could not be read or written.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// The server answered with something this client does not understand.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Cached fixtures are unusable for the requested assignment.
    #[error("local tests unavailable: {message}")]
    LocalTests { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Rejected by the server / misuse
            Self::Server { .. } => 1,
            Self::Config { .. } => 1,
            Self::LocalTests { .. } => 1,

            // Protocol / integrity
            Self::InvalidResponse { .. } => 3,

            // Network/transient
            Self::FetchFailure { .. } => 5,
            Self::Network { .. } => 5,

            // Local IO
            Self::Cache { .. } => 6,
        }
    }

    /// Wrap a failed bundle download.
    pub(crate) fn fetch_failure(err: ClientError) -> Self {
        match err {
            Self::Server { message } => Self::FetchFailure { message },
            other => Self::FetchFailure {
                message: format!("failed to download local tests: {}", other),
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
