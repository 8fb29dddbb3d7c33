//! Error types for the datacube-ogcapi workspace.

use thiserror::Error;

/// Result type alias using CubeError.
pub type CubeResult<T> = Result<T, CubeError>;

/// Primary error type for catalog and provider operations.
#[derive(Debug, Error)]
pub enum CubeError {
    /// Malformed caller input, caught before any external call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Well-formed but unresolvable reference (e.g. unknown product).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Syntactically valid request violating a domain rule.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The catalog or array-load client could not be reached.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// A cache artifact exists but fails to deserialize.
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CubeError {
    /// Map this error onto an HTTP status code for the hosting framework.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CubeError::InvalidArgument(_) | CubeError::InvalidQuery(_) => 400,
            CubeError::NotFound(_) => 404,
            CubeError::ConnectionFailure(_) => 502,
            CubeError::CacheCorruption(_) | CubeError::Internal(_) => 500,
        }
    }

    /// Client-facing errors carry a human-readable domain message;
    /// everything else is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        self.http_status_code() < 500 && !matches!(self, CubeError::ConnectionFailure(_))
    }
}

impl From<std::io::Error> for CubeError {
    fn from(err: std::io::Error) -> Self {
        CubeError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CubeError {
    fn from(err: serde_json::Error) -> Self {
        CubeError::Internal(format!("JSON error: {}", err))
    }
}
