use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single file transfer. Recorded by the run, never fatal to it.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Cannot resolve '{path}' against '{base}': {reason}")]
    InvalidUrl {
        base: String,
        path: String,
        reason: String,
    },

    #[error("Request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error code {status} downloading file '{url}'")]
    Status { url: String, status: StatusCode },

    #[error("File '{path}' hash is '{actual}' but expected '{expected}'")]
    Verification {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),

    #[error("Hash error: {0}")]
    HashError(#[from] crate::hash::HashError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TransferError {
    pub fn is_verification(&self) -> bool {
        matches!(self, TransferError::Verification { .. })
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Failure to retrieve a remote manifest.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request for manifest '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error {status} when fetching manifest '{url}'")]
    Status { url: String, status: StatusCode },

    #[error("Url '{url}' does not contain a valid manifest: {source}")]
    Malformed {
        url: String,
        #[source]
        source: crate::manifest::ManifestError,
    },
}

pub type FetchResult<T> = Result<T, FetchError>;
