use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Duplicate group name '{0}'")]
    DuplicateGroup(String),

    #[error("Duplicate file '{path}' in group '{group}'")]
    DuplicateFile { group: String, path: String },

    #[error("File '{path}' has a {actual}-byte {algorithm} digest, expected {expected} bytes")]
    DigestLength {
        path: String,
        algorithm: String,
        expected: usize,
        actual: usize,
    },

    #[error("Manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest not found: {0}")]
    NotFound(String),

    #[error("Hash error: {0}")]
    HashError(#[from] crate::hash::HashError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ManifestError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ManifestError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type ManifestResult<T> = Result<T, ManifestError>;
