use thiserror::Error;

/// Structural failures. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Directory '{0}' already contains a manifest file, use update instead")]
    AlreadyInitialized(String),

    #[error("No local manifest found in '{0}'")]
    NoLocalManifest(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] crate::transfer::FetchError),

    #[error("Manifest name mismatch: local '{local}', remote '{remote}'")]
    NameMismatch { local: String, remote: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] crate::manifest::ManifestError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Transfer setup error: {0}")]
    TransferError(#[from] crate::transfer::TransferError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SyncError {
    /// Negative process exit code for a run that could not start or
    /// had to abort.
    pub fn exit_code(&self) -> i32 {
        use crate::transfer::FetchError;

        match self {
            SyncError::AlreadyInitialized(_) | SyncError::NoLocalManifest(_) => -1,
            SyncError::FetchFailed(FetchError::Malformed { .. }) => -3,
            SyncError::FetchFailed(_) => -2,
            SyncError::InvalidManifest(_) | SyncError::InvalidArgument(_) => -3,
            SyncError::NameMismatch { .. } => -4,
            SyncError::InvalidStateTransition(_)
            | SyncError::TransferError(_)
            | SyncError::IoError(_) => -5,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
