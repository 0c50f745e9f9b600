use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Algorithm {0} is not supported")]
    UnsupportedAlgorithm(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type HashResult<T> = Result<T, HashError>;
