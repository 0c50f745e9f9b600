pub mod error;
pub mod service;
pub mod types;

pub use error::{HashError, HashResult};
pub use service::HashService;
pub use types::{HashAlgorithm, HashDescriptor};
