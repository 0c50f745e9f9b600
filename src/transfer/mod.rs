mod client;
mod error;
mod executor;
mod types;

pub use client::RemoteClient;
pub use error::{FetchError, FetchResult, TransferError, TransferResult};
pub use executor::TransferExecutor;
pub use types::{ClientConfig, TransferOutcome};
