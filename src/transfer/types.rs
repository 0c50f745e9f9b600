use std::time::Duration;

/// HTTP client settings shared by manifest and file retrieval.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout, body included
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("bundlesync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A file that was fetched and matched its expected hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub url: String,
    pub bytes: u64,
}
