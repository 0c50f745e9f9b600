use crate::manifest::Manifest;
use crate::transfer::error::{FetchError, FetchResult, TransferError, TransferResult};
use crate::transfer::types::ClientConfig;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

/// Thin wrapper over the HTTP client used for every remote read.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> TransferResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(TransferError::Client)?;
        Ok(Self { http })
    }

    /// Fetch and validate a manifest document. Anything but 200 is a failure.
    pub async fn fetch_manifest(&self, url: &str) -> FetchResult<Manifest> {
        debug!("Fetching manifest '{}'", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        Manifest::from_json(&body).map_err(|source| FetchError::Malformed {
            url: url.to_string(),
            source,
        })
    }

    /// GET a file, failing on any non-success status.
    pub async fn get(&self, url: &Url) -> TransferResult<Response> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransferError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }

    /// Resolve a manifest path against a group's base URI. The base is
    /// treated as a directory even without a trailing slash.
    pub fn file_url(remote: &str, path: &str) -> TransferResult<Url> {
        let invalid = |reason: String| TransferError::InvalidUrl {
            base: remote.to_string(),
            path: path.to_string(),
            reason,
        };

        let base = if remote.ends_with('/') {
            remote.to_string()
        } else {
            format!("{remote}/")
        };

        Url::parse(&base)
            .and_then(|base| base.join(path))
            .map_err(|e| invalid(e.to_string()))
    }
}
