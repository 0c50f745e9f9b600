use crate::fs;
use crate::hash::HashService;
use crate::manifest::FileEntry;
use crate::manifest::path;
use crate::transfer::client::RemoteClient;
use crate::transfer::error::{TransferError, TransferResult};
use crate::transfer::types::TransferOutcome;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Fetches single files into the local tree and verifies them.
#[derive(Clone)]
pub struct TransferExecutor {
    client: RemoteClient,
}

impl TransferExecutor {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Download `file` from `remote` into `group_dir` and check its hash.
    ///
    /// The body is streamed into a temporary sibling and renamed into place,
    /// so an interrupted transfer never leaves a truncated file behind. A hash
    /// mismatch is reported after the rename: the file stays on disk.
    pub async fn fetch_and_verify(
        &self,
        file: &FileEntry,
        group_dir: &Path,
        remote: &str,
    ) -> TransferResult<TransferOutcome> {
        let url = RemoteClient::file_url(remote, &file.path)?;
        let target = path::resolve(group_dir, &file.path);

        debug!("Downloading file '{}' to '{}'", url, target.display());

        let response = self.client.get(&url).await?;

        fs::ensure_parent(&target).await?;
        let temp = fs::temp_sibling(&target);
        let written = match Self::stream_to(response, &temp, url.as_str()).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e);
            }
        };
        fs::commit(&temp, &target).await?;

        if let Some(actual) = HashService::verify_file(&file.hash, &target).await? {
            return Err(TransferError::Verification {
                path: file.path.clone(),
                expected: file.hash.digest_hex(),
                actual: hex::encode_upper(actual),
            });
        }

        Ok(TransferOutcome {
            url: url.to_string(),
            bytes: written,
        })
    }

    async fn stream_to(response: reqwest::Response, temp: &Path, url: &str) -> TransferResult<u64> {
        let mut out = tokio::fs::File::create(temp).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| TransferError::Request {
                url: url.to_string(),
                source,
            })?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        out.flush().await?;
        out.sync_all().await?;
        Ok(written)
    }
}
