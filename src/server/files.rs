use crate::server::error::{ServerError, ServerResult};
use axum::{
    body::Body,
    extract::{Path as AxumPath, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Clone)]
pub struct FileServerState {
    root: Arc<PathBuf>,
}

impl FileServerState {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = std::fs::canonicalize(root.into())?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to a file under the root. Returns `None` for
    /// anything that would leave the root, including through symlinks.
    async fn resolve(&self, request: &str) -> Option<PathBuf> {
        let relative = Path::new(request);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain {
            return None;
        }

        let resolved = tokio::fs::canonicalize(self.root.join(relative)).await.ok()?;
        if !resolved.starts_with(self.root.as_path()) {
            return None;
        }
        Some(resolved)
    }
}

pub(crate) async fn serve_file(
    State(state): State<FileServerState>,
    AxumPath(path): AxumPath<String>,
) -> ServerResult<Response> {
    let not_found = || ServerError::NotFound(path.clone());

    let resolved = state.resolve(&path).await.ok_or_else(not_found)?;
    let metadata = tokio::fs::metadata(&resolved).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let file = tokio::fs::File::open(&resolved).await?;
    let content_type = mime_guess::from_path(&resolved).first_or_octet_stream();
    debug!("Serving '{}' as {}", resolved.display(), content_type);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
