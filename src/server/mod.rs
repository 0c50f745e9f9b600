mod error;
mod files;

pub use error::{ServerError, ServerResult};
pub use files::FileServerState;

use axum::{routing::get, Router};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

/// Route prefix under which bundle files are served.
pub const DOWNLOAD_PREFIX: &str = "/api/v1/download";

/// Router serving every file under `root` at `/api/v1/download/*path`.
///
/// Fails if `root` cannot be canonicalized.
pub fn create_file_server(root: impl Into<PathBuf>) -> std::io::Result<Router> {
    let state = FileServerState::new(root)?;

    Ok(Router::new()
        .route("/health", get(health_check))
        .route(&format!("{DOWNLOAD_PREFIX}/*path"), get(files::serve_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health_check() -> &'static str {
    "OK"
}
