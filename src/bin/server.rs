use anyhow::{Context, Result};
use bundlesync::server::{create_file_server, DOWNLOAD_PREFIX};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Serve a directory of bundle files over HTTP
#[derive(Parser)]
#[command(name = "bundlesync-server", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Directory whose files are served
    #[arg(short, long, env = "BUNDLESYNC_ROOT", default_value = ".")]
    root: PathBuf,

    /// Address to listen on
    #[arg(short, long, env = "BUNDLESYNC_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with_target(false)
        .init();

    let app = create_file_server(&args.root)
        .with_context(|| format!("cannot serve '{}'", args.root.display()))?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind))?;

    info!(
        "Serving {} at http://{}{}/",
        args.root.display(),
        listener.local_addr()?,
        DOWNLOAD_PREFIX
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
