use anyhow::{Context, Result};
use bundlesync::coordinator::{SyncCoordinator, SyncError, SyncReport, UpdateOptions};
use bundlesync::hash::HashAlgorithm;
use bundlesync::manifest::{GenerateOptions, UpdatePolicy};
use bundlesync::transfer::ClientConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Fetch, verify and incrementally update versioned file bundles
#[derive(Parser)]
#[command(name = "bundlesync", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClientArgs {
    /// Whole-request timeout in seconds
    #[arg(long, global = true, env = "BUNDLESYNC_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Connect timeout in seconds
    #[arg(long, global = true, env = "BUNDLESYNC_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,
}

impl From<&ClientArgs> for ClientConfig {
    fn from(args: &ClientArgs) -> Self {
        ClientConfig {
            request_timeout: Duration::from_secs(args.timeout),
            connect_timeout: Duration::from_secs(args.connect_timeout),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a manifest file for a directory
    Generate {
        /// Path of the manifest file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Directory to describe
        #[arg(short, long)]
        dir: PathBuf,
        /// Remote URL the files can be downloaded from
        #[arg(short, long)]
        remote: String,
        /// Manifest version (semver)
        #[arg(long)]
        version: semver::Version,
        /// Display label for the version, defaults to the version itself
        #[arg(long)]
        label: Option<String>,
        /// Manifest name, defaults to the directory name
        #[arg(long)]
        name: Option<String>,
        /// Group name
        #[arg(long, default_value = "default")]
        group: String,
        /// Group directory relative to the installed manifest
        #[arg(long, default_value = ".")]
        group_path: String,
        /// Update policy for every file in the directory
        #[arg(short, long, value_enum, default_value = "overwrite")]
        update_policy: PolicyArg,
        /// Hash algorithm (none, sha256, blake3)
        #[arg(short = 'H', long, default_value = "sha256")]
        hash: HashAlgorithm,
    },
    /// Verify the files of a tracked directory against its manifest
    Verify {
        /// Directory holding the manifest
        #[arg(short, long)]
        directory: PathBuf,
    },
    /// Download a manifest and its files into a new directory
    Download {
        /// Directory to download into, created if missing
        #[arg(short, long)]
        directory: PathBuf,
        /// URL of the remote manifest
        #[arg(short, long, env = "BUNDLESYNC_MANIFEST_URL")]
        manifest_url: String,
    },
    /// Update a tracked directory to the remote manifest
    Update {
        /// Directory holding the manifest
        #[arg(short, long)]
        directory: PathBuf,
        /// URL of the remote manifest
        #[arg(short, long, env = "BUNDLESYNC_MANIFEST_URL")]
        manifest_url: String,
        /// Ignore manifest name and version checks
        #[arg(long)]
        force: bool,
        /// Accept an older remote version
        #[arg(long)]
        allow_downgrade: bool,
        /// Trust recorded hashes instead of re-hashing unchanged files
        #[arg(long)]
        quick: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum PolicyArg {
    Overwrite,
    Append,
    NewOnly,
}

impl From<PolicyArg> for UpdatePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Overwrite => UpdatePolicy::Overwrite,
            PolicyArg::Append => UpdatePolicy::Append,
            PolicyArg::NewOnly => UpdatePolicy::NewOnly,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            e.downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(-5)
        }
    };

    std::process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let coordinator = SyncCoordinator::new(&ClientConfig::from(&cli.client))?;

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing after the current file");
            cancel.cancel();
        }
    });

    let report = match cli.command {
        Commands::Generate {
            output,
            dir,
            remote,
            version,
            label,
            name,
            group,
            group_path,
            update_policy,
            hash,
        } => {
            let name = match name {
                Some(name) => name,
                None => std::fs::canonicalize(&dir)
                    .with_context(|| format!("cannot resolve '{}'", dir.display()))?
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "bundle".into()),
            };
            let options = GenerateOptions {
                name,
                version_label: label.unwrap_or_else(|| version.to_string()),
                version,
                group_name: group,
                group_path,
                remote,
                update_policy: update_policy.into(),
                algorithm: hash,
            };
            coordinator.generate(&dir, &output, &options).await?;
            return Ok(0);
        }
        Commands::Verify { directory } => coordinator.verify(&directory).await?,
        Commands::Download {
            directory,
            manifest_url,
        } => coordinator.download(&directory, &manifest_url).await?,
        Commands::Update {
            directory,
            manifest_url,
            force,
            allow_downgrade,
            quick,
        } => {
            let options = UpdateOptions {
                force,
                allow_downgrade,
                quick,
            };
            coordinator.update(&directory, &manifest_url, options).await?
        }
    };

    print_report(&report, cli.json)?;
    Ok(report.exit_code())
}

fn print_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "{:?}: {} groups, {} files, {} fetched, {} up to date, {} removed, {} errors ({:?})",
            report.operation,
            report.groups,
            report.files,
            report.fetched,
            report.up_to_date,
            report.removed,
            report.error_count(),
            report.outcome
        );
    }
    Ok(())
}
