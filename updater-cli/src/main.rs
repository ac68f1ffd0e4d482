//! aqua-registry-updater: keeps the pinned versions of a package registry
//! current, a bounded batch per run.
//!
//! # Usage
//!
//! ```text
//! aqua-registry-updater [--root <dir>] [--log-format text|json] update
//! aqua-registry-updater [--root <dir>] [--log-format text|json] init
//! ```
//!
//! Both commands read `GITHUB_REPOSITORY` and `GITHUB_TOKEN`; `update` also
//! needs `AQUA_REGISTRY_UPDATER_CONTAINER_REGISTRY_TOKEN`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::{init::InitArgs, update::UpdateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "aqua-registry-updater",
    version,
    about = "Open pull requests that bump the packages of an aqua registry",
    long_about = None,
)]
struct Cli {
    /// Registry source tree holding `pkgs/` and `aqua-registry-updater.yaml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the next batch of packages and open update pull requests.
    Update(UpdateArgs),

    /// Publish an empty state artifact for a new registry.
    Init(InitArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    match cli.command {
        Commands::Update(args) => args.run(&cli.root).await,
        Commands::Init(args) => args.run(&cli.root).await,
    }
}
