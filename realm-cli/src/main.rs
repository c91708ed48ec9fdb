//! Realm: hierarchical project and task orchestration CLI.
//!
//! # Usage
//!
//! ```text
//! realm create <name> --path <dir> [--dir <d>] [--description <s>] [--git] [--eslint] [--jsconfig] [--config] [--dev] [--yaml]
//! realm fork <realm> <name> --path <dir> [--tag <group>]... [--all]
//! realm merge <super> <sub> [--symlink]
//! realm mount <realm>
//! realm info [realm] [--json]
//! realm tasks [realm] [--tag pub|dev|private] [--json]
//! realm units [realm] [--json]
//! realm artifacts [realm] [--group <name>] [--json]
//! realm run <task> [--realm <dir>] [--params <json>]
//! ```
//!
//! The root realm lives at `--home`, else `$REALM_HOME`, else `~/.realms`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    artifacts::ArtifactsArgs, create::CreateArgs, fork::ForkArgs, info::InfoArgs,
    merge::MergeArgs, mount::MountArgs, run::RunArgs, tasks::TasksArgs, units::UnitsArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "realm",
    version,
    about = "Create, fork, merge and run tasks across nested project realms",
    long_about = None,
)]
struct Cli {
    /// Root realm directory (overrides $REALM_HOME).
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new realm.
    Create(CreateArgs),

    /// Copy a realm, whole or by artifact group, into a new directory.
    Fork(ForkArgs),

    /// Place a realm under another realm's `opt/` directory.
    Merge(MergeArgs),

    /// Open and connect a realm, recovering recorded merge linkage.
    Mount(MountArgs),

    /// Describe a realm.
    Info(InfoArgs),

    /// List the tasks visible in a realm.
    Tasks(TasksArgs),

    /// List resolved build units.
    Units(UnitsArgs),

    /// List artifact groups or the entries of one group.
    Artifacts(ArtifactsArgs),

    /// Run a task and print its result.
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<()> {
    let session = commands::Session::open(cli.home.as_deref()).await?;
    match cli.command {
        Commands::Create(args) => args.run(&session).await,
        Commands::Fork(args) => args.run(&session).await,
        Commands::Merge(args) => args.run(&session).await,
        Commands::Mount(args) => args.run(&session).await,
        Commands::Info(args) => args.run(&session).await,
        Commands::Tasks(args) => args.run(&session).await,
        Commands::Units(args) => args.run(&session).await,
        Commands::Artifacts(args) => args.run(&session).await,
        Commands::Run(args) => args.run(&session).await,
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
