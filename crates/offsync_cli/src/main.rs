//! offsync CLI
//!
//! Command-line client for an offline-first pet records store.
//!
//! # Commands
//!
//! - `account` - Create, show and look up accounts
//! - `pet` - Add, list, show, update and delete pets
//! - `status` - Show pending counts and connectivity
//! - `sync` - Run one full sync for the current user
//! - `journal` - Print the change journal
//! - `compact` - Rewrite the record log
//! - `watch` - Run the sync scheduler until Ctrl-C

mod commands;
mod context;

use clap::{Parser, Subcommand, ValueEnum};
use context::Context;
use offsync_engine::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Offline-first pet records with background sync.
#[derive(Parser)]
#[command(name = "offsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Local store directory (overrides OFFSYNC_DATA_DIR)
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Current account, by id or username
    #[arg(global = true, short, long)]
    user: Option<String>,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable lines
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    #[command(subcommand)]
    Account(commands::account::AccountCommand),

    /// Manage the current user's pets
    #[command(subcommand)]
    Pet(commands::pet::PetCommand),

    /// Show pending counts and connectivity
    Status,

    /// Push pending changes and pull newer remote rows
    Sync,

    /// Print the change journal
    Journal {
        /// Only entries for this record
        #[arg(short, long)]
        record: Option<String>,

        /// Only entries not yet confirmed by the remote
        #[arg(long)]
        unsynced: bool,
    },

    /// Rewrite the record log as a snapshot
    Compact,

    /// Run the sync scheduler until Ctrl-C
    Watch {
        /// Seconds between attempts (overrides OFFSYNC_SYNC_INTERVAL_SECS)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env file is normal.
    let _ = dotenv::dotenv();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    if let Commands::Watch {
        interval: Some(secs),
    } = &cli.command
    {
        if *secs == 0 {
            return Err("--interval must be at least one second".into());
        }
        settings.engine.sync_interval = std::time::Duration::from_secs(*secs);
    }

    let ctx = Context::open(settings, cli.user, cli.format)?;

    match cli.command {
        Commands::Account(command) => commands::account::run(&ctx, command)?,
        Commands::Pet(command) => commands::pet::run(&ctx, command)?,
        Commands::Status => commands::status::run(&ctx)?,
        Commands::Sync => commands::sync::run(&ctx)?,
        Commands::Journal { record, unsynced } => {
            commands::journal::run(&ctx, record.as_deref(), unsynced)?
        }
        Commands::Compact => commands::compact::run(&ctx)?,
        Commands::Watch { .. } => commands::watch::run(ctx)?,
    }

    Ok(())
}
