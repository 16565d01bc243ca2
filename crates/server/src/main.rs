//! Watchroom - synchronized media viewing service
//!
//! Boots the room registry from storage and manages release updates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watchroom_core::{init_rooms, Database, RoomRegistry};
use watchroom_release::{UpdateOutcome, VersionInfo};

mod config;
mod error;

use config::ServerConfig;
use error::Result;

#[derive(Parser)]
#[command(name = "watchroom", version = config::BUILD_VERSION)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "WATCHROOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load all stored rooms and report them (default)
    Rooms,
    /// Show the running and latest released versions
    Version,
    /// Replace this binary with the latest release
    Update {
        /// Install the latest development build instead
        #[arg(long)]
        dev: bool,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Rooms) {
        Command::Rooms => {
            let registry = bootstrap(&config)?;
            report_rooms(&registry);

            if config.check_update {
                check_for_update(&config);
            }
        }
        Command::Version => {
            let info = VersionInfo::new(config.release.clone())?;
            println!("current: {}", info.current());
            println!("latest:  {}", info.latest()?);
        }
        Command::Update { dev } => {
            let info = VersionInfo::new(config.release.clone())?;
            match info.self_update(dev)? {
                UpdateOutcome::Updated { url } => println!("updated from {url}"),
                UpdateOutcome::UpToDate => println!("already up to date"),
                UpdateOutcome::Ahead => println!("running build is newer than the latest release"),
            }
        }
    }

    Ok(())
}

/// Open storage and populate a fresh registry from it
fn bootstrap(config: &ServerConfig) -> Result<RoomRegistry> {
    tracing::info!("Starting Watchroom {}", config::BUILD_VERSION);

    let db_path = config.database_path()?;
    let db = Database::open(&db_path)?;
    let registry = RoomRegistry::new(Arc::new(db));

    init_rooms(&registry)?;
    Ok(registry)
}

fn report_rooms(registry: &RoomRegistry) {
    let mut rooms = registry.get_all_without_hidden();
    rooms.sort_by_key(|r| r.created_at());

    println!(
        "{} rooms loaded, {} public, {} open",
        registry.len(),
        rooms.len(),
        registry.get_all_with_no_password_required().len()
    );
    for room in rooms {
        let lock = if room.need_password() { " (password)" } else { "" };
        println!("  {}  {}{}", room.id(), room.name(), lock);
    }
}

/// Update checks are advisory; failures are logged, never fatal
fn check_for_update(config: &ServerConfig) {
    let need = VersionInfo::new(config.release.clone()).and_then(|info| info.need_update());
    match need {
        Ok(true) => {
            tracing::warn!("A newer Watchroom release is available; run `watchroom update`")
        }
        Ok(false) => tracing::debug!("Watchroom is up to date"),
        Err(e) => tracing::warn!(error = %e, "Update check failed"),
    }
}
