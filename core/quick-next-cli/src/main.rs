//! quick-next: operator CLI for the Quick Next engine.
//!
//! ## Subcommands
//!
//! - `replay`: Run a scripted page session against the simulated page
//! - `position`: Show, set or reset the persisted control position
//! - `check-url`: Test a URL against the target-page and popup predicates

mod logging;
mod position;
mod replay;

use clap::{Parser, Subcommand};
use quick_next_core::pagination::is_target_page;
use quick_next_core::{load_config, load_default_config, tab_status, StorageProvider};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quick-next")]
#[command(about = "Quick Next floating pagination control")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/quick-next/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to a daily-rolled file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON trace and print the resulting report
    Replay {
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Persist positions to this file instead of an in-memory store
        #[arg(long, value_name = "PATH")]
        storage: Option<PathBuf>,
    },

    /// Inspect or edit the persisted control position
    Position {
        #[command(subcommand)]
        action: PositionCommand,

        /// Storage file (defaults to <data dir>/quick-next/storage.json)
        #[arg(long, global = true, value_name = "PATH")]
        storage: Option<PathBuf>,
    },

    /// Check whether a URL is a page the control serves
    CheckUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Subcommand)]
enum PositionCommand {
    /// Print the stored position (or the default)
    Show,
    /// Restore the default bottom-right anchor
    Reset,
    /// Pin the control at a viewport offset
    Set {
        #[arg(long)]
        left: f64,
        #[arg(long)]
        top: f64,
    },
}

fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init(cli.log_dir.as_deref());

    let config = match &cli.config {
        Some(path) => load_config(path),
        None => load_default_config(),
    };

    let result = match cli.command {
        Commands::Replay { trace, storage } => run_replay(&trace, storage, config),
        Commands::Position { action, storage } => {
            let action = match action {
                PositionCommand::Show => position::Action::Show,
                PositionCommand::Reset => position::Action::Reset,
                PositionCommand::Set { left, top } => position::Action::Set { left, top },
            };
            position::run(action, storage, &config)
        }
        Commands::CheckUrl { url } => {
            let status = tab_status(&url, &config.site_marker);
            let target_page = is_target_page(&url, &config.target_path);
            print_json(&json!({
                "url": url,
                "target_page": target_page,
                "popup_active": status.active,
                "popup_message": status.message,
            }))
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "quick-next failed");
        std::process::exit(1);
    }
}

fn run_replay(
    path: &std::path::Path,
    storage: Option<PathBuf>,
    config: quick_next_core::QuickNextConfig,
) -> Result<(), String> {
    let trace = replay::load_trace(path)?;
    let storage = match storage {
        Some(path) => StorageProvider::File(path).open(),
        None => StorageProvider::Memory.open(),
    };
    let report = replay::run(&trace, config, storage)?;
    let value = serde_json::to_value(&report).map_err(|err| err.to_string())?;
    print_json(&value)
}

fn print_json(value: &serde_json::Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}
