//! # d2h
//!
//! Command-line front end for `d2-history`.
//!
//! ## Usage
//!
//! ```bash
//! d2h [--config ./config/d2h.toml] [--progress auto|human|json|off] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `d2h export [NAME#CODE]` | Export the full activity history to CSV |
//! | `d2h resolve [NAME#CODE]` | Print the membership the name resolves to |
//!
//! When `NAME#CODE` is omitted it is read from stdin.
//!
//! The API key comes from `BUNGIE_API_KEY`, or `api.api_key` in the config
//! file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use d2_history::client::BungieClient;
use d2_history::config::{self, Config};
use d2_history::export::CsvSink;
use d2_history::models::PlayerHandle;
use d2_history::pipeline::{resolve_identity, run_export};
use d2_history::progress::ProgressMode;

/// Export a Destiny 2 player's activity history.
#[derive(Parser)]
#[command(
    name = "d2h",
    about = "Export a Destiny 2 player's full activity history to CSV",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/d2h.toml")]
    config: PathBuf,

    /// Progress output on stderr.
    #[arg(long, global = true, value_enum, default_value_t = ProgressMode::Auto)]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the player and export every character's activity history.
    ///
    /// Follows cross-save to the primary membership, then pages through
    /// each character's history until the service runs out of activities.
    Export {
        /// Bungie name, e.g. `Guardian#1234`. Prompted for when omitted.
        handle: Option<String>,

        /// CSV output path (overrides `output.path`).
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Stop each character after this many pages (overrides `harvest.max_pages`).
        #[arg(long)]
        max_pages: Option<u32>,

        /// Activities per page, 1-250 (overrides `harvest.page_size`).
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Resolve a Bungie name to its primary membership and print it.
    Resolve {
        /// Bungie name, e.g. `Guardian#1234`. Prompted for when omitted.
        handle: Option<String>,
    },
}

/// Take the handle from the argument, or prompt for it on stdin.
fn read_handle(arg: Option<String>) -> anyhow::Result<PlayerHandle> {
    let raw = match arg {
        Some(raw) => raw,
        None => {
            eprint!("Enter Bungie name (e.g. char#5202): ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read Bungie name from stdin")?;
            line
        }
    };
    Ok(raw.parse::<PlayerHandle>()?)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg: Config = config::load_config(&cli.config)?;
    let progress = cli.progress.reporter();

    match cli.command {
        Commands::Export {
            handle,
            output,
            max_pages,
            page_size,
        } => {
            if let Some(path) = output {
                cfg.output.path = path;
            }
            if max_pages.is_some() {
                cfg.harvest.max_pages = max_pages;
            }
            if let Some(size) = page_size {
                cfg.harvest.page_size = size;
            }
            cfg.validate()?;

            let api_key = cfg.api_key()?;
            let handle = read_handle(handle)?;
            let client = BungieClient::new(&cfg.api, api_key)?;

            let path = cfg.output.path.clone();
            let outcome = run_export(
                &client,
                &handle,
                &cfg,
                || CsvSink::create(&path),
                progress.as_ref(),
            )
            .await?;

            if outcome.summary.total == 0 {
                println!("No activities found.");
            } else {
                println!(
                    "Saved {} activities to {}",
                    outcome.summary.total,
                    path.display()
                );
            }
        }
        Commands::Resolve { handle } => {
            let api_key = cfg.api_key()?;
            let handle = read_handle(handle)?;
            let client = BungieClient::new(&cfg.api, api_key)?;

            let unification =
                resolve_identity(&client, &handle, &cfg, progress.as_ref()).await?;
            let identity = unification.identity;

            println!("membershipId: {}", identity.membership_id);
            println!("membershipType: {}", identity.membership_type);
            println!("crossSaveOverride: {}", identity.cross_save_override);
        }
    }

    Ok(())
}
