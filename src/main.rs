mod commands;
mod compare;
mod config;
mod graph;
mod hotkey;
mod markdown;
mod telemetry;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mdcanvas",
    about = "A terminal canvas of linked Markdown notes"
)]
struct Cli {
    /// Config file (defaults to $MDCANVAS_CONFIG, then built-in settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Append logs to this file; nothing is logged without it
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive canvas (default)
    View {
        /// Start with a few linked sample notes
        #[arg(long)]
        demo: bool,
    },
    /// Render a Markdown file as terminal text (`-` reads stdin)
    Preview { path: PathBuf },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::resolve_path(cli.config);
    let config = config::load(config_path.as_deref())?;
    telemetry::init(cli.log_file.as_deref(), &config.log_filter)?;
    tracing::debug!(config = ?config_path, "configuration loaded");

    match cli.command.unwrap_or(Command::View { demo: false }) {
        Command::View { demo } => commands::view::run(config, demo),
        Command::Preview { path } => commands::preview::run(&path),
        Command::Config => commands::show_config::run(&config),
    }
}
