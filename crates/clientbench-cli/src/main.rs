//! clientbench CLI
//!
//! Benchmarks HTTP client strategies against the Telegram `sendMessage`
//! endpoint and writes JSON, Markdown and CSV reports.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// clientbench - compare HTTP client strategies on a real API endpoint
#[derive(Parser)]
#[command(name = "clientbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "clientbench.json")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Benchmark the selected strategies and write reports
    Run(RunArgs),

    /// List the available client strategies
    List,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Attempts per strategy
    #[arg(short = 'n', long, env = "NUM_MESSAGES")]
    pub operations: Option<u64>,

    /// Comma-separated strategy names (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub strategies: Option<Vec<String>>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Target chat id
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub chat_id: Option<String>,

    /// Directory the reports are written to
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Also write a per-attempt CSV with this file name
    #[arg(long)]
    pub csv: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::execute(&cli.config, args).await,
        Commands::List => commands::list::execute(),
        Commands::Init { force } => commands::init::execute(&cli.config, force).await,
    }
}
