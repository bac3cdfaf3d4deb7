//! Desyn CLI - desyn command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;
mod util;

/// Desyn - multi-frame animation projects with autosave
#[derive(Parser)]
#[command(name = "desyn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the data directory (documents and logs)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new animation project
    New {
        /// Project name
        name: String,
        /// Playback rate (default: 12)
        #[arg(long)]
        fps: Option<u32>,
    },
    /// Open an interactive editing session with autosave
    Edit {
        /// Document ID or unique ID prefix
        document: String,
    },
    /// Show a project summary
    Show {
        /// Document ID or unique ID prefix
        document: String,
    },
    /// List projects, most recently updated first
    List,
    /// View or edit configuration
    Config {
        /// List all configuration values
        #[arg(long, conflicts_with_all = ["get", "set", "path", "example"])]
        list: bool,
        /// Get a single value (e.g. autosave.interval_ms)
        #[arg(long, value_name = "KEY")]
        get: Option<String>,
        /// Set a value
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        set: Option<Vec<String>>,
        /// Show the config file path
        #[arg(long)]
        path: bool,
        /// Create the config file if missing (with --path)
        #[arg(long, requires = "path")]
        create: bool,
        /// Print an example config file
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = system_config::load()?;
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = Some(dir);
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init(config.data_dir().ok().map(|d| d.join("logs")));

    match cli.command {
        Commands::New { name, fps } => cmd::new::run(&config, &name, fps).await,
        Commands::Edit { document } => cmd::edit::run(&config, &document).await,
        Commands::Show { document } => cmd::show::run(&config, &document).await,
        Commands::List => cmd::list::run(&config).await,
        Commands::Config { get, set, path, create, example, .. } => {
            if let Some(key) = get {
                cmd::config::run_get(&key).await
            } else if let Some(pair) = set {
                cmd::config::run_set(&pair[0], &pair[1]).await
            } else if path {
                cmd::config::run_path(create).await
            } else if example {
                cmd::config::run_example().await
            } else {
                // --list is the default view
                cmd::config::run_list(&config).await
            }
        }
    }
}
