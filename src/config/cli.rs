use crate::config::toml_config::{TrackerConfig, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "focus-tracker")]
#[command(version)]
#[command(about = "Track focus sessions and desktop activity against a study goal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Interactive focus sessions (default)
    Focus {
        /// SQLite database file
        #[arg(long)]
        db: Option<String>,

        /// Ollama model used for classification
        #[arg(long)]
        model: Option<String>,

        /// Base URL of the Ollama server
        #[arg(long)]
        ollama_url: Option<String>,
    },

    /// Print window, file, network and browser activity until interrupted
    Watch {
        /// Directories to watch (repeatable); defaults to Documents, Desktop, Downloads and cwd
        #[arg(long = "path")]
        paths: Vec<PathBuf>,

        /// Disable outbound connection monitoring
        #[arg(long)]
        no_network: bool,

        /// Seconds between browser history digests
        #[arg(long)]
        browser_interval: Option<u64>,
    },

    /// Print the most recent browser history once
    History {
        /// Entries shown per browser
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List stored focus sessions
    Sessions {
        /// SQLite database file
        #[arg(long)]
        db: Option<String>,

        /// Number of sessions to list
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Show the activities of this session id
        #[arg(long)]
        id: Option<i64>,
    },

    /// Install the tracker's host dependencies (xdotool) and print usage
    Setup {
        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Do not prefix package manager commands with sudo
        #[arg(long)]
        no_sudo: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Focus {
            db: None,
            model: None,
            ollama_url: None,
        })
    }
}

impl Commands {
    /// 命令列參數覆蓋檔案設定
    pub fn apply_overrides(&self, config: &mut TrackerConfig) {
        match self {
            Commands::Focus {
                db,
                model,
                ollama_url,
            } => {
                if let Some(db) = db {
                    config.database.path = db.clone();
                }
                if let Some(model) = model {
                    config.analyzer.model = model.clone();
                }
                if let Some(url) = ollama_url {
                    config.analyzer.ollama_url = url.clone();
                }
            }
            Commands::Watch {
                paths,
                no_network,
                browser_interval,
            } => {
                if !paths.is_empty() {
                    config.files.watch_paths = paths.clone();
                }
                if *no_network {
                    config.network.enabled = false;
                }
                if let Some(interval) = browser_interval {
                    config.browser.interval_secs = *interval;
                }
            }
            Commands::History { limit } => {
                if let Some(limit) = limit {
                    config.browser.display_limit = *limit;
                }
            }
            Commands::Sessions { db, .. } => {
                if let Some(db) = db {
                    config.database.path = db.clone();
                }
            }
            Commands::Setup { no_sudo, .. } => {
                if *no_sudo {
                    config.setup.use_sudo = false;
                }
            }
        }
    }
}
