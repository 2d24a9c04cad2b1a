pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Commands};

pub use adapters::sqlite::SqliteStore;
pub use config::TrackerConfig;
pub use core::{analyzer::ContentAnalyzer, focus::FocusTracker, setup::Installer};
pub use utils::error::{FocusError, Result};
