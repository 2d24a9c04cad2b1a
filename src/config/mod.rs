#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Cli, Commands};
pub use toml_config::{
    AnalyzerConfig, BrowserConfig, DatabaseConfig, FilesConfig, LoggingConfig, MonitorConfig,
    NetworkConfig, SetupConfig, TrackerConfig, DEFAULT_CONFIG_FILE,
};
