use anyhow::Context;
use clap::Parser;
use focus_tracker::adapters::process::{command_exists, SystemCommandRunner};
use focus_tracker::app::{history, interactive, watch};
use focus_tracker::utils::{logger, validation::Validate};
use focus_tracker::{Cli, Commands, FocusError, Installer, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    // 載入配置並套用命令列覆蓋
    let mut config = TrackerConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config file '{}'", cli.config.display()))?;
    command.apply_overrides(&mut config);

    // 初始化日誌
    logger::init_logger(&config.logging.format, cli.verbose);
    tracing::info!("Starting focus-tracker");
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if matches!(command, Commands::Focus { .. } | Commands::Watch { .. }) {
        check_window_tools();
    }

    let result = match command {
        Commands::Focus { .. } => interactive::run(&config).await,
        Commands::Watch { .. } => watch::run(&config).await,
        Commands::History { .. } => history::run_history(&config).await,
        Commands::Sessions { limit, id, .. } => history::run_sessions(&config, limit, id),
        Commands::Setup { dry_run, .. } => run_setup(&config, dry_run).await,
    };

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ focus-tracker failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn check_window_tools() {
    if cfg!(target_os = "linux") && !command_exists("xdotool") {
        tracing::warn!("xdotool not found; window tracking is disabled");
        eprintln!("⚠️  xdotool is not installed. Run `focus-tracker setup` to install it.");
    }
}

async fn run_setup(config: &TrackerConfig, dry_run: bool) -> Result<(), FocusError> {
    let installer = Installer::new(SystemCommandRunner, config.setup.clone(), dry_run);
    let report = tokio::task::spawn_blocking(move || installer.run()).await?;

    let failures = report.failures();
    if failures > 0 {
        tracing::warn!("Setup finished with {} failed step(s)", failures);
    }
    Ok(())
}
