//! `watch`: prints window, file, network and browser activity until Ctrl-C.

use crate::adapters::browser::HistoryReader;
use crate::adapters::fs_watch::FileActivityWatcher;
use crate::adapters::network::NetworkMonitor;
use crate::adapters::window::PlatformWindowProbe;
use crate::app::history::analyze_recent_history;
use crate::config::TrackerConfig;
use crate::core::monitor::{format_window_line, WindowMonitor};
use crate::utils::error::Result;
use chrono::Local;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Digest of browser history every `interval` until shutdown.
pub async fn browser_digests(
    reader: HistoryReader,
    display_limit: usize,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }

        let reader = reader.clone();
        match tokio::task::spawn_blocking(move || analyze_recent_history(&reader, display_limit)).await {
            Ok(digest) => println!("\n=== BROWSER ACTIVITY ===\n{}\n", digest),
            Err(e) => tracing::warn!("Browser history task failed: {}", e),
        }
    }
}

pub async fn run(config: &TrackerConfig) -> Result<()> {
    println!("🖥️  Activity Monitor (Ctrl-C to stop)");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    let files = FileActivityWatcher::new(&config.files);
    let rx = shutdown_rx.clone();
    tasks.spawn(async move {
        if let Err(e) = files.run(rx).await {
            tracing::error!("File monitoring failed: {}", e);
        }
    });

    let monitor = WindowMonitor::new(
        PlatformWindowProbe::new(),
        Duration::from_secs(config.monitor.poll_interval_secs),
        Duration::from_secs(config.monitor.error_backoff_secs),
    );
    let rx = shutdown_rx.clone();
    tasks.spawn(async move {
        monitor
            .run(rx, |window| async move {
                println!("{}", format_window_line(&window, &Local::now()));
            })
            .await;
    });

    if config.network.enabled {
        let network = NetworkMonitor::new(Duration::from_secs(config.network.poll_interval_secs));
        tasks.spawn(network.run(shutdown_rx.clone()));
    }

    tasks.spawn(browser_digests(
        HistoryReader::new(config.browser.query_limit),
        config.browser.display_limit,
        Duration::from_secs(config.browser.interval_secs),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    println!("\n🛑 Stopping monitors...");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Monitor task ended abnormally: {}", e);
        }
    }
    Ok(())
}
