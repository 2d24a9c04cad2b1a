//! Interactive focus sessions: a line-based shell with the window monitor in the background.

use crate::adapters::sqlite::SqliteStore;
use crate::adapters::window::PlatformWindowProbe;
use crate::config::TrackerConfig;
use crate::core::analyzer::ContentAnalyzer;
use crate::core::focus::FocusTracker;
use crate::core::monitor::{handle_focus_change, WindowMonitor};
use crate::core::report;
use crate::domain::ports::{ActivityStore, RelevanceClassifier};
use crate::utils::error::Result;
use chrono::Local;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

pub const DEFAULT_GOAL: &str = "General Study";
pub const DEFAULT_DESCRIPTION: &str = "No detailed description provided.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Start,
    Stop,
    Status,
    Stats,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ShellCommand::Empty,
            "start" => ShellCommand::Start,
            "stop" => ShellCommand::Stop,
            "status" => ShellCommand::Status,
            "stats" => ShellCommand::Stats,
            "help" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

pub fn help_text() -> String {
    [
        "📋 Commands:",
        "  start  - Start a new focus session",
        "  stop   - End the current session",
        "  status - Show the current session",
        "  stats  - Show time per relevance class",
        "  help   - Show this help",
        "  quit   - Exit",
    ]
    .join("\n")
}

fn prompt(text: &str) {
    print!("{}", text);
    // 提示字元沒有換行，要手動刷新
    let _ = std::io::stdout().flush();
}

/// Stdin lines from a plain thread, so a pending read never blocks runtime shutdown.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Reads commands line by line and drives the tracker.
pub struct FocusShell<S: ActivityStore> {
    tracker: Arc<Mutex<FocusTracker<S>>>,
    input: mpsc::UnboundedReceiver<String>,
}

impl<S: ActivityStore> FocusShell<S> {
    pub fn new(tracker: Arc<Mutex<FocusTracker<S>>>, input: mpsc::UnboundedReceiver<String>) -> Self {
        Self { tracker, input }
    }

    pub fn tracker(&self) -> &Arc<Mutex<FocusTracker<S>>> {
        &self.tracker
    }

    async fn next_line(&mut self) -> Option<String> {
        self.input.recv().await
    }

    /// Goal line, then description lines until an empty one. `None` at end of input.
    pub async fn read_session_details(&mut self) -> Option<(String, String)> {
        prompt("🎯 What is your study goal? ");
        let goal = self.next_line().await?;
        let goal = match goal.trim() {
            "" => DEFAULT_GOAL.to_string(),
            g => g.to_string(),
        };

        println!("📝 Describe what you plan to work on (empty line to finish):");
        let mut lines = Vec::new();
        loop {
            prompt("   ");
            match self.next_line().await {
                Some(line) if !line.trim().is_empty() => lines.push(line.trim().to_string()),
                _ => break,
            }
        }

        let description = if lines.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            lines.join(" ")
        };
        Some((goal, description))
    }

    /// Runs one command; returns `false` when the shell should exit.
    pub async fn execute(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::Start => {
                let Some((goal, description)) = self.read_session_details().await else {
                    return Ok(false);
                };
                let mut tracker = self.tracker.lock().await;
                if let Some(previous) = tracker.start_session(&goal, &description, Local::now()) {
                    println!("{}\n", report::render_summary(&previous));
                }
                if let Some(session) = tracker.session() {
                    println!("{}", report::render_session_start(session));
                }
            }
            ShellCommand::Stop => match self.tracker.lock().await.end_session(Local::now()) {
                Some(summary) => println!("{}", report::render_summary(&summary)),
                None => println!("❌ No active session"),
            },
            ShellCommand::Status => {
                let tracker = self.tracker.lock().await;
                match tracker.session() {
                    Some(session) => println!(
                        "{}",
                        report::render_status(session, tracker.context_switches(), Local::now())
                    ),
                    None => println!("❌ No active session"),
                }
            }
            ShellCommand::Stats => {
                let tracker = self.tracker.lock().await;
                match tracker.session() {
                    Some(session) => println!(
                        "{}",
                        report::render_stats(tracker.stats(), session.duration(Local::now()))
                    ),
                    None => println!("❌ No active session"),
                }
            }
            ShellCommand::Help => println!("{}", help_text()),
            ShellCommand::Quit => return Ok(false),
            ShellCommand::Empty => {}
            ShellCommand::Unknown(other) => {
                println!("❓ Unknown command: {}. Type 'help' for commands.", other)
            }
        }
        Ok(true)
    }

    async fn next_command(&mut self) -> Result<bool> {
        match self.next_line().await {
            Some(line) => self.execute(ShellCommand::parse(&line)).await,
            None => Ok(false),
        }
    }

    /// Command loop until quit, end of input or `interrupt`; the open session is ended on the way out.
    pub async fn run_until<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Future,
    {
        tokio::pin!(interrupt);

        loop {
            prompt("focus> ");
            // `start` 的問答也要能被 Ctrl-C 中斷
            let keep_going = tokio::select! {
                result = self.next_command() => result?,
                _ = &mut interrupt => {
                    println!();
                    tracing::info!("Interrupted");
                    false
                }
            };
            if !keep_going {
                break;
            }
        }

        if let Some(summary) = self.tracker.lock().await.end_session(Local::now()) {
            println!("{}", report::render_summary(&summary));
        }
        Ok(())
    }
}

/// Prints each classified window change for the open session.
pub async fn track_windows<S, C>(
    monitor: WindowMonitor<PlatformWindowProbe>,
    tracker: Arc<Mutex<FocusTracker<S>>>,
    classifier: Arc<C>,
    shutdown: watch::Receiver<bool>,
) where
    S: ActivityStore,
    C: RelevanceClassifier,
{
    monitor
        .run(shutdown, |window| {
            let tracker = tracker.clone();
            let classifier = classifier.clone();
            async move {
                if let Some(update) = handle_focus_change(&tracker, classifier.as_ref(), &window).await {
                    println!("\n{}", report::render_activity(&update));
                }
            }
        })
        .await;
}

pub async fn run(config: &TrackerConfig) -> Result<()> {
    let store = SqliteStore::open(&config.database.path)?;
    let tracker = Arc::new(Mutex::new(FocusTracker::new(store, config.monitor.recent_window)));
    let analyzer = Arc::new(ContentAnalyzer::new(config.analyzer.clone())?);

    println!("🧠 Focus Tracker");
    println!("{}", report::rule());
    println!("Model: {} @ {}", config.analyzer.model, config.analyzer.ollama_url);
    println!("{}", help_text());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = WindowMonitor::new(
        PlatformWindowProbe::new(),
        Duration::from_secs(config.monitor.poll_interval_secs),
        Duration::from_secs(config.monitor.error_backoff_secs),
    );
    let monitor_task = tokio::spawn(track_windows(
        monitor,
        tracker.clone(),
        analyzer,
        shutdown_rx,
    ));

    let mut shell = FocusShell::new(tracker, stdin_lines());
    let result = shell.run_until(tokio::signal::ctrl_c()).await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor_task.await {
        tracing::warn!("Window monitor task ended abnormally: {}", e);
    }

    println!("👋 Goodbye!");
    result
}
