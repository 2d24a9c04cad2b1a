use crate::core::focus::{ActivityUpdate, FocusTracker};
use crate::core::report;
use crate::domain::model::WindowInfo;
use crate::domain::ports::{ActivityStore, RelevanceClassifier, WindowProbe};
use chrono::{DateTime, Local};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Polls the foreground window and reports changes.
pub struct WindowMonitor<P: WindowProbe> {
    probe: P,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl<P: WindowProbe> WindowMonitor<P> {
    pub fn new(probe: P, poll_interval: Duration, error_backoff: Duration) -> Self {
        Self {
            probe,
            poll_interval,
            error_backoff,
        }
    }

    /// Runs until `shutdown` turns true or its sender is dropped.
    pub async fn run<F, Fut>(&self, mut shutdown: watch::Receiver<bool>, mut on_change: F)
    where
        F: FnMut(WindowInfo) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut last_window: Option<WindowInfo> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.probe.active_window().await {
                Ok(Some(window)) => {
                    if last_window.as_ref() != Some(&window) {
                        last_window = Some(window.clone());
                        on_change(window).await;
                    }
                    self.poll_interval
                }
                Ok(None) => self.poll_interval,
                Err(e) => {
                    tracing::error!("Window monitoring error: {}", e);
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Window monitor stopped");
    }
}

/// Classifies a window change against the open session and records it.
///
/// The tracker lock is not held while the classifier runs; if the session
/// changed meanwhile the result is dropped.
pub async fn handle_focus_change<S, C>(
    tracker: &Mutex<FocusTracker<S>>,
    classifier: &C,
    window: &WindowInfo,
) -> Option<ActivityUpdate>
where
    S: ActivityStore,
    C: RelevanceClassifier + ?Sized,
{
    let (context, generation) = {
        let tracker = tracker.lock().await;
        (tracker.session_context()?, tracker.session_generation())
    };
    let (goal, description) = &context;

    let domain = classifier.extract_domain(&window.title, &window.process);
    let verdict = classifier
        .classify(&window.title, goal, description, &domain)
        .await;

    let mut tracker = tracker.lock().await;
    // 同樣目標重新開始也算不同的 session
    if !tracker.has_session() || tracker.session_generation() != generation {
        tracing::debug!("Session changed while classifying, dropping window change");
        return None;
    }
    tracker.process_window_change(window, &domain, verdict, Local::now())
}

pub fn format_window_line(window: &WindowInfo, at: &DateTime<Local>) -> String {
    format!(
        "[{}] WINDOW: {} - {}",
        report::clock(at),
        window.process,
        report::truncate(&window.title, 60)
    )
}
