use crate::domain::model::{Activity, Classification, FocusSession, Verdict, WindowInfo};
use crate::domain::ports::ActivityStore;
use chrono::{DateTime, Duration, Local};
use std::collections::{HashMap, VecDeque};

const ALERT_MIN_RECENT: usize = 5;
const DISTRACTION_WINDOW: usize = 5;
const DISTRACTION_LIMIT: usize = 3;
const DRIFT_WINDOW: usize = 7;
const DRIFT_THRESHOLD: f64 = 0.5;
const SWITCH_ALERT_EVERY: u32 = 15;

#[derive(Debug, Clone, PartialEq)]
pub enum FocusAlert {
    Distractions,
    Drift { goal: String },
    HighSwitching(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRating {
    Excellent,
    Good,
    Fair,
    Low,
}

impl FocusRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            FocusRating::Excellent
        } else if score >= 6.0 {
            FocusRating::Good
        } else if score >= 4.0 {
            FocusRating::Fair
        } else {
            FocusRating::Low
        }
    }
}

/// What changed after a new window was recorded.
#[derive(Debug, Clone)]
pub struct ActivityUpdate {
    pub activity: Activity,
    pub focus_percentage: Option<f64>,
    pub context_switches: u32,
    pub alerts: Vec<FocusAlert>,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: Option<i64>,
    pub goal: String,
    pub description: String,
    pub duration: Duration,
    pub context_switches: u32,
    pub breakdown: Vec<(Classification, Duration, f64)>,
    pub focus_score: Option<f64>,
    pub rating: Option<FocusRating>,
}

/// Time per classification.
#[derive(Debug, Clone)]
pub struct ClassTotals(HashMap<Classification, Duration>);

impl Default for ClassTotals {
    fn default() -> Self {
        Self(
            Classification::ALL
                .iter()
                .map(|c| (*c, Duration::zero()))
                .collect(),
        )
    }
}

impl ClassTotals {
    pub fn get(&self, classification: Classification) -> Duration {
        self.0.get(&classification).copied().unwrap_or_else(Duration::zero)
    }

    fn add(&mut self, classification: Classification, duration: Duration) {
        let entry = self.0.entry(classification).or_insert_with(Duration::zero);
        *entry = *entry + duration;
    }

    /// 各分類佔總時長的比例，順序固定為 DIRECT..DISTRACTION
    pub fn breakdown(&self, total: Duration) -> Vec<(Classification, Duration, f64)> {
        let total_ms = total.num_milliseconds();
        if total_ms <= 0 {
            return Vec::new();
        }
        Classification::ALL
            .iter()
            .map(|c| {
                let spent = self.get(*c);
                (*c, spent, spent.num_milliseconds() as f64 / total_ms as f64 * 100.0)
            })
            .collect()
    }
}

/// `min(10, (direct + 0.7 * peripheral) / total * 10)`, `None` for an empty session.
pub fn focus_score(totals: &ClassTotals, total: Duration) -> Option<f64> {
    let total_ms = total.num_milliseconds();
    if total_ms <= 0 {
        return None;
    }
    let direct = totals.get(Classification::Direct).num_milliseconds() as f64;
    let peripheral = totals.get(Classification::Peripheral).num_milliseconds() as f64;
    Some(((direct + peripheral * 0.7) / total_ms as f64 * 10.0).min(10.0))
}

/// Session state machine: one open session, one open activity at most.
pub struct FocusTracker<S: ActivityStore> {
    store: S,
    recent_window: usize,
    current_session: Option<FocusSession>,
    current_activity: Option<Activity>,
    activity_start: Option<DateTime<Local>>,
    stats: ClassTotals,
    recent: VecDeque<Activity>,
    context_switches: u32,
    last_classification: Option<Classification>,
    generation: u64,
}

impl<S: ActivityStore> FocusTracker<S> {
    pub fn new(store: S, recent_window: usize) -> Self {
        Self {
            store,
            // 至少保留一筆，否則佇列永遠不會裁切
            recent_window: recent_window.max(1),
            current_session: None,
            current_activity: None,
            activity_start: None,
            stats: ClassTotals::default(),
            recent: VecDeque::with_capacity(recent_window.max(1)),
            context_switches: 0,
            last_classification: None,
            generation: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> Option<&FocusSession> {
        self.current_session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.current_session.is_some()
    }

    pub fn current_activity(&self) -> Option<&Activity> {
        self.current_activity.as_ref()
    }

    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    pub fn stats(&self) -> &ClassTotals {
        &self.stats
    }

    /// Goal and description of the open session, for the classifier.
    pub fn session_context(&self) -> Option<(String, String)> {
        self.current_session
            .as_ref()
            .map(|s| (s.goal.clone(), s.description.clone()))
    }

    /// Bumped by every `start_session`; tells a restarted session apart from its predecessor.
    pub fn session_generation(&self) -> u64 {
        self.generation
    }

    /// Opens a session. A running session is ended (and persisted) first; its summary is returned.
    pub fn start_session(
        &mut self,
        goal: &str,
        description: &str,
        now: DateTime<Local>,
    ) -> Option<SessionSummary> {
        let previous = self.end_session(now);

        self.current_session = Some(FocusSession::new(goal, description, now));
        self.generation += 1;
        self.stats = ClassTotals::default();
        self.context_switches = 0;
        self.recent.clear();
        self.last_classification = None;

        tracing::info!("Focus session started: {}", goal);
        previous
    }

    pub fn end_session(&mut self, now: DateTime<Local>) -> Option<SessionSummary> {
        let mut session = self.current_session.take()?;

        if let Some(activity) = self.close_current_activity(now) {
            session.activities.push(activity);
        }
        session.end_time = Some(now);

        let duration = session.duration(now);
        let score = focus_score(&self.stats, duration);

        let session_id = match self.persist(&session, score) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!("Failed to save session '{}': {}", session.goal, e);
                None
            }
        };

        tracing::info!(
            "Focus session ended: {} ({} activities)",
            session.goal,
            session.activities.len()
        );

        Some(SessionSummary {
            session_id,
            goal: session.goal,
            description: session.description,
            duration,
            context_switches: self.context_switches,
            breakdown: self.stats.breakdown(duration),
            focus_score: score,
            rating: score.map(FocusRating::from_score),
        })
    }

    fn persist(&self, session: &FocusSession, score: Option<f64>) -> crate::Result<i64> {
        let id = self.store.save_session(session, score)?;
        for activity in &session.activities {
            self.store.save_activity(id, activity)?;
        }
        Ok(id)
    }

    /// 結算目前活動的時長並計入統計
    fn close_current_activity(&mut self, now: DateTime<Local>) -> Option<Activity> {
        let mut activity = self.current_activity.take()?;
        let start = self.activity_start.take().unwrap_or(activity.timestamp);
        let duration = now - start;
        activity.duration = Some(duration);
        self.stats.add(activity.classification, duration);
        Some(activity)
    }

    /// Records a window change. Ignored when no session is open.
    pub fn process_window_change(
        &mut self,
        window: &WindowInfo,
        domain: &str,
        verdict: Verdict,
        now: DateTime<Local>,
    ) -> Option<ActivityUpdate> {
        self.current_session.as_ref()?;

        if let Some(finished) = self.close_current_activity(now) {
            if self.recent.len() >= self.recent_window {
                self.recent.pop_front();
            }
            self.recent.push_back(finished.clone());
            if let Some(session) = self.current_session.as_mut() {
                session.activities.push(finished);
            }
        }

        let activity = Activity {
            timestamp: now,
            title: window.title.clone(),
            process: window.process.clone(),
            url: Some(domain.to_string()),
            classification: verdict.classification,
            relevance_score: verdict.score,
            duration: None,
            tags: vec![domain.to_string()],
        };

        if let Some(last) = self.last_classification {
            if last != verdict.classification {
                self.context_switches += 1;
            }
        }
        self.last_classification = Some(verdict.classification);

        self.current_activity = Some(activity.clone());
        self.activity_start = Some(now);

        Some(ActivityUpdate {
            activity,
            focus_percentage: self.recent_focus_percentage(),
            context_switches: self.context_switches,
            alerts: self.check_alerts(),
        })
    }

    fn recent_focus_percentage(&self) -> Option<f64> {
        let (focused, total) = self.recent.iter().fold((0i64, 0i64), |(focused, total), a| {
            let ms = a.duration.map(|d| d.num_milliseconds()).unwrap_or(0);
            let focused = if a.classification == Classification::Direct {
                focused + ms
            } else {
                focused
            };
            (focused, total + ms)
        });

        if total > 0 {
            Some(focused as f64 / total as f64 * 100.0)
        } else {
            None
        }
    }

    fn check_alerts(&self) -> Vec<FocusAlert> {
        let mut alerts = Vec::new();
        if self.recent.len() < ALERT_MIN_RECENT {
            return alerts;
        }

        let distractions = self
            .recent
            .iter()
            .rev()
            .take(DISTRACTION_WINDOW)
            .filter(|a| a.classification == Classification::Distraction)
            .count();
        if distractions >= DISTRACTION_LIMIT {
            alerts.push(FocusAlert::Distractions);
        }

        if self.recent.len() >= DRIFT_WINDOW {
            let average = self
                .recent
                .iter()
                .rev()
                .take(DRIFT_WINDOW)
                .map(|a| a.relevance_score)
                .sum::<f64>()
                / DRIFT_WINDOW as f64;
            if average < DRIFT_THRESHOLD {
                if let Some(session) = &self.current_session {
                    alerts.push(FocusAlert::Drift {
                        goal: session.goal.clone(),
                    });
                }
            }
        }

        if self.context_switches > 0 && self.context_switches % SWITCH_ALERT_EVERY == 0 {
            alerts.push(FocusAlert::HighSwitching(self.context_switches));
        }

        alerts
    }
}
