use crate::domain::model::{
    Activity, FocusSession, StoredActivity, StoredSession, Verdict, WindowInfo,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Reports the window that currently has input focus.
#[async_trait]
pub trait WindowProbe: Send + Sync {
    async fn active_window(&self) -> Result<Option<WindowInfo>>;
}

/// Scores a window title against the goal of a session.
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    async fn classify(&self, title: &str, goal: &str, description: &str, domain: &str) -> Verdict;

    fn extract_domain(&self, title: &str, process: &str) -> String;
}

pub trait ActivityStore: Send + Sync {
    fn save_session(&self, session: &FocusSession, focus_score: Option<f64>) -> Result<i64>;
    fn save_activity(&self, session_id: i64, activity: &Activity) -> Result<()>;
    fn recent_sessions(&self, limit: usize) -> Result<Vec<StoredSession>>;
    fn session_activities(&self, session_id: i64) -> Result<Vec<StoredActivity>>;
}

/// A program invocation, kept as data so it can be printed or recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

/// Runs host programs; swapped for a recorder in tests.
pub trait CommandRunner: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome>;
}
