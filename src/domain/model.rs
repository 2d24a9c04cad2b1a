use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an activity relates to the goal of the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Direct,
    Peripheral,
    Indirect,
    Distraction,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::Direct,
        Classification::Peripheral,
        Classification::Indirect,
        Classification::Distraction,
    ];

    /// Fixed score used when the class comes from the LLM instead of the rules.
    pub fn score(self) -> f64 {
        match self {
            Classification::Direct => 0.9,
            Classification::Peripheral => 0.7,
            Classification::Indirect => 0.4,
            Classification::Distraction => 0.1,
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Classification::Direct
        } else if score >= 0.6 {
            Classification::Peripheral
        } else if score >= 0.3 {
            Classification::Indirect
        } else {
            Classification::Distraction
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Direct => "DIRECT",
            Classification::Peripheral => "PERIPHERAL",
            Classification::Indirect => "INDIRECT",
            Classification::Distraction => "DISTRACTION",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Classification::Direct => "🟢",
            Classification::Peripheral => "🟡",
            Classification::Indirect => "🟠",
            Classification::Distraction => "🔴",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT" => Ok(Classification::Direct),
            "PERIPHERAL" => Ok(Classification::Peripheral),
            "INDIRECT" => Ok(Classification::Indirect),
            "DISTRACTION" => Ok(Classification::Distraction),
            other => Err(format!("unknown classification '{}'", other)),
        }
    }
}

/// Result of scoring one window against a goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub classification: Classification,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            classification: Classification::from_score(score),
        }
    }

    pub fn from_classification(classification: Classification) -> Self {
        Self {
            score: classification.score(),
            classification,
        }
    }
}

/// The foreground window as reported by the platform probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub process: String,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub timestamp: DateTime<Local>,
    pub title: String,
    pub process: String,
    pub url: Option<String>,
    pub classification: Classification,
    pub relevance_score: f64,
    pub duration: Option<Duration>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FocusSession {
    pub goal: String,
    pub description: String,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    pub activities: Vec<Activity>,
}

impl FocusSession {
    pub fn new(goal: impl Into<String>, description: impl Into<String>, start_time: DateTime<Local>) -> Self {
        Self {
            goal: goal.into(),
            description: description.into(),
            start_time,
            end_time: None,
            activities: Vec::new(),
        }
    }

    /// Elapsed time; open sessions are measured up to `now`.
    pub fn duration(&self, now: DateTime<Local>) -> Duration {
        self.end_time.unwrap_or(now) - self.start_time
    }
}

/// One visited page read from a browser profile.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub visit_count: i64,
    pub timestamp: DateTime<Local>,
}

/// A persisted session row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSession {
    pub id: i64,
    pub goal: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_duration: Option<i64>,
    pub focus_score: Option<f64>,
}

/// A persisted activity row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredActivity {
    pub id: i64,
    pub timestamp: String,
    pub title: String,
    pub process: String,
    pub url: Option<String>,
    pub classification: String,
    pub relevance_score: f64,
    pub duration: Option<i64>,
    pub tags: Vec<String>,
}
