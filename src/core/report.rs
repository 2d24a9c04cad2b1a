//! Text rendering for activity lines, session summaries and status output.

use crate::core::focus::{ActivityUpdate, ClassTotals, FocusAlert, FocusRating, SessionSummary};
use crate::domain::model::{Classification, FocusSession, HistoryEntry, StoredActivity, StoredSession};
use chrono::{DateTime, Duration, Local};

pub const RULE_WIDTH: usize = 60;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// `1h 05m` for long spans, `3m 07s` otherwise.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m {:02}s", minutes, seconds)
    }
}

/// Cuts to `max` characters and appends `...` when something was cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

pub fn clock(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

pub fn render_activity(update: &ActivityUpdate) -> String {
    let activity = &update.activity;
    let mut lines = vec![
        format!(
            "[{}] {} {} ({:.2})",
            clock(&activity.timestamp),
            activity.classification.emoji(),
            activity.classification,
            activity.relevance_score
        ),
        format!("🌐 {}: \"{}\"", activity.process, truncate(&activity.title, 60)),
    ];

    if let Some(percentage) = update.focus_percentage {
        lines.push(format!(
            "📊 Session Focus: {:.1}% | Switches: {}",
            percentage, update.context_switches
        ));
    }

    for alert in &update.alerts {
        lines.push(render_alert(alert));
    }

    lines.join("\n")
}

pub fn render_alert(alert: &FocusAlert) -> String {
    match alert {
        FocusAlert::Distractions => "⚠️  FOCUS ALERT: Multiple distractions detected".to_string(),
        FocusAlert::Drift { goal } => {
            format!("🤔 DRIFT DETECTED: Low relevance to goal \"{}\"", goal)
        }
        FocusAlert::HighSwitching(count) => {
            format!("🔄 HIGH SWITCHING: {} context switches", count)
        }
    }
}

pub fn render_session_start(session: &FocusSession) -> String {
    [
        "🎯 FOCUS SESSION STARTED".to_string(),
        format!("Goal: {}", session.goal),
        format!("Description: {}", session.description),
        format!("Started: {}", clock(&session.start_time)),
        rule(),
    ]
    .join("\n")
}

fn rating_line(rating: FocusRating) -> &'static str {
    match rating {
        FocusRating::Excellent => "✅ EXCELLENT focus session!",
        FocusRating::Good => "👍 GOOD focus session",
        FocusRating::Fair => "⚠️  FAIR - room for improvement",
        FocusRating::Low => "❌ LOW focus - consider strategies to reduce distractions",
    }
}

pub fn render_summary(summary: &SessionSummary) -> String {
    let mut lines = vec![
        "🧠 FOCUS SESSION SUMMARY".to_string(),
        rule(),
        format!("🎯 Goal: {}", summary.goal),
        format!("📝 Description: {}", summary.description),
        format!("⏱️  Duration: {}", format_duration(summary.duration)),
        format!("🔄 Context Switches: {}", summary.context_switches),
        String::new(),
        "📊 RELEVANCE BREAKDOWN:".to_string(),
    ];

    for (classification, spent, percentage) in &summary.breakdown {
        lines.push(format!(
            "  {} {:12}: {:>8} | {:>5.1}%",
            classification.emoji(),
            classification.as_str(),
            format_duration(*spent),
            percentage
        ));
    }

    if let (Some(score), Some(rating)) = (summary.focus_score, summary.rating) {
        lines.push(String::new());
        lines.push(format!("🎯 FOCUS SCORE: {:.1}/10", score));
        lines.push(rating_line(rating).to_string());
    }

    if let Some(id) = summary.session_id {
        lines.push(format!("💾 Saved as session #{}", id));
    }

    lines.join("\n")
}

pub fn render_status(session: &FocusSession, context_switches: u32, now: DateTime<Local>) -> String {
    [
        format!("🎯 Active Session: {}", session.goal),
        format!("📝 Description: {}", session.description),
        format!("⏱️  Duration: {}", format_duration(session.duration(now))),
        format!("🔄 Context Switches: {}", context_switches),
    ]
    .join("\n")
}

pub fn render_stats(totals: &ClassTotals, total: Duration) -> String {
    let mut lines = vec!["📊 Current Session Stats:".to_string()];
    for (classification, spent, percentage) in totals.breakdown(total) {
        lines.push(format!(
            "  {} {}: {} ({:.1}%)",
            classification.emoji(),
            classification,
            format_duration(spent),
            percentage
        ));
    }
    lines.join("\n")
}

/// Host part of a URL, or the URL itself when it has none.
pub fn url_domain(url: &str) -> String {
    if let Some(host) = url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        return host;
    }
    url.split('/').nth(2).unwrap_or(url).to_string()
}

pub fn render_history(browser: &str, entries: &[HistoryEntry], limit: usize) -> String {
    let mut lines = vec![format!("📊 {} - Recent Activity:", browser)];
    for entry in entries.iter().take(limit) {
        lines.push(format!(
            "  [{}] {} - {}",
            clock(&entry.timestamp),
            url_domain(&entry.url),
            truncate(&entry.title, 50)
        ));
    }
    lines.join("\n")
}

pub fn render_stored_sessions(sessions: &[StoredSession]) -> String {
    if sessions.is_empty() {
        return "No stored sessions".to_string();
    }
    let mut lines = Vec::with_capacity(sessions.len());
    for s in sessions {
        let duration = s
            .total_duration
            .map(|secs| format_duration(Duration::seconds(secs)))
            .unwrap_or_else(|| "-".to_string());
        let score = s
            .focus_score
            .map(|v| format!("{:.1}/10", v))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "#{:<4} {}  {:>8}  {:>7}  {}",
            s.id, s.start_time, duration, score, s.goal
        ));
    }
    lines.join("\n")
}

pub fn render_stored_activities(activities: &[StoredActivity]) -> String {
    if activities.is_empty() {
        return "No activities recorded".to_string();
    }
    activities
        .iter()
        .map(|a| {
            let emoji = a
                .classification
                .parse::<Classification>()
                .map(Classification::emoji)
                .unwrap_or("⚪");
            let duration = a
                .duration
                .map(|secs| format_duration(Duration::seconds(secs)))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "  {} {} {:>8}  {}: {}",
                emoji,
                a.timestamp,
                duration,
                a.process,
                truncate(&a.title, 60)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
