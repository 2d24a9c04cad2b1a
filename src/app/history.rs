//! One-shot views: browser history digest and stored sessions.

use crate::adapters::browser::{Browser, HistoryReader};
use crate::adapters::sqlite::SqliteStore;
use crate::config::TrackerConfig;
use crate::core::report;
use crate::domain::ports::ActivityStore;
use crate::utils::error::Result;

/// Recent entries of every browser that has readable history.
pub fn analyze_recent_history(reader: &HistoryReader, display_limit: usize) -> String {
    let sections: Vec<String> = Browser::ALL
        .iter()
        .filter_map(|browser| {
            let entries = reader.history(*browser);
            if entries.is_empty() {
                None
            } else {
                Some(report::render_history(browser.name(), &entries, display_limit))
            }
        })
        .collect();

    if sections.is_empty() {
        "📊 No browser history found".to_string()
    } else {
        sections.join("\n\n")
    }
}

pub async fn run_history(config: &TrackerConfig) -> Result<()> {
    let reader = HistoryReader::new(config.browser.query_limit);
    let limit = config.browser.display_limit;
    // rusqlite 是同步 API，丟到 blocking 執行緒
    let digest = tokio::task::spawn_blocking(move || analyze_recent_history(&reader, limit)).await?;
    println!("{}", digest);
    Ok(())
}

pub fn session_listing<S: ActivityStore>(store: &S, limit: usize, id: Option<i64>) -> Result<String> {
    match id {
        Some(id) => {
            let activities = store.session_activities(id)?;
            Ok(format!(
                "📋 Session #{}\n{}",
                id,
                report::render_stored_activities(&activities)
            ))
        }
        None => {
            let sessions = store.recent_sessions(limit)?;
            Ok(format!(
                "📋 Recent Sessions\n{}\n{}",
                report::rule(),
                report::render_stored_sessions(&sessions)
            ))
        }
    }
}

pub fn run_sessions(config: &TrackerConfig, limit: usize, id: Option<i64>) -> Result<()> {
    let store = SqliteStore::open(&config.database.path)?;
    println!("{}", session_listing(&store, limit, id)?);
    Ok(())
}
