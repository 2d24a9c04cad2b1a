use async_trait::async_trait;
use chrono::{Duration, Local};
use focus_tracker::core::focus::FocusRating;
use focus_tracker::core::monitor::handle_focus_change;
use focus_tracker::domain::model::{Classification, Verdict, WindowInfo};
use focus_tracker::domain::ports::{ActivityStore, RelevanceClassifier};
use focus_tracker::{FocusTracker, SqliteStore};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_test::assert_ok;

fn window(title: &str, process: &str) -> WindowInfo {
    WindowInfo {
        title: title.to_string(),
        process: process.to_string(),
        pid: None,
    }
}

/// Scores by a fixed title prefix.
struct PrefixClassifier;

#[async_trait]
impl RelevanceClassifier for PrefixClassifier {
    async fn classify(&self, title: &str, _goal: &str, _description: &str, _domain: &str) -> Verdict {
        if title.starts_with("Docs") {
            Verdict::from_classification(Classification::Direct)
        } else {
            Verdict::from_classification(Classification::Distraction)
        }
    }

    fn extract_domain(&self, _title: &str, process: &str) -> String {
        process.to_lowercase()
    }
}

#[test]
fn test_session_is_persisted_to_database_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("focus.db");
    let store = assert_ok!(SqliteStore::open(&db_path));
    let mut tracker = FocusTracker::new(store, 50);

    let t0 = Local::now();
    tracker.start_session("Rust", "ownership chapter", t0);
    tracker.process_window_change(
        &window("Docs - ownership", "firefox"),
        "doc.rust-lang.org",
        Verdict::from_classification(Classification::Direct),
        t0,
    );
    let update = tracker
        .process_window_change(
            &window("Videos", "firefox"),
            "youtube.com",
            Verdict::from_classification(Classification::Distraction),
            t0 + Duration::seconds(60),
        )
        .unwrap();
    assert_eq!(update.context_switches, 1);

    let summary = tracker.end_session(t0 + Duration::seconds(120)).unwrap();
    assert!(summary.session_id.is_some());
    assert_eq!(summary.focus_score, Some(5.0));
    assert_eq!(summary.rating, Some(FocusRating::Fair));
    drop(tracker);

    // 重新開啟檔案確認資料已寫入
    let reopened = assert_ok!(SqliteStore::open(&db_path));
    let sessions = assert_ok!(reopened.recent_sessions(10));
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].goal, "Rust");
    assert_eq!(sessions[0].total_duration, Some(120));
    assert_eq!(sessions[0].focus_score, Some(5.0));

    let activities = assert_ok!(reopened.session_activities(sessions[0].id));
    assert_eq!(activities.len(), 2);
    assert_eq!(activities[0].classification, "DIRECT");
    assert_eq!(activities[0].duration, Some(60));
    assert_eq!(activities[1].classification, "DISTRACTION");
    assert_eq!(activities[1].duration, Some(60));
}

#[tokio::test]
async fn test_window_changes_flow_through_classifier() {
    let store = SqliteStore::open_in_memory().unwrap();
    let tracker = Mutex::new(FocusTracker::new(store, 50));
    let classifier = PrefixClassifier;

    assert!(handle_focus_change(&tracker, &classifier, &window("Docs", "firefox"))
        .await
        .is_none());

    tracker.lock().await.start_session("Study", "", Local::now());

    let first = handle_focus_change(&tracker, &classifier, &window("Docs - tokio", "Firefox"))
        .await
        .unwrap();
    assert_eq!(first.activity.classification, Classification::Direct);
    assert_eq!(first.activity.url.as_deref(), Some("firefox"));

    let second = handle_focus_change(&tracker, &classifier, &window("Feed", "Slack"))
        .await
        .unwrap();
    assert_eq!(second.activity.classification, Classification::Distraction);
    assert_eq!(second.context_switches, 1);

    let summary = tracker.lock().await.end_session(Local::now()).unwrap();
    let id = summary.session_id.unwrap();
    let stored = assert_ok!(tracker.lock().await.store().session_activities(id));
    assert_eq!(stored.len(), 2);
}
