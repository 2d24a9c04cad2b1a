//! SQLite persistence for sessions and activities.

use crate::domain::model::{Activity, FocusSession, StoredActivity, StoredSession};
use crate::domain::ports::ActivityStore;
use crate::utils::error::{FocusError, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    goal TEXT NOT NULL,
    description TEXT,
    start_time TIMESTAMP NOT NULL,
    end_time TIMESTAMP,
    total_duration INTEGER,
    focus_score REAL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER,
    timestamp TIMESTAMP NOT NULL,
    title TEXT NOT NULL,
    process TEXT NOT NULL,
    url TEXT,
    classification TEXT NOT NULL,
    relevance_score REAL NOT NULL,
    duration INTEGER,
    tags TEXT,
    FOREIGN KEY (session_id) REFERENCES sessions (id)
);

CREATE INDEX IF NOT EXISTS idx_activities_session ON activities(session_id);
"#;

/// Single connection guarded by a mutex; the tracker writes rarely.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and creates if needed) the database file and its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!("Opened focus database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| FocusError::SessionError {
            message: format!("database lock poisoned: {}", e),
        })
    }
}

impl ActivityStore for SqliteStore {
    fn save_session(&self, session: &FocusSession, focus_score: Option<f64>) -> Result<i64> {
        let conn = self.conn()?;
        let total_duration = session
            .end_time
            .map(|end| (end - session.start_time).num_seconds());

        conn.execute(
            "INSERT INTO sessions (goal, description, start_time, end_time, total_duration, focus_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.goal,
                session.description,
                session.start_time.to_rfc3339(),
                session.end_time.map(|t| t.to_rfc3339()),
                total_duration,
                focus_score,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn save_activity(&self, session_id: i64, activity: &Activity) -> Result<()> {
        let conn = self.conn()?;
        let tags = if activity.tags.is_empty() {
            None
        } else {
            Some(activity.tags.join(","))
        };

        conn.execute(
            "INSERT INTO activities
             (session_id, timestamp, title, process, url, classification, relevance_score, duration, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session_id,
                activity.timestamp.to_rfc3339(),
                activity.title,
                activity.process,
                activity.url,
                activity.classification.as_str(),
                activity.relevance_score,
                activity.duration.map(|d| d.num_seconds()),
                tags,
            ],
        )?;
        Ok(())
    }

    fn recent_sessions(&self, limit: usize) -> Result<Vec<StoredSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, goal, description, start_time, end_time, total_duration, focus_score
             FROM sessions ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredSession {
                id: row.get(0)?,
                goal: row.get(1)?,
                description: row.get(2)?,
                start_time: row.get(3)?,
                end_time: row.get(4)?,
                total_duration: row.get(5)?,
                focus_score: row.get(6)?,
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn session_activities(&self, session_id: i64) -> Result<Vec<StoredActivity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, title, process, url, classification, relevance_score, duration, tags
             FROM activities WHERE session_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let tags: Option<String> = row.get(8)?;
            Ok(StoredActivity {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                title: row.get(2)?,
                process: row.get(3)?,
                url: row.get(4)?,
                classification: row.get(5)?,
                relevance_score: row.get(6)?,
                duration: row.get(7)?,
                tags: tags
                    .map(|t| t.split(',').map(str::to_string).collect())
                    .unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Classification;
    use chrono::{Duration, Local};

    #[test]
    fn test_session_roundtrip_through_listing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let start = Local::now();
        let mut session = FocusSession::new("Rust", "lifetimes", start);
        session.end_time = Some(start + Duration::seconds(300));

        let id = store.save_session(&session, Some(7.5)).unwrap();
        store
            .save_activity(
                id,
                &Activity {
                    timestamp: start,
                    title: "The Rust Book".to_string(),
                    process: "firefox".to_string(),
                    url: Some("doc.rust-lang.org".to_string()),
                    classification: Classification::Direct,
                    relevance_score: 0.9,
                    duration: Some(Duration::seconds(300)),
                    tags: vec!["doc.rust-lang.org".to_string(), "book".to_string()],
                },
            )
            .unwrap();

        let sessions = store.recent_sessions(10).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].total_duration, Some(300));
        assert_eq!(sessions[0].focus_score, Some(7.5));

        let activities = store.session_activities(id).unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].classification, "DIRECT");
        assert_eq!(activities[0].tags, vec!["doc.rust-lang.org", "book"]);
    }

    #[test]
    fn test_open_session_has_no_duration() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = FocusSession::new("Open", "", Local::now());
        store.save_session(&session, None).unwrap();

        let sessions = store.recent_sessions(1).unwrap();
        assert_eq!(sessions[0].end_time, None);
        assert_eq!(sessions[0].total_duration, None);
    }
}
