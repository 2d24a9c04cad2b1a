use chrono::{Duration, Utc};
use focus_tracker::adapters::browser::{Browser, HistoryReader};
use focus_tracker::app::history::analyze_recent_history;
use rusqlite::{params, Connection};
use std::path::Path;
use tempfile::TempDir;

const WEBKIT_OFFSET_US: i64 = 11_644_473_600_000_000;

fn micros_ago(minutes: i64) -> i64 {
    (Utc::now() - Duration::minutes(minutes)).timestamp_micros()
}

fn create_db(path: &Path, schema: &str) -> Connection {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(schema).unwrap();
    conn
}

fn seed_chrome(reader: &HistoryReader) {
    let path = reader.chromium_paths(Browser::Chrome).remove(0);
    let conn = create_db(
        &path,
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT NOT NULL, title TEXT,
                            visit_count INTEGER NOT NULL, last_visit_time INTEGER NOT NULL);",
    );
    let rows = [
        ("https://doc.rust-lang.org/book/ch04-01.html", "What is Ownership?", 3, 5),
        ("https://github.com/tokio-rs/tokio", "", 1, 15),
        ("https://news.ycombinator.com/", "Hacker News", 9, 60),
    ];
    for (url, title, visits, minutes) in rows {
        conn.execute(
            "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, title, visits, micros_ago(minutes) + WEBKIT_OFFSET_US],
        )
        .unwrap();
    }
}

fn seed_firefox(reader: &HistoryReader) {
    let path = reader
        .firefox_profiles_dir()
        .unwrap()
        .join("abcd.default-release")
        .join("places.sqlite");
    let conn = create_db(
        &path,
        "CREATE TABLE moz_places (id INTEGER PRIMARY KEY, url TEXT NOT NULL, title TEXT,
                                  visit_count INTEGER NOT NULL, last_visit_date INTEGER);",
    );
    conn.execute(
        "INSERT INTO moz_places (url, title, visit_count, last_visit_date) VALUES (?1, ?2, ?3, ?4)",
        params!["https://en.wikipedia.org/wiki/Borrow_checker", "Borrow checker", 2, micros_ago(2)],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO moz_places (url, title, visit_count, last_visit_date) VALUES (?1, NULL, 0, NULL)",
        params!["https://never.visited.example/"],
    )
    .unwrap();
}

#[test]
fn test_chrome_history_newest_first_with_limit() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 2);
    seed_chrome(&reader);

    let entries = reader.history(Browser::Chrome);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "What is Ownership?");
    assert_eq!(entries[0].visit_count, 3);
    assert_eq!(entries[1].title, "No Title");
    assert!(entries[0].timestamp > entries[1].timestamp);
}

#[test]
fn test_firefox_skips_unvisited_places() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 50);
    seed_firefox(&reader);

    let entries = reader.history(Browser::Firefox);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, "https://en.wikipedia.org/wiki/Borrow_checker");
}

#[test]
fn test_missing_browsers_yield_nothing() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 50);

    for browser in Browser::ALL {
        assert!(reader.history(browser).is_empty());
    }
}

#[test]
fn test_corrupt_database_is_skipped() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 50);
    let path = reader.chromium_paths(Browser::Edge).remove(0);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not a sqlite database").unwrap();

    assert!(reader.history(Browser::Edge).is_empty());
}

#[test]
fn test_digest_lists_each_browser_with_domains() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 50);
    seed_chrome(&reader);
    seed_firefox(&reader);

    let digest = analyze_recent_history(&reader, 2);

    assert!(digest.contains("Chrome - Recent Activity"));
    assert!(digest.contains("Firefox - Recent Activity"));
    assert!(digest.contains("doc.rust-lang.org"));
    assert!(digest.contains("en.wikipedia.org - Borrow checker"));
    // display_limit 2，第三筆不顯示
    assert!(!digest.contains("news.ycombinator.com"));
}

/// Seconds since 2001-01-01 for 2023-11-14T22:13:20Z (Unix 1_700_000_000).
const SAFARI_VISIT_S: f64 = 1_700_000_000.0 - 978_307_200.0;

#[test]
fn test_safari_history_uses_core_data_epoch() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 2);
    let path = home.path().join("Library").join("Safari").join("History.db");
    let conn = create_db(
        &path,
        "CREATE TABLE history_items (id INTEGER PRIMARY KEY, url TEXT NOT NULL, visit_count INTEGER NOT NULL);
         CREATE TABLE history_visits (id INTEGER PRIMARY KEY, history_item INTEGER NOT NULL,
                                      title TEXT, visit_time REAL NOT NULL);",
    );
    let items = [
        (1, "https://developer.apple.com/documentation/swift", 4),
        (2, "https://www.rust-lang.org/learn", 7),
        (3, "https://www.reddit.com/", 12),
    ];
    for (id, url, visits) in items {
        conn.execute(
            "INSERT INTO history_items (id, url, visit_count) VALUES (?1, ?2, ?3)",
            params![id, url, visits],
        )
        .unwrap();
    }
    let visits: [(i64, Option<&str>, f64); 3] = [
        (1, Some("Swift Documentation"), SAFARI_VISIT_S - 600.0),
        (2, None, SAFARI_VISIT_S),
        (3, Some("reddit"), SAFARI_VISIT_S - 3600.0),
    ];
    for (item, title, time) in visits {
        conn.execute(
            "INSERT INTO history_visits (history_item, title, visit_time) VALUES (?1, ?2, ?3)",
            params![item, title, time],
        )
        .unwrap();
    }
    drop(conn);

    let entries = reader.read_safari(&path).unwrap();

    // limit 2，最舊的 reddit 不在結果內
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, "https://www.rust-lang.org/learn");
    assert_eq!(entries[0].title, "No Title");
    assert_eq!(entries[0].visit_count, 7);
    assert_eq!(entries[0].timestamp.timestamp(), 1_700_000_000);
    assert_eq!(entries[1].title, "Swift Documentation");
    assert_eq!(entries[1].timestamp.timestamp(), 1_700_000_000 - 600);
}

fn pragma(conn: &Connection, sql: &str) {
    let mut stmt = conn.prepare(sql).unwrap();
    let mut rows = stmt.query([]).unwrap();
    rows.next().unwrap();
}

#[test]
fn test_visits_still_in_wal_are_read() {
    let home = TempDir::new().unwrap();
    let reader = HistoryReader::with_home(home.path(), 10);
    let path = reader.chromium_paths(Browser::Chrome).remove(0);
    let conn = create_db(
        &path,
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT NOT NULL, title TEXT,
                            visit_count INTEGER NOT NULL, last_visit_time INTEGER NOT NULL);",
    );
    conn.execute(
        "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, ?2, 1, ?3)",
        params!["https://old.example/", "Old page", micros_ago(60) + WEBKIT_OFFSET_US],
    )
    .unwrap();
    pragma(&conn, "PRAGMA journal_mode=WAL");
    pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)");
    pragma(&conn, "PRAGMA wal_autocheckpoint=0");

    // 瀏覽器還開著：新的造訪只寫進 History-wal
    conn.execute(
        "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, ?2, 1, ?3)",
        params!["https://docs.rs/tokio", "tokio - Rust", micros_ago(1) + WEBKIT_OFFSET_US],
    )
    .unwrap();
    let mut wal = path.clone().into_os_string();
    wal.push("-wal");
    assert!(std::fs::metadata(&wal).unwrap().len() > 0);

    let entries = reader.history(Browser::Chrome);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, "https://docs.rs/tokio");
    assert_eq!(entries[1].url, "https://old.example/");
    drop(conn);
}
