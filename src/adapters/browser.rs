//! Read-only access to local browser history databases.

use crate::domain::model::HistoryEntry;
use crate::utils::error::Result;
use chrono::{DateTime, Local, TimeZone};
use rusqlite::{params, Connection};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Microseconds between 1601-01-01 (WebKit epoch) and the Unix epoch.
const WEBKIT_EPOCH_OFFSET_US: i64 = 11_644_473_600_000_000;
/// Seconds between the Unix epoch and 2001-01-01 (Core Data epoch).
const MAC_EPOCH_OFFSET_S: f64 = 978_307_200.0;

const NO_TITLE: &str = "No Title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub const ALL: [Browser; 4] = [Browser::Chrome, Browser::Firefox, Browser::Safari, Browser::Edge];

    pub fn name(self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
        }
    }
}

pub fn webkit_to_local(micros: i64) -> Option<DateTime<Local>> {
    unix_micros_to_local(micros - WEBKIT_EPOCH_OFFSET_US)
}

pub fn unix_micros_to_local(micros: i64) -> Option<DateTime<Local>> {
    Local.timestamp_micros(micros).single()
}

pub fn mac_seconds_to_local(seconds: f64) -> Option<DateTime<Local>> {
    let micros = ((seconds + MAC_EPOCH_OFFSET_S) * 1_000_000.0) as i64;
    unix_micros_to_local(micros)
}

/// Locates and reads history for each supported browser.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    home: PathBuf,
    local_data: Option<PathBuf>,
    roaming_data: Option<PathBuf>,
    limit: usize,
}

impl HistoryReader {
    pub fn new(limit: usize) -> Self {
        Self {
            home: dirs::home_dir().unwrap_or_default(),
            local_data: dirs::data_local_dir(),
            roaming_data: dirs::data_dir(),
            limit,
        }
    }

    /// Reader rooted at `home`, for profiles laid out like the current OS.
    pub fn with_home(home: impl Into<PathBuf>, limit: usize) -> Self {
        let home = home.into();
        Self {
            local_data: Some(home.join("AppData").join("Local")),
            roaming_data: Some(home.join("AppData").join("Roaming")),
            home,
            limit,
        }
    }

    pub fn chromium_paths(&self, browser: Browser) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if cfg!(windows) {
            if let Some(local) = &self.local_data {
                let vendor = match browser {
                    Browser::Edge => local.join("Microsoft").join("Edge"),
                    _ => local.join("Google").join("Chrome"),
                };
                paths.push(vendor.join("User Data").join("Default").join("History"));
            }
        } else if cfg!(target_os = "macos") {
            let vendor = match browser {
                Browser::Edge => "Microsoft Edge",
                _ => "Google/Chrome",
            };
            paths.push(
                self.home
                    .join("Library/Application Support")
                    .join(vendor)
                    .join("Default/History"),
            );
        } else {
            let vendor = match browser {
                Browser::Edge => "microsoft-edge",
                _ => "google-chrome",
            };
            paths.push(self.home.join(".config").join(vendor).join("Default/History"));
        }
        paths
    }

    pub fn firefox_profiles_dir(&self) -> Option<PathBuf> {
        if cfg!(windows) {
            self.roaming_data
                .as_ref()
                .map(|d| d.join("Mozilla").join("Firefox").join("Profiles"))
        } else if cfg!(target_os = "macos") {
            Some(self.home.join("Library/Application Support/Firefox/Profiles"))
        } else {
            Some(self.home.join(".mozilla/firefox"))
        }
    }

    pub fn history(&self, browser: Browser) -> Vec<HistoryEntry> {
        match browser {
            Browser::Chrome | Browser::Edge => self.first_readable(browser, &self.chromium_paths(browser), |p| {
                self.read_chromium(p)
            }),
            Browser::Firefox => {
                let profiles = self
                    .firefox_profiles_dir()
                    .map(|dir| list_places_databases(&dir))
                    .unwrap_or_default();
                self.first_readable(browser, &profiles, |p| self.read_firefox(p))
            }
            Browser::Safari => {
                if !cfg!(target_os = "macos") {
                    return Vec::new();
                }
                let path = self.home.join("Library/Safari/History.db");
                self.first_readable(browser, &[path], |p| self.read_safari(p))
            }
        }
    }

    fn first_readable<F>(&self, browser: Browser, paths: &[PathBuf], read: F) -> Vec<HistoryEntry>
    where
        F: Fn(&Path) -> Result<Vec<HistoryEntry>>,
    {
        for path in paths.iter().filter(|p| p.exists()) {
            match read(path) {
                Ok(entries) => return entries,
                Err(e) => tracing::warn!("Error reading {} history at {}: {}", browser.name(), path.display(), e),
            }
        }
        Vec::new()
    }

    /// The browser keeps the file locked, so work on a private copy.
    fn open_copy(&self, path: &Path) -> Result<HistoryCopy> {
        let dir = tempfile::tempdir()?;
        let name = path.file_name().unwrap_or_else(|| OsStr::new("history.db"));
        let copy = dir.path().join(name);
        std::fs::copy(path, &copy)?;

        // 最近的造訪常常還在 WAL 裡，沒有一起複製就讀不到
        let wal = sidecar(path, "-wal");
        if wal.exists() {
            std::fs::copy(&wal, sidecar(&copy, "-wal"))?;
        }

        // 可寫開啟才能套用 WAL；這是私有副本
        let conn = Connection::open(&copy)?;
        Ok(HistoryCopy { conn, _dir: dir })
    }

    pub fn read_chromium(&self, path: &Path) -> Result<Vec<HistoryEntry>> {
        let copy = self.open_copy(path)?;
        let conn = &copy.conn;
        let mut stmt = conn.prepare(
            "SELECT url, title, visit_count, last_visit_time
             FROM urls ORDER BY last_visit_time DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![self.limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (url, title, visit_count, visited) = row?;
            if let Some(timestamp) = webkit_to_local(visited) {
                entries.push(entry(url, title, visit_count, timestamp));
            }
        }
        Ok(entries)
    }

    pub fn read_firefox(&self, path: &Path) -> Result<Vec<HistoryEntry>> {
        let copy = self.open_copy(path)?;
        let conn = &copy.conn;
        let mut stmt = conn.prepare(
            "SELECT url, title, visit_count, last_visit_date
             FROM moz_places
             WHERE last_visit_date IS NOT NULL
             ORDER BY last_visit_date DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![self.limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (url, title, visit_count, visited) = row?;
            if visited == 0 {
                continue;
            }
            if let Some(timestamp) = unix_micros_to_local(visited) {
                entries.push(entry(url, title, visit_count, timestamp));
            }
        }
        Ok(entries)
    }

    pub fn read_safari(&self, path: &Path) -> Result<Vec<HistoryEntry>> {
        let copy = self.open_copy(path)?;
        let conn = &copy.conn;
        let mut stmt = conn.prepare(
            "SELECT hi.url, hv.title, hi.visit_count, hv.visit_time
             FROM history_visits hv
             JOIN history_items hi ON hv.history_item = hi.id
             ORDER BY hv.visit_time DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![self.limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (url, title, visit_count, visited) = row?;
            if let Some(timestamp) = mac_seconds_to_local(visited) {
                entries.push(entry(url, title, visit_count, timestamp));
            }
        }
        Ok(entries)
    }
}

/// Connection to a copied database; the copy is removed on drop.
struct HistoryCopy {
    conn: Connection,
    _dir: TempDir,
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn entry(url: String, title: Option<String>, visit_count: i64, timestamp: DateTime<Local>) -> HistoryEntry {
    let title = title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());
    HistoryEntry {
        url,
        title,
        visit_count,
        timestamp,
    }
}

/// `places.sqlite` of every profile directory, sorted for a stable pick.
pub fn list_places_databases(profiles_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(profiles_dir) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path().join("places.sqlite"))
        .filter(|p| p.exists())
        .collect();
    found.sort();
    found
}
