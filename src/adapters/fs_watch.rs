//! File system activity under the watched directories.

use crate::config::FilesConfig;
use crate::utils::error::Result;
use chrono::Local;
use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Modified,
    Deleted,
}

impl FileAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FileAction::Created => "CREATED",
            FileAction::Modified => "MODIFIED",
            FileAction::Deleted => "DELETED",
        }
    }

    /// Directory events and access notifications map to `None`.
    pub fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => None,
            EventKind::Create(_) => Some(FileAction::Created),
            EventKind::Modify(_) => Some(FileAction::Modified),
            EventKind::Remove(_) => Some(FileAction::Deleted),
            _ => None,
        }
    }
}

/// Drops temp files, hidden files and bursts of events for the same path.
#[derive(Debug)]
pub struct FileChangeFilter {
    ignored_extensions: HashSet<String>,
    cooldown: Duration,
    last_reported: HashMap<PathBuf, Instant>,
}

impl FileChangeFilter {
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            ignored_extensions: config
                .ignored_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            cooldown: Duration::from_millis(config.cooldown_ms),
            last_reported: HashMap::new(),
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        if hidden {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.ignored_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn should_report(&mut self, path: &Path, now: Instant) -> bool {
        if self.is_ignored(path) {
            return false;
        }

        if let Some(last) = self.last_reported.get(path) {
            if now.duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_reported.insert(path.to_path_buf(), now);
        true
    }
}

pub struct FileActivityWatcher {
    paths: Vec<PathBuf>,
    filter: FileChangeFilter,
}

impl FileActivityWatcher {
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            paths: config.resolved_watch_paths(),
            filter: FileChangeFilter::new(config),
        }
    }

    fn start_watcher(&self) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<notify::Result<Event>>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // 接收端關閉時直接丟棄
            let _ = tx.send(res);
        })?;

        for path in &self.paths {
            if !path.exists() {
                tracing::debug!("Skipping missing watch path {}", path.display());
                continue;
            }
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => println!("📁 Monitoring: {}", path.display()),
                Err(e) => tracing::warn!("Cannot watch {}: {}", path.display(), e),
            }
        }
        Ok((watcher, rx))
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (_watcher, mut events) = self.start_watcher()?;

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(Ok(event)) => self.report(&event),
                        Some(Err(e)) => tracing::warn!("File watch error: {}", e),
                        None => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn report(&mut self, event: &Event) {
        let Some(action) = FileAction::from_event(&event.kind) else {
            return;
        };

        let now = Instant::now();
        for path in &event.paths {
            if path.is_dir() || !self.filter.should_report(path, now) {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            println!(
                "[{}] FILE {}: {}",
                Local::now().format("%H:%M:%S"),
                action.as_str(),
                name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, ModifyKind};

    fn filter() -> FileChangeFilter {
        FileChangeFilter::new(&FilesConfig {
            cooldown_ms: 1000,
            ..FilesConfig::default()
        })
    }

    #[test]
    fn test_ignored_files() {
        let f = filter();
        assert!(f.is_ignored(Path::new("/tmp/a/build.log")));
        assert!(f.is_ignored(Path::new("/tmp/a/.notes.md.swp")));
        assert!(f.is_ignored(Path::new("/tmp/a/.hidden")));
        assert!(f.is_ignored(Path::new("/tmp/a/Cargo.LOCK")));
        assert!(!f.is_ignored(Path::new("/tmp/a/main.rs")));
    }

    #[test]
    fn test_cooldown_per_path() {
        let mut f = filter();
        let t0 = Instant::now();
        let path = Path::new("/tmp/a/main.rs");

        assert!(f.should_report(path, t0));
        assert!(!f.should_report(path, t0 + Duration::from_millis(500)));
        assert!(f.should_report(Path::new("/tmp/a/lib.rs"), t0 + Duration::from_millis(500)));
        assert!(f.should_report(path, t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            FileAction::from_event(&EventKind::Create(CreateKind::File)),
            Some(FileAction::Created)
        );
        assert_eq!(
            FileAction::from_event(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(FileAction::Modified)
        );
        assert_eq!(FileAction::from_event(&EventKind::Create(CreateKind::Folder)), None);
        assert_eq!(FileAction::from_event(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }
}
