//! Event coalescing: one editor save usually yields several notify events.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::debug;
use crate::utils::path::normalize_path;

/// Quiet period before a batch is released
pub const DEBOUNCE_MS: u64 = 300;
/// Minimum gap between two released batches
pub const REBUILD_COOLDOWN_MS: u64 = 800;

/// Check if path is a temp/backup file (editor artifacts)
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Timing and deduplication only; routing happens elsewhere.
pub struct Debouncer {
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_release: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_release: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → the later event (file was restored)
    /// - Modify + Remove → Remove
    /// - Create + Remove → dropped
    /// - otherwise the first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // mtime/chmod noise
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);

            if let Some(&existing) = self.changes.get(&path) {
                match (existing, kind) {
                    (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                        self.changes.insert(path, kind);
                    }
                    (ChangeKind::Modified, ChangeKind::Removed) => {
                        self.changes.insert(path, ChangeKind::Removed);
                    }
                    (ChangeKind::Created, ChangeKind::Removed) => {
                        debug!("watch"; "discard created+removed: {}", path.display());
                        self.changes.remove(&path);
                    }
                    _ => continue,
                }
                self.last_event = Some(Instant::now());
                continue;
            }

            debug!("watch"; "{}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            self.last_event = Some(Instant::now());
        }
    }

    /// Take the pending batch once the debounce window and cooldown elapsed.
    pub fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        if changes.is_empty() {
            return None;
        }

        self.last_release = Some(Instant::now());
        Some(changes)
    }

    fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_release) = self.last_release
            && last_release.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_release
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify_kind() -> notify::EventKind {
        notify::EventKind::Modify(notify::event::ModifyKind::Data(
            notify::event::DataChange::Any,
        ))
    }

    fn create_kind() -> notify::EventKind {
        notify::EventKind::Create(notify::event::CreateKind::File)
    }

    fn remove_kind() -> notify::EventKind {
        notify::EventKind::Remove(notify::event::RemoveKind::File)
    }

    fn kind_of(debouncer: &Debouncer, path: &str) -> Option<ChangeKind> {
        debouncer.changes.get(Path::new(path)).copied()
    }

    #[test]
    fn test_debouncer_empty() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.is_ready());
        assert!(debouncer.take_if_ready().is_none());
    }

    #[test]
    fn test_event_kinds() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/tmp/sprite/a/1.png"], create_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/scss/app.scss"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/templates/x.pug"], remove_kind()));

        assert_eq!(debouncer.changes.len(), 3);
        assert_eq!(kind_of(&debouncer, "/tmp/sprite/a/1.png"), Some(ChangeKind::Created));
        assert_eq!(kind_of(&debouncer, "/tmp/scss/app.scss"), Some(ChangeKind::Modified));
        assert_eq!(kind_of(&debouncer, "/tmp/templates/x.pug"), Some(ChangeKind::Removed));
    }

    #[test]
    fn test_metadata_and_temp_files_ignored() {
        let mut debouncer = Debouncer::new();
        let metadata = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::Any,
        ));
        debouncer.add_event(&make_event(vec!["/tmp/scss/app.scss"], metadata));
        debouncer.add_event(&make_event(vec!["/tmp/scss/.app.scss.swp"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/scss/app.scss~"], modify_kind()));

        assert!(debouncer.changes.is_empty());
        assert!(debouncer.last_event.is_none());
    }

    #[test]
    fn test_dedup_first_event_wins() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/tmp/a.png"], create_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/a.png", "/tmp/a.png"], modify_kind()));

        assert_eq!(debouncer.changes.len(), 1);
        assert_eq!(kind_of(&debouncer, "/tmp/a.png"), Some(ChangeKind::Created));
    }

    #[test]
    fn test_state_transitions() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/tmp/restored.png"], remove_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/restored.png"], create_kind()));
        assert_eq!(kind_of(&debouncer, "/tmp/restored.png"), Some(ChangeKind::Created));

        debouncer.add_event(&make_event(vec!["/tmp/deleted.png"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/deleted.png"], remove_kind()));
        assert_eq!(kind_of(&debouncer, "/tmp/deleted.png"), Some(ChangeKind::Removed));

        debouncer.add_event(&make_event(vec!["/tmp/blip.png"], create_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/blip.png"], remove_kind()));
        assert_eq!(kind_of(&debouncer, "/tmp/blip.png"), None);
    }

    #[test]
    fn test_take_after_quiet_period() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/tmp/a.png"], modify_kind()));
        assert!(debouncer.take_if_ready().is_none());

        debouncer.last_event = Instant::now().checked_sub(Duration::from_millis(DEBOUNCE_MS + 1));
        let batch = debouncer.take_if_ready().unwrap();
        assert_eq!(batch.len(), 1);
        assert!(debouncer.changes.is_empty());
        assert!(debouncer.last_release.is_some());
    }

    #[test]
    fn test_sleep_duration_no_events() {
        let debouncer = Debouncer::new();
        assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
    }

    #[test]
    fn test_sleep_duration_after_event() {
        let mut debouncer = Debouncer::new();
        debouncer.last_event = Some(Instant::now());

        let dur = debouncer.sleep_duration();
        assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 10));
        assert!(dur <= Duration::from_millis(DEBOUNCE_MS + 10));
    }

    #[test]
    fn test_sleep_duration_respects_cooldown() {
        let mut debouncer = Debouncer::new();
        debouncer.last_event = Some(Instant::now());
        debouncer.last_release = Some(Instant::now());

        let dur = debouncer.sleep_duration();
        assert!(dur >= Duration::from_millis(REBUILD_COOLDOWN_MS - 10));
        assert!(dur <= Duration::from_millis(REBUILD_COOLDOWN_MS + 10));
    }
}
