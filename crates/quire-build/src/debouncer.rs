//! Coalescing of source change events.
//!
//! Editors often emit several events for one save. Events are held per path
//! until no new event arrives for the debounce window, then released as a
//! single change.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Kind of change to a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File appeared.
    Created,
    /// File contents changed.
    Modified,
    /// File disappeared.
    Removed,
}

/// Coalesced change to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    /// Path relative to the source directory.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}

struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe per-path event debouncer.
pub(crate) struct ChangeDebouncer {
    pending: Mutex<HashMap<PathBuf, Pending>>,
    window: Duration,
}

impl ChangeDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record a raw event, merging it with any pending event for the path.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub(crate) fn record(&self, path: PathBuf, kind: ChangeKind) {
        let mut pending = self.pending.lock().unwrap();
        let deadline = Instant::now() + self.window;

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match merge(entry.get().kind, kind) {
                Some(merged) => {
                    let slot = entry.get_mut();
                    slot.kind = merged;
                    slot.deadline = deadline;
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Release the changes whose window has elapsed, ordered by path.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub(crate) fn drain_ready(&self) -> Vec<SourceChange> {
        let mut pending = self.pending.lock().unwrap();
        let now = Instant::now();

        let mut ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|path| {
                let kind = pending.remove(&path)?.kind;
                Some(SourceChange { path, kind })
            })
            .collect()
    }
}

/// Merge a new event into a pending one.
///
/// `None` means the file was created and removed inside one window.
#[allow(clippy::match_same_arms)]
fn merge(pending: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::{Created, Modified, Removed};

    match (pending, new) {
        (Created, Created | Modified) => Some(Created),
        (Created, Removed) => None,
        (Modified, Created) => Some(Created),
        (Modified, Modified) => Some(Modified),
        (Modified, Removed) => Some(Removed),
        (Removed, Created) => Some(Modified),
        (Removed, Modified | Removed) => Some(Removed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    const WINDOW: Duration = Duration::from_millis(10);

    fn settle() {
        thread::sleep(Duration::from_millis(25));
    }

    #[test]
    fn test_held_until_window_elapses() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        debouncer.record("guide.md".into(), ChangeKind::Modified);

        assert!(debouncer.drain_ready().is_empty());
        settle();

        assert_eq!(
            debouncer.drain_ready(),
            vec![SourceChange {
                path: "guide.md".into(),
                kind: ChangeKind::Modified,
            }]
        );
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_repeated_saves_collapse() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        for _ in 0..5 {
            debouncer.record("guide.md".into(), ChangeKind::Modified);
        }
        settle();

        assert_eq!(debouncer.drain_ready().len(), 1);
    }

    #[test]
    fn test_create_then_remove_cancels() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        debouncer.record("draft.md".into(), ChangeKind::Created);
        debouncer.record("draft.md".into(), ChangeKind::Removed);
        settle();

        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_remove_then_create_is_modify() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        debouncer.record("cli.md".into(), ChangeKind::Removed);
        debouncer.record("cli.md".into(), ChangeKind::Created);
        settle();

        assert_eq!(debouncer.drain_ready()[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_merge_table() {
        use ChangeKind::{Created, Modified, Removed};

        assert_eq!(merge(Created, Modified), Some(Created));
        assert_eq!(merge(Modified, Created), Some(Created));
        assert_eq!(merge(Modified, Removed), Some(Removed));
        assert_eq!(merge(Removed, Modified), Some(Removed));
        assert_eq!(merge(Removed, Removed), Some(Removed));
    }

    #[test]
    fn test_drain_orders_by_path() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        debouncer.record("b.md".into(), ChangeKind::Modified);
        debouncer.record("a.md".into(), ChangeKind::Created);
        settle();

        let paths: Vec<_> = debouncer.drain_ready().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
    }
}
