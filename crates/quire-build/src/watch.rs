//! Source directory watching.

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use glob::Pattern;
use notify::{RecursiveMode, Watcher};
use quire_content::Discovery;

use crate::debouncer::{ChangeDebouncer, ChangeKind, SourceChange};

/// Error starting a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The platform watcher could not be created or attached.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
    /// A watch pattern is not a valid glob.
    #[error("Invalid watch pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Watch settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Glob patterns, relative to the source directory, narrowing the
    /// watched pages. Empty watches every page discovery would pick up.
    pub patterns: Vec<String>,
    /// Quiet period before a change is released.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            debounce: Duration::from_millis(100),
        }
    }
}

/// Receiving end of a watcher: one `Vec` per released batch of changes.
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::Receiver<Vec<SourceChange>>,
}

impl ChangeReceiver {
    /// Block until the next batch. `None` once the watcher has stopped.
    #[must_use]
    pub fn recv(&self) -> Option<Vec<SourceChange>> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next batch.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if nothing arrived and `Disconnected` once the
    /// watcher has stopped.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Vec<SourceChange>, mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Take a batch if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<Vec<SourceChange>> {
        self.rx.try_recv().ok()
    }
}

/// Stops the watcher when dropped.
#[derive(Debug)]
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    /// Stop watching now.
    pub fn stop(mut self) {
        self._shutdown.take();
    }
}

fn change_kind(kind: notify::EventKind) -> Option<ChangeKind> {
    match kind {
        notify::EventKind::Create(_) => Some(ChangeKind::Created),
        notify::EventKind::Modify(_) => Some(ChangeKind::Modified),
        notify::EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Map an absolute event path to a watched relative path.
fn watched_path(
    path: &Path,
    root: &Path,
    discovery: &Discovery,
    patterns: &[Pattern],
) -> Option<PathBuf> {
    let rel = path.strip_prefix(root).ok()?;
    if !discovery.is_eligible(rel) {
        return None;
    }
    (patterns.is_empty() || patterns.iter().any(|p| p.matches_path(rel))).then(|| rel.to_path_buf())
}

/// Watch the source directory of `discovery` recursively and deliver
/// debounced change batches.
///
/// Only paths the discovery walk would pick up are reported.
///
/// # Errors
///
/// Returns an error if a pattern is invalid or the watcher cannot attach
/// to the directory.
pub fn watch_sources(
    discovery: &Discovery,
    options: &WatchOptions,
) -> Result<(ChangeReceiver, WatchHandle), WatchError> {
    let source_dir = discovery.source_dir();
    let patterns = options
        .patterns
        .iter()
        .map(String::as_str)
        .map(Pattern::new)
        .collect::<Result<Vec<_>, _>>()?;
    // Event paths are reported in canonical form on some platforms.
    let root = source_dir
        .canonicalize()
        .unwrap_or_else(|_| source_dir.to_path_buf());

    let (batch_tx, batch_rx) = mpsc::channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let debouncer = Arc::new(ChangeDebouncer::new(options.debounce));

    let watcher_debouncer = Arc::clone(&debouncer);
    let watcher_root = root.clone();
    let watcher_discovery = discovery.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else { return };
        let Some(kind) = change_kind(event.kind) else {
            return;
        };
        for path in event.paths {
            if let Some(rel) = watched_path(&path, &watcher_root, &watcher_discovery, &patterns) {
                watcher_debouncer.record(rel, kind);
            }
        }
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    tracing::info!(dir = %root.display(), "Watching for changes");

    std::thread::spawn(move || {
        let _watcher = watcher;
        loop {
            match shutdown_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
            let batch = debouncer.drain_ready();
            if batch.is_empty() {
                continue;
            }
            tracing::debug!(changes = batch.len(), "Source changes released");
            if batch_tx.send(batch).is_err() {
                break;
            }
        }
    });

    Ok((
        ChangeReceiver { rx: batch_rx },
        WatchHandle {
            _shutdown: Some(shutdown_tx),
        },
    ))
}
