//! Live monitoring of the script directory.
//!
//! A `notify` watcher forwards raw file system events into a tokio channel.
//! A debounce loop filters them for relevance and collapses bursts into a
//! single reload callback. The debounce timer is a small state machine:
//!
//! ```text
//! idle --event--> pending --event--> pending (restarted) --deadline--> idle + reload
//! ```

use super::error::CatalogError;
use super::SCRIPT_FILE_EXTENSION;
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet period after the last relevant event before a reload is dispatched.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Invoked once per debounced burst of changes.
pub type ReloadCallback = Arc<dyn Fn() + Send + Sync>;

/// At most one pending reload deadline. Scheduling while a deadline is
/// pending replaces it, so reloads only fire after a quiet period.
#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub(crate) fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per scheduled deadline, once it has passed.
    pub(crate) fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Watches a script directory and calls the reload callback after changes settle.
///
/// Dropping the monitor (or calling [`ChangeMonitor::stop`]) releases the OS
/// watch and discards any pending reload.
pub struct ChangeMonitor {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    debounce_task: Option<JoinHandle<()>>,
}

impl ChangeMonitor {
    /// Starts monitoring `root` recursively. Must be called inside a tokio runtime.
    ///
    /// A watch that cannot be installed is logged and the monitor runs without
    /// live updates; manual refreshes keep working.
    pub fn start(root: &Path, window: Duration, on_reload: ReloadCallback) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = match install_watch(root, event_tx) {
            Ok(watcher) => {
                tracing::info!(path = %root.display(), "Watching scripts directory");
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Live reload disabled, use a manual refresh instead");
                None
            }
        };

        let debounce_task = tokio::spawn(run_debounce_loop(event_rx, window, on_reload));

        Self {
            root: root.to_path_buf(),
            watcher,
            debounce_task: Some(debounce_task),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Releases the watch and cancels a pending reload. Idempotent.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!(path = %self.root.display(), "Released scripts directory watch");
        }
        if let Some(handle) = self.debounce_task.take() {
            handle.abort();
        }
    }
}

impl Drop for ChangeMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn install_watch(
    root: &Path,
    event_tx: mpsc::UnboundedSender<notify::Event>,
) -> Result<RecommendedWatcher, CatalogError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                // The receiver is gone once the monitor stops; nothing left to do.
                let _ = event_tx.send(event);
            }
            Err(e) => tracing::warn!(error = %e, "File watcher error"),
        }
    })
    .map_err(|e| CatalogError::Watch(e, root.to_path_buf()))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| CatalogError::Watch(e, root.to_path_buf()))?;

    Ok(watcher)
}

/// Receives raw events until the channel closes, firing `on_reload` once per
/// debounced burst of relevant events.
pub(crate) async fn run_debounce_loop(
    mut events: mpsc::UnboundedReceiver<notify::Event>,
    window: Duration,
    on_reload: ReloadCallback,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if is_relevant_event(&event) {
                        tracing::trace!(kind = ?event.kind, paths = ?event.paths, "Relevant script directory change");
                        debouncer.schedule(Instant::now());
                    }
                }
                None => {
                    debouncer.cancel();
                    break;
                }
            },
            _ = sleep_until_deadline(deadline), if debouncer.is_pending() => {
                if debouncer.fire(Instant::now()) {
                    tracing::info!("Reloading scripts due to directory changes");
                    on_reload();
                }
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Creations, removals, content changes, moves and renames of folders or
/// scripts. Attribute-only changes and plain accesses are ignored.
pub(crate) fn is_relevant_event(event: &notify::Event) -> bool {
    let kind_qualifies = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Other => false,
    };

    kind_qualifies && (event.paths.is_empty() || event.paths.iter().any(|p| is_relevant_path(p)))
}

/// Folders and scripts are relevant. A path that can no longer be queried
/// (typically a deleted one) counts as relevant too.
fn is_relevant_path(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => true,
        Ok(metadata) => {
            metadata.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(SCRIPT_FILE_EXTENSION))
        }
        Err(_) => true,
    }
}
