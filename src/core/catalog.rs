//! The stateful owner of the script catalog.

use super::monitor::{ChangeMonitor, ReloadCallback, DEBOUNCE_WINDOW};
use super::scanner::CatalogScanner;
use super::search::SearchEngine;
use super::{CatalogDefaults, ScriptEntry};
use crate::app::events::UserEvent;
use crate::app::notifications;
use crate::app::proxy::EventProxy;
use crate::config::Settings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One catalog generation: the root it was scanned from and its entries in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub root: PathBuf,
    pub entries: Vec<ScriptEntry>,
}

impl CatalogSnapshot {
    pub fn new(root: PathBuf, entries: Vec<ScriptEntry>) -> Self {
        Self { root, entries }
    }

    /// Looks up an entry by its stringified position.
    pub fn get(&self, id: &str) -> Option<&ScriptEntry> {
        id.parse::<usize>().ok().and_then(|index| self.entries.get(index))
    }

    /// Absolute path of an entry's script file.
    pub fn script_path(&self, entry: &ScriptEntry) -> PathBuf {
        entry
            .relative_path
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

/// Holds the catalog root, the defaults and the live change monitor, and
/// publishes a fresh snapshot to the search engine on every refresh.
///
/// Entries are only ever replaced as a whole by [`ScriptCatalog::refresh`].
pub struct ScriptCatalog<P: EventProxy> {
    root: PathBuf,
    defaults: CatalogDefaults,
    search: Arc<SearchEngine>,
    proxy: P,
    on_reload: ReloadCallback,
    debounce_window: Duration,
    monitor: Option<ChangeMonitor>,
    destroyed: bool,
}

impl<P: EventProxy> ScriptCatalog<P> {
    /// Creates the catalog from the current settings, starts monitoring the
    /// root and performs a silent initial refresh. Must be called inside a
    /// tokio runtime.
    pub fn new(
        settings: &Settings,
        search: Arc<SearchEngine>,
        proxy: P,
        on_reload: ReloadCallback,
    ) -> Self {
        Self::with_debounce_window(settings, search, proxy, on_reload, DEBOUNCE_WINDOW)
    }

    pub fn with_debounce_window(
        settings: &Settings,
        search: Arc<SearchEngine>,
        proxy: P,
        on_reload: ReloadCallback,
        debounce_window: Duration,
    ) -> Self {
        let mut catalog = Self {
            root: settings.script_root(),
            defaults: settings.catalog_defaults(),
            search,
            proxy,
            on_reload,
            debounce_window,
            monitor: None,
            destroyed: false,
        };
        catalog.start_monitor();
        catalog.refresh(false);
        catalog
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn defaults(&self) -> &CatalogDefaults {
        &self.defaults
    }

    pub fn is_watching(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| m.is_watching())
    }

    /// The current generation, as seen by queries.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.search.snapshot()
    }

    /// Rescans the root and swaps the result in as the new generation.
    ///
    /// Never fails: scan problems only shrink the catalog. Returns the number
    /// of entries now in the catalog.
    pub fn refresh(&mut self, notify: bool) -> usize {
        if self.destroyed {
            tracing::debug!("Ignoring refresh of a destroyed catalog");
            return 0;
        }

        let entries = CatalogScanner::new(&self.root, self.defaults.clone()).scan();
        let count = entries.len();
        self.search
            .update_scripts(CatalogSnapshot::new(self.root.clone(), entries));

        self.proxy.send_event(UserEvent::CatalogUpdated {
            root: self.root.clone(),
            scripts: count,
        });
        if notify {
            notifications::show_success(
                &self.proxy,
                "Scripts Refreshed",
                Some("All scripts have been reloaded from disk"),
            );
        }
        count
    }

    /// Applies the configured script location. When it differs from the
    /// current root, the monitor is rebuilt on the new root and the catalog is
    /// refreshed silently. Returns whether the root changed.
    pub fn update_script_location(&mut self, settings: &Settings) -> bool {
        let new_root = settings.script_root();
        if self.destroyed || new_root == self.root {
            return false;
        }

        tracing::info!(
            from = %self.root.display(),
            to = %new_root.display(),
            "Updating script location"
        );
        self.stop_monitor();
        self.root = new_root;
        self.start_monitor();
        self.refresh(false);
        true
    }

    /// Applies the configured default icon and re-derives all entries.
    pub fn update_default_icon(&mut self, settings: &Settings) {
        self.defaults.icon = settings.default_icon.clone();
        self.refresh(false);
    }

    /// Applies the configured default notification style and re-derives all entries.
    pub fn update_default_notification_style(&mut self, settings: &Settings) {
        self.defaults.notify = settings.default_notification_style;
        self.refresh(false);
    }

    /// Releases the monitor and any pending reload. The catalog ignores
    /// further refreshes afterwards.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop_monitor();
        self.destroyed = true;
        tracing::info!(root = %self.root.display(), "Script catalog destroyed");
    }

    fn start_monitor(&mut self) {
        let scanner = CatalogScanner::new(&self.root, self.defaults.clone());
        if !scanner.ensure_root_exists() {
            return;
        }
        self.monitor = Some(ChangeMonitor::start(
            &self.root,
            self.debounce_window,
            self.on_reload.clone(),
        ));
    }

    fn stop_monitor(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
        }
    }
}

impl<P: EventProxy> Drop for ScriptCatalog<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}
