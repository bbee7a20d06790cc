//! The search-provider surface of the script catalog.
//!
//! A [`Session`] exists between `enable` and `disable`. It owns one
//! background task that holds the [`ScriptCatalog`] and serializes every
//! mutation of it: settings changes, debounced file system changes and
//! explicit refresh requests. Queries never go through that task; they read
//! the current snapshot from the shared [`SearchEngine`].

use super::events::UserEvent;
use super::notifications::notification_for_outcome;
use super::proxy::EventProxy;
use crate::config::store::{SettingsKey, SettingsStore};
use crate::config::Settings;
use crate::core::{
    CatalogError, ReloadCallback, ResultMeta, RunRequest, ScriptCatalog, ScriptRunner,
    SearchEngine, DEBOUNCE_WINDOW,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Requests handled by the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The change monitor saw the script tree settle after changes.
    ScriptsChanged,
    Refresh { notify: bool },
    Shutdown,
}

pub struct Session<P: EventProxy> {
    search: Arc<SearchEngine>,
    settings: Arc<SettingsStore>,
    runner: Arc<dyn ScriptRunner>,
    proxy: P,
    commands: mpsc::UnboundedSender<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl<P: EventProxy> Session<P> {
    /// Builds the catalog from the current settings, loads it once and starts
    /// the session task. Must be called inside a tokio runtime.
    pub fn enable(settings: Arc<SettingsStore>, proxy: P, runner: Arc<dyn ScriptRunner>) -> Self {
        Self::enable_with_debounce_window(settings, proxy, runner, DEBOUNCE_WINDOW)
    }

    pub fn enable_with_debounce_window(
        settings: Arc<SettingsStore>,
        proxy: P,
        runner: Arc<dyn ScriptRunner>,
        debounce_window: Duration,
    ) -> Self {
        let search = Arc::new(SearchEngine::new());
        let (commands, events) = mpsc::unbounded_channel();

        let reload_tx = commands.clone();
        let on_reload: ReloadCallback = Arc::new(move || {
            let _ = reload_tx.send(SessionEvent::ScriptsChanged);
        });

        // Subscribe before the catalog reads the settings so no change is missed.
        let changes = settings.subscribe();
        let catalog = ScriptCatalog::with_debounce_window(
            &settings.snapshot(),
            search.clone(),
            proxy.clone(),
            on_reload,
            debounce_window,
        );
        tracing::info!(root = %catalog.root().display(), "Script search enabled");

        let task = tokio::spawn(run_session_loop(catalog, settings.clone(), changes, events));

        Self {
            search,
            settings,
            runner,
            proxy,
            commands,
            task: Some(task),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn search_engine(&self) -> &Arc<SearchEngine> {
        &self.search
    }

    pub async fn get_initial_result_set(
        &self,
        terms: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        self.search.initial_result_set(terms, cancel)
    }

    pub async fn get_subsearch_result_set(
        &self,
        previous_results: &[String],
        terms: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        self.search
            .subsearch_result_set(previous_results, terms, cancel)
    }

    pub fn filter_results(&self, results: Vec<String>, max_results: usize) -> Vec<String> {
        SearchEngine::filter_results(results, max_results)
    }

    pub async fn get_result_metas(
        &self,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultMeta>, CatalogError> {
        self.search.result_metas(ids, cancel)
    }

    /// Runs the script behind `id` in the background and asks the host to hide
    /// the overview. The returned task finishes once the outcome was reported.
    pub fn activate_result(
        &self,
        id: &str,
        terms: &[String],
    ) -> Result<JoinHandle<()>, CatalogError> {
        let snapshot = self.search.snapshot();
        let entry = snapshot
            .get(id)
            .ok_or_else(|| CatalogError::UnknownResult(id.to_string()))?;

        let request = RunRequest {
            script_path: snapshot.script_path(entry),
            notify: entry.notify,
        };
        let name = entry.name.clone();
        tracing::info!(id, name = %name, terms = ?terms, "Activating script");

        let runner = self.runner.clone();
        let proxy = self.proxy.clone();
        let handle = tokio::spawn(async move {
            let mode = request.notify;
            let outcome = runner.run(request).await;
            match &outcome {
                Err(e) => tracing::error!(name = %name, error = %e, "Failed to launch script"),
                Ok(output) if !output.success() => {
                    tracing::warn!(name = %name, exit_code = ?output.exit_code, "Script failed")
                }
                Ok(_) => {}
            }
            if let Some(notification) = notification_for_outcome(&name, mode, &outcome) {
                proxy.send_event(UserEvent::Notification(notification));
            }
        });

        self.proxy.send_event(UserEvent::HideOverview);
        Ok(handle)
    }

    /// Asks the session task to rescan the script tree.
    pub fn request_refresh(&self, notify: bool) {
        if self.commands.send(SessionEvent::Refresh { notify }).is_err() {
            tracing::warn!("Refresh requested after the session stopped");
        }
    }

    /// Stops the session: the monitor is released, pending reloads are
    /// discarded and the catalog is destroyed before this returns.
    pub async fn disable(mut self) {
        let _ = self.commands.send(SessionEvent::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Session task ended abnormally: {}", e);
            }
        }
        tracing::info!("Script search disabled");
    }
}

impl<P: EventProxy> Drop for Session<P> {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(SessionEvent::Shutdown);
        }
    }
}

async fn run_session_loop<P: EventProxy>(
    mut catalog: ScriptCatalog<P>,
    settings: Arc<SettingsStore>,
    mut changes: broadcast::Receiver<SettingsKey>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    let mut settings_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::ScriptsChanged) => {
                    tracing::debug!("Script directory changed, reloading");
                    catalog.refresh(false);
                }
                Some(SessionEvent::Refresh { notify }) => {
                    catalog.refresh(notify);
                }
                Some(SessionEvent::Shutdown) | None => break,
            },
            key = changes.recv(), if settings_open => match key {
                Ok(key) => apply_setting(&mut catalog, &settings.snapshot(), key),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed settings changes, re-applying all settings");
                    let current = settings.snapshot();
                    catalog.update_script_location(&current);
                    catalog.update_default_icon(&current);
                    catalog.update_default_notification_style(&current);
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Settings store closed");
                    settings_open = false;
                }
            },
        }
    }

    catalog.destroy();
}

fn apply_setting<P: EventProxy>(
    catalog: &mut ScriptCatalog<P>,
    settings: &Settings,
    key: SettingsKey,
) {
    tracing::debug!(key = key.as_str(), "Applying setting");
    match key {
        SettingsKey::ScriptLocation => {
            catalog.update_script_location(settings);
        }
        SettingsKey::DefaultIcon => catalog.update_default_icon(settings),
        SettingsKey::DefaultNotificationStyle => {
            catalog.update_default_notification_style(settings)
        }
        SettingsKey::RefreshScriptsTrigger => {
            catalog.refresh(true);
        }
    }
}
