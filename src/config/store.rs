//! Shared, observable settings.
//!
//! The store owns the current [`Settings`] and broadcasts the key of every
//! value that actually changed. When it was opened from a file, each change
//! is written back before it is announced, and [`SettingsStore::watch_file`]
//! picks up changes other processes write to that file.

use super::settings::{
    self, KEY_DEFAULT_ICON, KEY_DEFAULT_NOTIFICATION_STYLE, KEY_REFRESH_SCRIPTS_TRIGGER,
    KEY_SCRIPT_LOCATION,
};
use super::Settings;
use crate::core::NotifyMode;
use anyhow::Result;
use notify::event::{AccessKind, AccessMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    ScriptLocation,
    DefaultIcon,
    DefaultNotificationStyle,
    RefreshScriptsTrigger,
}

impl SettingsKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKey::ScriptLocation => KEY_SCRIPT_LOCATION,
            SettingsKey::DefaultIcon => KEY_DEFAULT_ICON,
            SettingsKey::DefaultNotificationStyle => KEY_DEFAULT_NOTIFICATION_STYLE,
            SettingsKey::RefreshScriptsTrigger => KEY_REFRESH_SCRIPTS_TRIGGER,
        }
    }
}

pub struct SettingsStore {
    settings: RwLock<Settings>,
    changes: broadcast::Sender<SettingsKey>,
    path: Option<PathBuf>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl SettingsStore {
    /// An in-memory store that never touches the disk.
    pub fn new(settings: Settings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            settings: RwLock::new(settings),
            changes,
            path: None,
            watcher: Mutex::new(None),
        }
    }

    /// Loads the settings from `path` (or the default config file) and
    /// persists later changes there.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(path) => path.to_path_buf(),
            None => settings::get_config_file_path()
                .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
        };
        let loaded = settings::load_settings(Some(&resolved))?;
        let mut store = Self::new(loaded);
        store.path = Some(resolved);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Receives the key of every subsequent change.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsKey> {
        self.changes.subscribe()
    }

    pub fn set_script_location(&self, location: impl Into<String>) -> Result<bool> {
        let location = location.into();
        self.update(SettingsKey::ScriptLocation, |s| {
            replace(&mut s.script_location, location)
        })
    }

    pub fn set_default_icon(&self, icon: impl Into<String>) -> Result<bool> {
        let icon = icon.into();
        self.update(SettingsKey::DefaultIcon, |s| replace(&mut s.default_icon, icon))
    }

    pub fn set_default_notification_style(&self, style: NotifyMode) -> Result<bool> {
        self.update(SettingsKey::DefaultNotificationStyle, |s| {
            replace(&mut s.default_notification_style, style)
        })
    }

    /// Re-reads the backing file and announces every field that differs from
    /// the current settings. A file that does not parse (for example one that
    /// is being written right now) is reported as an error and changes nothing.
    pub fn reload_from_disk(&self) -> Result<Vec<SettingsKey>> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Settings store is not bound to a file"))?;
        let content = fs::read_to_string(path)?;
        let loaded: Settings = serde_json::from_str(&content)?;

        let changed = {
            let mut guard = self.settings.write();
            let changed = changed_keys(&guard, &loaded);
            if !changed.is_empty() {
                *guard = loaded;
            }
            changed
        };

        for key in &changed {
            tracing::info!(key = key.as_str(), "Setting changed on disk");
            let _ = self.changes.send(*key);
        }
        Ok(changed)
    }

    /// Watches the backing file and reloads it whenever it is written.
    ///
    /// The parent folder is watched rather than the file itself, so editors
    /// that replace the file are followed too. The watch lives as long as the
    /// store.
    pub fn watch_file(self: &Arc<Self>) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Settings store is not bound to a file"))?;
        let folder = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path.file_name().map(|name| name.to_os_string());

        let store = Arc::downgrade(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "Settings file watcher error");
                    return;
                }
            };
            let written = match event.kind {
                EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
                EventKind::Access(_) => false,
                _ => true,
            };
            if !written
                || !event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref())
            {
                return;
            }
            let Some(store) = store.upgrade() else {
                return;
            };
            if let Err(e) = store.reload_from_disk() {
                tracing::debug!(
                    error = %e,
                    "Settings file not readable yet, waiting for the next write"
                );
            }
        })?;
        watcher.watch(&folder, RecursiveMode::NonRecursive)?;

        *self.watcher.lock() = Some(watcher);
        tracing::info!(path = %path.display(), "Watching settings file");
        Ok(())
    }

    /// Requests a manual refresh by incrementing the trigger value.
    pub fn bump_refresh_trigger(&self) -> Result<i64> {
        let mut next = 0;
        self.update(SettingsKey::RefreshScriptsTrigger, |s| {
            s.refresh_scripts_trigger = s.refresh_scripts_trigger.wrapping_add(1);
            next = s.refresh_scripts_trigger;
            true
        })?;
        Ok(next)
    }

    /// Applies `change` and, if it reports a difference, persists and announces it.
    fn update(&self, key: SettingsKey, change: impl FnOnce(&mut Settings) -> bool) -> Result<bool> {
        let current = {
            let mut guard = self.settings.write();
            if !change(&mut *guard) {
                return Ok(false);
            }
            guard.clone()
        };

        if let Some(path) = &self.path {
            settings::save_settings(&current, Some(path))?;
        }
        tracing::debug!(key = key.as_str(), "Setting changed");
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(key);
        Ok(true)
    }
}

fn changed_keys(old: &Settings, new: &Settings) -> Vec<SettingsKey> {
    let mut keys = Vec::new();
    if old.script_location != new.script_location {
        keys.push(SettingsKey::ScriptLocation);
    }
    if old.default_icon != new.default_icon {
        keys.push(SettingsKey::DefaultIcon);
    }
    if old.default_notification_style != new.default_notification_style {
        keys.push(SettingsKey::DefaultNotificationStyle);
    }
    if old.refresh_scripts_trigger != new.refresh_scripts_trigger {
        keys.push(SettingsKey::RefreshScriptsTrigger);
    }
    keys
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
