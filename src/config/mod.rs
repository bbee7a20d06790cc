pub mod settings;
pub mod store;

use crate::core::{CatalogDefaults, NotifyMode};
use crate::utils::paths::expand_home;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SCRIPT_LOCATION: &str = "~/.config/script-search";
pub const DEFAULT_ICON: &str = "system-run-symbolic";

/// User-facing settings of the script catalog.
///
/// Field names serialize as the external setting keys, e.g. `script-location`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Root of the script tree; may start with `~`.
    pub script_location: String,
    pub default_icon: String,
    pub default_notification_style: NotifyMode,
    /// Only its changes matter: every change requests a manual refresh.
    pub refresh_scripts_trigger: i64,
}

impl Settings {
    /// The script location with `~` expanded.
    pub fn script_root(&self) -> PathBuf {
        expand_home(&self.script_location)
    }

    pub fn catalog_defaults(&self) -> CatalogDefaults {
        CatalogDefaults {
            icon: self.default_icon.clone(),
            notify: self.default_notification_style,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            script_location: DEFAULT_SCRIPT_LOCATION.to_string(),
            default_icon: DEFAULT_ICON.to_string(),
            default_notification_style: NotifyMode::Status,
            refresh_scripts_trigger: 0,
        }
    }
}
