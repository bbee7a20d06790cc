use anyhow::Result;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::Settings;
use crate::core::NotifyMode;

const APP_NAME: &str = "ScriptSearch";
const CONFIG_FILE: &str = "config.json";

pub const KEY_SCRIPT_LOCATION: &str = "script-location";
pub const KEY_DEFAULT_ICON: &str = "default-icon";
pub const KEY_DEFAULT_NOTIFICATION_STYLE: &str = "default-notification-style";
pub const KEY_REFRESH_SCRIPTS_TRIGGER: &str = "refresh-scripts-trigger";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("org", "scriptsearch", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the settings from `path`, or from the default config file.
///
/// A missing file is created with the defaults. A file that does not parse is
/// repaired field by field; if even that fails the defaults are used.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let config_path = resolve_path(path)?;

    if !config_path.exists() {
        tracing::info!(
            "Settings file not found, creating default settings at {:?}",
            config_path
        );
        let defaults = Settings::default();
        save_settings(&defaults, Some(&config_path))?;
        return Ok(defaults);
    }

    let content = fs::read_to_string(&config_path)?;
    match serde_json::from_str::<Settings>(&content) {
        Ok(settings) => {
            tracing::info!("Loaded settings from {:?}", config_path);
            Ok(settings)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse settings file at {:?}: {}. Repairing it.",
                config_path,
                e
            );
            Ok(repair_settings(&content).unwrap_or_default())
        }
    }
}

/// Rebuilds settings from a damaged file: missing, null or mistyped fields
/// take their default, unknown notification styles become `status`.
pub fn repair_settings(content: &str) -> Result<Settings> {
    let mut value: Value = serde_json::from_str(content)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Settings file is not a JSON object"))?;

    let defaults = Settings::default();

    let ensure_field = |obj: &mut serde_json::Map<String, Value>,
                        key: &str,
                        valid: fn(&Value) -> bool,
                        default_val: Value| {
        if !obj.get(key).is_some_and(valid) {
            if obj.contains_key(key) {
                tracing::warn!(key, "Replacing invalid setting with its default");
            }
            obj.insert(key.to_string(), default_val);
        }
    };

    ensure_field(
        obj,
        KEY_SCRIPT_LOCATION,
        Value::is_string,
        Value::String(defaults.script_location.clone()),
    );
    ensure_field(
        obj,
        KEY_DEFAULT_ICON,
        Value::is_string,
        Value::String(defaults.default_icon.clone()),
    );
    ensure_field(
        obj,
        KEY_DEFAULT_NOTIFICATION_STYLE,
        |v| v.as_str().is_some_and(|s| s.parse::<NotifyMode>().is_ok()),
        serde_json::to_value(defaults.default_notification_style)?,
    );
    ensure_field(
        obj,
        KEY_REFRESH_SCRIPTS_TRIGGER,
        Value::is_i64,
        Value::from(defaults.refresh_scripts_trigger),
    );

    // Accept any casing the style parser accepts.
    if let Some(style) = obj
        .get(KEY_DEFAULT_NOTIFICATION_STYLE)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<NotifyMode>().ok())
    {
        obj.insert(
            KEY_DEFAULT_NOTIFICATION_STYLE.to_string(),
            Value::String(style.as_str().to_string()),
        );
    }

    let repaired: Settings = serde_json::from_value(Value::Object(obj.clone()))?;
    tracing::info!("Successfully repaired settings");
    Ok(repaired)
}

/// Saves the settings to `path`, or to the default config file.
pub fn save_settings(settings: &Settings, path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, json)?;
    tracing::debug!("Saved settings to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/org.scriptsearch.ScriptSearch/
// Linux:   ~/.config/scriptsearch/
// Windows: %APPDATA%/scriptsearch/ScriptSearch/config/
