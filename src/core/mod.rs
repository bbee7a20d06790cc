pub mod catalog;
pub mod error;
pub mod metadata;
pub mod monitor;
pub mod runner;
pub mod scanner;
pub mod search;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Only files ending in this extension are treated as scripts.
pub const SCRIPT_FILE_EXTENSION: &str = ".sh";

/// How the outcome of a script run is reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Success or failure only.
    #[default]
    Status,
    /// The captured output of the script.
    Stdout,
    /// No notification at all.
    #[serde(rename = "none")]
    Silent,
}

impl NotifyMode {
    pub const ALL: [NotifyMode; 3] = [NotifyMode::Status, NotifyMode::Stdout, NotifyMode::Silent];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyMode::Status => "status",
            NotifyMode::Stdout => "stdout",
            NotifyMode::Silent => "none",
        }
    }

    /// Strict form used for script headers: only the exact lower-case names.
    /// Settings and command-line input go through the lenient `FromStr`.
    pub fn from_header(value: &str) -> Option<Self> {
        NotifyMode::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl fmt::Display for NotifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        NotifyMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("invalid notification style '{}'", value))
    }
}

/// Fallback values applied to scripts whose header omits `Icon` or `Notify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDefaults {
    pub icon: String,
    pub notify: NotifyMode,
}

/// One discovered script and its derived display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptEntry {
    /// Base file name, e.g. `clean.sh`.
    pub file: String,
    /// Path relative to the catalog root with `/` separators.
    pub relative_path: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub notify: NotifyMode,
}

impl ScriptEntry {
    /// The folder part of `relative_path`, or `None` for scripts at the root.
    pub fn directory(&self) -> Option<&str> {
        crate::utils::paths::directory_portion(&self.relative_path)
    }

    /// The description shown in search results, with the folder appended in
    /// brackets for nested scripts.
    pub fn display_description(&self) -> String {
        match self.directory() {
            Some(dir) if self.description.is_empty() => format!("[{}]", dir),
            Some(dir) => format!("{} [{}]", self.description, dir),
            None => self.description.clone(),
        }
    }
}

pub use catalog::{CatalogSnapshot, ScriptCatalog};
pub use error::CatalogError;
pub use metadata::{parse_metadata, read_metadata, MetadataDiagnostic, ScriptMetadata};
pub use monitor::{ChangeMonitor, ReloadCallback, DEBOUNCE_WINDOW};
pub use runner::{ProcessRunner, RunOutput, RunRequest, ScriptRunner};
pub use scanner::CatalogScanner;
pub use search::{ResultMeta, SearchEngine};
