//! Small path helpers shared by the catalog, the search engine and the config.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the user's home directory.
///
/// Only `~` on its own and `~/...` are expanded; `~user` forms and paths
/// without a tilde are returned unchanged. If the home directory cannot be
/// determined the path is returned as given.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

/// The folder part of a `/`-separated relative path, or `None` when the path
/// has no folder component.
pub fn directory_portion(relative_path: &str) -> Option<&str> {
    relative_path
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
}

/// Joins the components of `path` relative to `root` with `/`, regardless of
/// the platform separator. Returns `None` for paths outside `root` or with
/// non UTF-8 components.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
