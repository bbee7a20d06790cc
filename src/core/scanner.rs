use super::metadata::read_metadata;
use super::{CatalogDefaults, ScriptEntry, SCRIPT_FILE_EXTENSION};
use crate::utils::paths::relative_slash_path;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Walks the script directory and builds catalog entries from every script found.
///
/// Names starting with `.` are skipped entirely, for files and folders alike.
/// Siblings are visited in file-name order, so the same tree always yields the
/// same entry order.
pub struct CatalogScanner {
    root: PathBuf,
    defaults: CatalogDefaults,
}

impl CatalogScanner {
    pub fn new(root: impl Into<PathBuf>, defaults: CatalogDefaults) -> Self {
        Self {
            root: root.into(),
            defaults,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root folder (and any missing parents) if it does not exist yet.
    ///
    /// Returns `false` when the folder is missing and could not be created.
    pub fn ensure_root_exists(&self) -> bool {
        if self.root.is_dir() {
            return true;
        }
        match std::fs::create_dir_all(&self.root) {
            Ok(()) => {
                tracing::info!(path = %self.root.display(), "Created scripts directory");
                true
            }
            Err(e) => {
                tracing::error!(path = %self.root.display(), error = %e, "Failed to create scripts directory");
                false
            }
        }
    }

    /// Scans the whole tree. Never fails: unreadable folders and unparsable
    /// scripts are logged and left out, so the result may be partial.
    pub fn scan(&self) -> Vec<ScriptEntry> {
        if !self.ensure_root_exists() {
            return Vec::new();
        }

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut entries = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read part of the scripts directory, skipping it");
                    continue;
                }
            };

            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::debug!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            if !file_name.ends_with(SCRIPT_FILE_EXTENSION) {
                continue;
            }
            let Some(relative_path) = relative_slash_path(&self.root, path) else {
                continue;
            };

            match read_metadata(path, self.defaults.notify) {
                Ok(metadata) => {
                    entries.push(metadata.into_entry(file_name, &relative_path, &self.defaults))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse script metadata, leaving it out");
                }
            }
        }

        tracing::info!(
            root = %self.root.display(),
            count = entries.len(),
            "Loaded scripts"
        );
        for entry in &entries {
            tracing::debug!(
                name = %entry.name,
                path = %entry.relative_path,
                description = %entry.description,
                "Loaded script"
            );
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NotifyMode;
    use crate::utils::test_helpers::{running_as_root, write_script};
    use tracing_test::traced_test;

    fn defaults() -> CatalogDefaults {
        CatalogDefaults {
            icon: "system-run-symbolic".to_string(),
            notify: NotifyMode::Status,
        }
    }

    fn paths(entries: &[ScriptEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.relative_path.as_str()).collect()
    }

    #[test]
    fn test_scan_finds_nested_scripts_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "b.sh", "# Name: B\n");
        write_script(dir.path(), "a/b/c.sh", "# Name: C\n");
        write_script(dir.path(), "a/z.sh", "# Name: Z\n");
        write_script(dir.path(), "notes.txt", "# Name: not a script\n");

        let entries = CatalogScanner::new(dir.path(), defaults()).scan();

        assert_eq!(paths(&entries), vec!["a/b/c.sh", "a/z.sh", "b.sh"]);
        let nested = &entries[0];
        assert_eq!(nested.file, "c.sh");
        assert_eq!(nested.directory(), Some("a/b"));
        assert_eq!(entries[2].file, entries[2].relative_path);
    }

    #[test]
    fn test_hidden_files_and_folders_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), ".secret.sh", "# Name: Secret\n");
        write_script(dir.path(), ".hidden/inner.sh", "# Name: Inner\n");
        write_script(dir.path(), "tools/.draft.sh", "# Name: Draft\n");
        write_script(dir.path(), "tools/visible.sh", "# Name: Visible\n");

        let entries = CatalogScanner::new(dir.path(), defaults()).scan();

        assert_eq!(paths(&entries), vec!["tools/visible.sh"]);
    }

    #[test]
    fn test_defaults_fill_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "plain.sh", "#!/bin/sh\necho plain\n");
        write_script(
            dir.path(),
            "custom.sh",
            "# Name: Custom\n# Icon: emblem-ok\n# Notify: none\n",
        );

        let entries = CatalogScanner::new(dir.path(), defaults()).scan();

        let custom = &entries[0];
        assert_eq!(custom.name, "Custom");
        assert_eq!(custom.icon, "emblem-ok");
        assert_eq!(custom.notify, NotifyMode::Silent);

        let plain = &entries[1];
        assert_eq!(plain.name, "plain.sh");
        assert_eq!(plain.icon, "system-run-symbolic");
        assert_eq!(plain.notify, NotifyMode::Status);
    }

    #[test]
    #[traced_test]
    fn test_unreadable_script_is_left_out() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "good.sh", "# Name: Good\n");
        std::fs::write(dir.path().join("bad.sh"), [0xc3, 0x28, 0xff]).unwrap();

        let entries = CatalogScanner::new(dir.path(), defaults()).scan();

        assert_eq!(paths(&entries), vec!["good.sh"]);
        assert!(logs_contain("Failed to parse script metadata"));
    }

    #[test]
    fn test_missing_root_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not").join("there").join("yet");

        let entries = CatalogScanner::new(&root, defaults()).scan();

        assert!(entries.is_empty());
        assert!(root.is_dir());
    }

    #[test]
    fn test_scan_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.sh", "alpha.sh", "m/one.sh", "m/two.sh", "b/x.sh"] {
            write_script(dir.path(), name, "# Name: n\n");
        }
        let scanner = CatalogScanner::new(dir.path(), defaults());

        assert_eq!(scanner.scan(), scanner.scan());
    }

    #[cfg(unix)]
    #[test]
    #[traced_test]
    fn test_unreadable_folder_contributes_nothing() {
        use std::os::unix::fs::PermissionsExt;

        if running_as_root() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "ok.sh", "# Name: Ok\n");
        write_script(dir.path(), "locked/inside.sh", "# Name: Inside\n");
        let locked = dir.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let entries = CatalogScanner::new(dir.path(), defaults()).scan();

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(paths(&entries), vec!["ok.sh"]);
        assert!(logs_contain("Failed to read part of the scripts directory"));
    }
}
