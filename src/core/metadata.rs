//! Parses the metadata header of a script.
//!
//! The header is the first contiguous block of `#` lines after an optional
//! shebang. Lines of the form `# Key: value` set a field; keys are matched
//! case-insensitively and unknown keys are ignored:
//!
//! ```text
//! #!/bin/bash
//! # Name: Backup Home
//! # Description: Sync ~ to the NAS
//! # Icon: drive-harddisk-symbolic
//! # Notify: stdout
//! rsync -a ~ nas:/backup
//! ```

use super::{CatalogDefaults, CatalogError, NotifyMode, ScriptEntry};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static METADATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*(\w+):\s*(.*)$").expect("metadata line pattern is valid")
});

/// Recoverable problems found while reading a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataDiagnostic {
    /// No `Name` key; the file name is used instead.
    MissingName,
    /// A `Notify` value other than exactly `status`, `stdout` or `none`; the
    /// default is used instead.
    InvalidNotify(String),
}

/// The fields found in a script header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Always resolved: either the header's valid value or the default.
    pub notify: NotifyMode,
    pub diagnostics: Vec<MetadataDiagnostic>,
}

impl ScriptMetadata {
    /// Builds the catalog entry, substituting the file name and the catalog
    /// defaults for anything the header left out.
    pub fn into_entry(
        self,
        file: &str,
        relative_path: &str,
        defaults: &CatalogDefaults,
    ) -> ScriptEntry {
        ScriptEntry {
            file: file.to_string(),
            relative_path: relative_path.to_string(),
            name: self.name.unwrap_or_else(|| file.to_string()),
            description: self.description.unwrap_or_default(),
            icon: self.icon.unwrap_or_else(|| defaults.icon.clone()),
            notify: self.notify,
        }
    }
}

/// Parses the header of `content`. Never fails: a script without any header
/// simply yields empty metadata with the default notification mode.
pub fn parse_metadata(content: &str, default_notify: NotifyMode) -> ScriptMetadata {
    let mut name = None;
    let mut description = None;
    let mut icon = None;
    let mut notify = None;
    let mut diagnostics = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();

        if index == 0 && line.starts_with("#!") {
            continue;
        }
        if !line.starts_with('#') {
            break;
        }

        let Some(captures) = METADATA_LINE.captures(line) else {
            continue;
        };
        let key = captures[1].to_lowercase();
        let value = captures[2].trim();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "name" => name = Some(value.to_string()),
            "description" => description = Some(value.to_string()),
            "icon" => icon = Some(value.to_string()),
            "notify" => match NotifyMode::from_header(value) {
                Some(mode) => notify = Some(mode),
                None => {
                    diagnostics.push(MetadataDiagnostic::InvalidNotify(value.to_string()));
                    notify = Some(default_notify);
                }
            },
            _ => {}
        }
    }

    if name.is_none() {
        diagnostics.push(MetadataDiagnostic::MissingName);
    }

    ScriptMetadata {
        name,
        description,
        icon,
        notify: notify.unwrap_or(default_notify),
        diagnostics,
    }
}

/// Reads `path` and parses its header.
///
/// Fails only when the file cannot be read or is not UTF-8 text.
pub fn read_metadata(
    path: &Path,
    default_notify: NotifyMode,
) -> Result<ScriptMetadata, CatalogError> {
    let bytes = std::fs::read(path).map_err(|e| CatalogError::Io(e, path.to_path_buf()))?;
    let content =
        String::from_utf8(bytes).map_err(|_| CatalogError::InvalidUtf8(path.to_path_buf()))?;

    let metadata = parse_metadata(&content, default_notify);
    for diagnostic in &metadata.diagnostics {
        match diagnostic {
            MetadataDiagnostic::MissingName => {
                tracing::warn!(path = %path.display(), "Script is missing 'Name' metadata, using file name");
            }
            MetadataDiagnostic::InvalidNotify(value) => {
                tracing::warn!(
                    path = %path.display(),
                    value = %value,
                    default = %default_notify,
                    "Invalid notify value, using default"
                );
            }
        }
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defaults() -> CatalogDefaults {
        CatalogDefaults {
            icon: "system-run-symbolic".to_string(),
            notify: NotifyMode::Status,
        }
    }

    #[test]
    fn test_parses_full_header() {
        let content = "#!/bin/bash\n# Name: Backup Home\n# Description: Sync home\n# Icon: drive-harddisk\n# Notify: stdout\nrsync -a ~ nas:\n";
        let meta = parse_metadata(content, NotifyMode::Status);

        assert_eq!(meta.name.as_deref(), Some("Backup Home"));
        assert_eq!(meta.description.as_deref(), Some("Sync home"));
        assert_eq!(meta.icon.as_deref(), Some("drive-harddisk"));
        assert_eq!(meta.notify, NotifyMode::Stdout);
        assert!(meta.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_notify_falls_back_to_default() {
        let meta = parse_metadata(
            "#!/bin/bash\n# Name: Foo\n# Notify: bogus\necho hi",
            NotifyMode::Status,
        );

        assert_eq!(meta.name.as_deref(), Some("Foo"));
        assert_eq!(meta.notify, NotifyMode::Status);
        assert_eq!(
            meta.diagnostics,
            vec![MetadataDiagnostic::InvalidNotify("bogus".to_string())]
        );
    }

    #[test]
    fn test_no_header_uses_file_name_and_defaults() {
        let meta = parse_metadata("#!/bin/sh\necho hi\n", NotifyMode::Silent);
        assert_eq!(meta.diagnostics, vec![MetadataDiagnostic::MissingName]);

        let entry = meta.into_entry("hello.sh", "hello.sh", &defaults());
        assert_eq!(entry.name, "hello.sh");
        assert_eq!(entry.description, "");
        assert_eq!(entry.icon, "system-run-symbolic");
        assert_eq!(entry.notify, NotifyMode::Silent);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let meta = parse_metadata("# NAME: Loud\n# dEsCrIpTiOn: mixed\n", NotifyMode::Status);
        assert_eq!(meta.name.as_deref(), Some("Loud"));
        assert_eq!(meta.description.as_deref(), Some("mixed"));
    }

    #[test]
    fn test_header_stops_at_first_non_comment_line() {
        let content = "#!/bin/bash\n# Name: First\necho start\n# Description: too late\n";
        let meta = parse_metadata(content, NotifyMode::Status);
        assert_eq!(meta.name.as_deref(), Some("First"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn test_blank_line_ends_header() {
        let meta = parse_metadata("#!/bin/bash\n\n# Name: Hidden\n", NotifyMode::Status);
        assert_eq!(meta.name, None);
    }

    #[test]
    fn test_plain_comments_and_unknown_keys_are_ignored() {
        let content = "# just a note\n# Author: someone\n# Name: Tool\n";
        let meta = parse_metadata(content, NotifyMode::Status);
        assert_eq!(meta.name.as_deref(), Some("Tool"));
        assert_eq!(meta.icon, None);
    }

    #[test]
    fn test_value_keeps_colons_and_is_trimmed() {
        let meta = parse_metadata("#Name:   Time: now   \r\n", NotifyMode::Status);
        assert_eq!(meta.name.as_deref(), Some("Time: now"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let meta = parse_metadata("# Name:\n# Icon:   \n", NotifyMode::Status);
        assert_eq!(meta.name, None);
        assert_eq!(meta.icon, None);

        let entry = meta.into_entry("x.sh", "x.sh", &defaults());
        assert_eq!(entry.name, "x.sh");
        assert_eq!(entry.icon, "system-run-symbolic");
    }

    #[test]
    fn test_notify_value_must_be_lower_case() {
        let meta = parse_metadata("# Name: Loud\n# Notify: NONE\n", NotifyMode::Stdout);
        assert_eq!(meta.notify, NotifyMode::Stdout);
        assert_eq!(
            meta.diagnostics,
            vec![MetadataDiagnostic::InvalidNotify("NONE".to_string())]
        );

        let meta = parse_metadata("# Notify: none\n", NotifyMode::Status);
        assert_eq!(meta.notify, NotifyMode::Silent);
    }

    #[test]
    fn test_read_metadata_rejects_binary_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.sh");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x23]).unwrap();

        let err = read_metadata(&path, NotifyMode::Status).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidUtf8(_)));
    }

    #[test]
    fn test_read_metadata_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("gone.sh"), NotifyMode::Status).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_, _)));
    }

    proptest! {
        #[test]
        fn prop_unknown_notify_values_coerce_to_default(
            value in "[A-Za-z]{1,12}",
            default_index in 0usize..3,
        ) {
            prop_assume!(NotifyMode::from_header(&value).is_none());
            let default = NotifyMode::ALL[default_index];
            let content = format!("#!/bin/sh\n# Name: X\n# Notify: {}\n", value);

            let meta = parse_metadata(&content, default);
            prop_assert_eq!(meta.notify, default);
        }
    }
}
