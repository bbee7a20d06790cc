use std::path::{Path, PathBuf};

/// Writes a script below `root`, creating parent folders as needed.
pub fn write_script(root: &Path, relative_path: &str, content: &str) -> PathBuf {
    let path = root.join(relative_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    std::fs::write(&path, content).expect("Failed to write script");
    path
}

/// Like [`write_script`], but marks the file executable.
#[cfg(unix)]
pub fn write_executable_script(root: &Path, relative_path: &str, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_script(root, relative_path, content);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
    path
}

/// Returns true when the current process runs as root (UID 0).
/// Permission-based tests are skipped in that case since root ignores modes.
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no side effects.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
