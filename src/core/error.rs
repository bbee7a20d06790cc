//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Most failures inside the scanner and the change monitor are logged and
/// absorbed where they happen, so only a handful of these ever reach a caller:
/// a cancelled query and the activation of an id that no longer exists.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// A script file whose content is not valid UTF-8.
    #[error("Script is not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),

    /// The file system watch for the script directory could not be installed.
    #[error("Failed to watch {1}: {0}")]
    Watch(#[source] notify::Error, PathBuf),

    /// Represents a caller-initiated cancellation of a query.
    #[error("Operation was cancelled")]
    Cancelled,

    /// A result id that does not address an entry of the current catalog.
    #[error("Unknown result id: {0}")]
    UnknownResult(String),
}
