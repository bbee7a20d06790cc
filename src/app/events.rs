//! Defines the events the catalog and the session send to their host.

use std::path::PathBuf;

/// A desktop-style notification: a title, a body and whether it reports success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub success: bool,
}

/// Events sent from the catalog backend to the host (UI, CLI or tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// A notification to be shown to the user.
    Notification(Notification),
    /// The search overview should be hidden, after a result was activated.
    HideOverview,
    /// A refresh swapped in a new catalog generation.
    CatalogUpdated { root: PathBuf, scripts: usize },
}
