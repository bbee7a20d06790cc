//! The host-facing side of the catalog: the session, its events and notifications.

pub mod events;
pub mod notifications;
pub mod proxy;
pub mod session;

pub use events::{Notification, UserEvent};
pub use proxy::EventProxy;
pub use session::{Session, SessionEvent};
