//! Broadcasting modules for observers of the import client.
//!
//! Observers (a CLI, a UI layer, tests) subscribe to these instead of
//! polling component state.

pub mod notifications;
pub mod progress;

pub use notifications::{Notification, NotificationBroadcaster, NotificationKind};
pub use progress::{ProgressBroadcaster, ProgressEvent};
