//! Reusable UI components.

mod action_menu;
mod input;
mod loading;
mod notification;

pub use action_menu::{ActionMenu, MenuOutcome};
pub use input::TextInput;
pub use loading::Spinner;
pub use notification::{Notification, NotificationLevel, NotificationManager};
