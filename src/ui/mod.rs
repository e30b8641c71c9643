//! Terminal UI: the theme, reusable components and the screens.

mod components;
pub mod theme;
mod views;

pub use components::{
    ActionMenu, MenuOutcome, Notification, NotificationLevel, NotificationManager, Spinner,
    TextInput,
};
pub use theme::Theme;
pub use views::{
    render_compose_overlay, render_edit_overlay, render_prompt_overlay, DetailView,
    DetailViewContext, HelpView, ListView, ListViewContext,
};
