//! Application screens.

mod detail;
mod help;
mod list;

pub use detail::{
    render_compose_overlay, render_edit_overlay, render_prompt_overlay, DetailView,
    DetailViewContext,
};
pub use help::HelpView;
pub use list::{ListView, ListViewContext};
