//! Event handling for the application.
//!
//! This module handles keyboard input, terminal resize and tick events.

mod handler;
mod keys;

pub use handler::EventHandler;
pub use keys::KeyBindings;

/// An event the main loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A key press.
    Key(crossterm::event::KeyEvent),
    /// Terminal resize to (width, height).
    Resize(u16, u16),
    /// No input within the tick rate.
    Tick,
}
