//! Terminal event polling.

use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};

use super::Event;

const DEFAULT_TICK_RATE: Duration = Duration::from_millis(100);

/// Turns crossterm's event stream into [`Event`]s for the main loop.
///
/// Spinner animation and notification expiry ride on the tick: when no
/// input arrives within the tick rate, an [`Event::Tick`] is emitted.
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
        }
    }

    pub fn with_tick_rate(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Block until the next key press or resize, or until the tick rate
    /// elapses. Key releases and repeats are swallowed so a press is
    /// handled exactly once.
    pub fn next(&self) -> std::io::Result<Event> {
        let deadline = Instant::now() + self.tick_rate;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !event::poll(remaining)? {
                return Ok(Event::Tick);
            }
            match event::read()? {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(Event::Key(key));
                }
                CrosstermEvent::Resize(width, height) => {
                    return Ok(Event::Resize(width, height));
                }
                // Releases, mouse, focus and paste events are ignored;
                // keep polling until the deadline.
                _ => {}
            }
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
