//! Inline loading spinner.

/// Braille spinner frames, advanced once per tick.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A small text spinner for in-flight operations.
///
/// The app ticks one shared spinner; every view that needs a progress
/// marker renders the current frame.
#[derive(Debug, Default)]
pub struct Spinner {
    frame: usize,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next frame.
    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % FRAMES.len();
    }

    /// The current frame glyph.
    pub fn symbol(&self) -> &'static str {
        FRAMES[self.frame]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles_through_frames() {
        let mut spinner = Spinner::new();
        let first = spinner.symbol();

        for _ in 0..FRAMES.len() {
            spinner.tick();
        }

        assert_eq!(spinner.symbol(), first);
    }

    #[test]
    fn test_tick_changes_frame() {
        let mut spinner = Spinner::new();
        let first = spinner.symbol();
        spinner.tick();
        assert_ne!(spinner.symbol(), first);
    }
}
