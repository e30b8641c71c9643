//! Theme and styling configuration.

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the application.
pub struct Theme {
    /// Primary foreground color.
    pub fg: Color,
    /// Highlight color for selected items.
    pub highlight: Color,
    /// Color for secondary text (ids, timestamps, hints).
    pub dim: Color,
    /// Color for section titles and borders.
    pub accent: Color,
    /// Color for error rows.
    pub error: Color,
}

impl Theme {
    /// Resolve a theme by name; unknown names fall back to dark.
    pub fn by_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            highlight: Color::Cyan,
            dim: Color::DarkGray,
            accent: Color::Blue,
            error: Color::Red,
        }
    }

    pub fn light() -> Self {
        Self {
            fg: Color::Black,
            highlight: Color::Blue,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
        }
    }

    /// Style for the row under the cursor.
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for section titles.
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for secondary text.
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name_falls_back_to_dark() {
        let theme = Theme::by_name("no-such-theme");
        assert_eq!(theme.fg, Color::White);

        let light = Theme::by_name("light");
        assert_eq!(light.fg, Color::Black);
    }
}
