//! Key binding reference, opened with '?'.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::ui::theme::Theme;

/// One section of the help screen.
struct Section {
    title: &'static str,
    bindings: &'static [(&'static str, &'static str)],
}

const SECTIONS: &[Section] = &[
    Section {
        title: "Global",
        bindings: &[
            ("?", "toggle this help"),
            ("p", "switch profile"),
            ("Ctrl-c", "quit"),
        ],
    },
    Section {
        title: "Issue list",
        bindings: &[
            ("j / Down", "next issue"),
            ("k / Up", "previous issue"),
            ("Enter", "open issue"),
            ("/", "search"),
            ("r", "refresh"),
            ("q", "quit"),
        ],
    },
    Section {
        title: "Search",
        bindings: &[
            ("Tab / Down", "next suggestion"),
            ("Up", "previous suggestion"),
            ("Enter", "run query (or apply suggestion)"),
            ("Esc", "cancel"),
        ],
    },
    Section {
        title: "Issue",
        bindings: &[
            ("j / k", "scroll"),
            ("J / K", "move field cursor"),
            ("] / [", "move comment cursor"),
            ("e", "edit summary and description"),
            ("f", "set field under cursor"),
            ("m", "move to another project"),
            ("c", "add comment"),
            ("a", "actions menu"),
            ("r", "refresh"),
            ("q / Esc", "back to list"),
        ],
    },
];

/// The help screen.
#[derive(Debug, Default)]
pub struct HelpView {
    scroll: usize,
}

impl HelpView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_down(&mut self) {
        self.scroll += 1;
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Help ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(theme.title_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = Self::build_lines(theme);
        let max = lines.len().saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max);

        frame.render_widget(
            Paragraph::new(lines).scroll((self.scroll as u16, 0)),
            inner,
        );
    }

    fn build_lines(theme: &Theme) -> Vec<Line<'static>> {
        let mut lines: Vec<Line> = Vec::new();
        for section in SECTIONS {
            lines.push(Line::styled(
                section.title,
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ));
            for (key, description) in section.bindings {
                lines.push(Line::from(vec![
                    Span::styled(format!("{:>12}", key), theme.selected_style()),
                    Span::raw("  "),
                    Span::raw(*description),
                ]));
            }
            lines.push(Line::raw(""));
        }
        lines.push(Line::styled(
            "press ?, q or Esc to close",
            theme.dim_style(),
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_bounds() {
        let mut view = HelpView::new();
        view.scroll_up();
        assert_eq!(view.scroll, 0);
        view.scroll_down();
        view.scroll_down();
        assert_eq!(view.scroll, 2);
        view.reset_scroll();
        assert_eq!(view.scroll, 0);
    }

    #[test]
    fn test_build_lines_covers_all_sections() {
        let lines = HelpView::build_lines(&Theme::dark());
        let expected: usize = SECTIONS
            .iter()
            .map(|s| s.bindings.len() + 2)
            .sum::<usize>()
            + 1;
        assert_eq!(lines.len(), expected);
    }
}
