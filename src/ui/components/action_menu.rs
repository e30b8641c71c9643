//! Modal menu presenting the issue actions.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::actions::IssueAction;
use crate::ui::theme::Theme;

/// What the user did with the open menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Selected(IssueAction),
    /// The menu was closed without choosing. Callers treat this as a
    /// silent no-op.
    Dismissed,
}

/// The action menu popup.
#[derive(Debug, Default)]
pub struct ActionMenu {
    actions: Vec<IssueAction>,
    selected: usize,
    visible: bool,
}

impl ActionMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the menu over the given actions. An empty action list is
    /// ignored.
    pub fn open(&mut self, actions: Vec<IssueAction>) {
        if actions.is_empty() {
            return;
        }
        self.actions = actions;
        self.selected = 0;
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.actions.clear();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Handle a key while the menu is open.
    pub fn handle_input(&mut self, key: &KeyEvent) -> Option<MenuOutcome> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(self.actions.len().saturating_sub(1));
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Enter => {
                let action = self.actions.get(self.selected).copied();
                self.close();
                action.map(MenuOutcome::Selected)
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.close();
                Some(MenuOutcome::Dismissed)
            }
            _ => None,
        }
    }

    /// Render the menu centered in `area`.
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if !self.visible {
            return;
        }

        let width = 36.min(area.width.saturating_sub(4));
        let height = self.actions.len() as u16 + 2;
        let popup = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height.min(area.height),
        );

        let lines: Vec<Line> = self
            .actions
            .iter()
            .enumerate()
            .map(|(i, action)| {
                let prefix = if i == self.selected { "> " } else { "  " };
                let style = if i == self.selected {
                    theme.selected_style()
                } else {
                    Style::default().fg(theme.fg)
                };
                Line::from(Span::styled(format!("{}{}", prefix, action.title()), style))
            })
            .collect();

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.title_style())
                    .title("Actions"),
            ),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn open_menu() -> ActionMenu {
        let mut menu = ActionMenu::new();
        menu.open(vec![
            IssueAction::EditIssue,
            IssueAction::CopyIssueUrl,
            IssueAction::OpenInBrowser,
        ]);
        menu
    }

    #[test]
    fn test_open_with_no_actions_is_noop() {
        let mut menu = ActionMenu::new();
        menu.open(vec![]);
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_navigate_and_select() {
        let mut menu = open_menu();

        assert_eq!(menu.handle_input(&key(KeyCode::Char('j'))), None);
        let outcome = menu.handle_input(&key(KeyCode::Enter));

        assert_eq!(
            outcome,
            Some(MenuOutcome::Selected(IssueAction::CopyIssueUrl))
        );
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_selection_clamps_at_ends() {
        let mut menu = open_menu();

        menu.handle_input(&key(KeyCode::Up));
        for _ in 0..5 {
            menu.handle_input(&key(KeyCode::Down));
        }
        let outcome = menu.handle_input(&key(KeyCode::Enter));

        assert_eq!(
            outcome,
            Some(MenuOutcome::Selected(IssueAction::OpenInBrowser))
        );
    }

    #[test]
    fn test_escape_dismisses() {
        let mut menu = open_menu();
        let outcome = menu.handle_input(&key(KeyCode::Esc));
        assert_eq!(outcome, Some(MenuOutcome::Dismissed));
        assert!(!menu.is_visible());
    }
}
