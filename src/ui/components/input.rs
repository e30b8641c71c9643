//! Single-line text input component.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::theme::Theme;

/// A single-line text input with a movable cursor.
///
/// The cursor position is a character index, so multi-byte input behaves
/// correctly.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input pre-filled with `value`, cursor at the end.
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the text and move the cursor to the end.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    /// The cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(offset, _)| offset)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor);
        self.value.insert(offset, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let offset = self.byte_offset(self.cursor);
        self.value.remove(offset);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let offset = self.byte_offset(self.cursor);
            self.value.remove(offset);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Feed a key event into the input.
    ///
    /// Returns true when the event edited the text or moved the cursor;
    /// keys the input does not understand are left for the caller.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            (KeyCode::Char('a'), KeyModifiers::CONTROL) => self.move_home(),
            (KeyCode::Char('e'), KeyModifiers::CONTROL) => self.move_end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                // Kill to the start of the line.
                let offset = self.byte_offset(self.cursor);
                self.value.drain(..offset);
                self.cursor = 0;
            }
            (KeyCode::Char(c), KeyModifiers::NONE) | (KeyCode::Char(c), KeyModifiers::SHIFT) => {
                self.insert_char(c)
            }
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.move_left(),
            (KeyCode::Right, _) => self.move_right(),
            (KeyCode::Home, _) => self.move_home(),
            (KeyCode::End, _) => self.move_end(),
            _ => return false,
        }
        true
    }

    /// Render the input as a bordered one-line box.
    ///
    /// A focused input gets the highlight border and a visible cursor
    /// block.
    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, theme: &Theme, focused: bool) {
        let border_style = if focused {
            Style::default().fg(theme.highlight)
        } else {
            theme.dim_style()
        };

        let mut spans: Vec<Span> = Vec::new();
        if focused {
            let chars: Vec<char> = self.value.chars().collect();
            let before: String = chars[..self.cursor].iter().collect();
            let at = chars.get(self.cursor).copied().unwrap_or(' ');
            let after: String = chars[(self.cursor + 1).min(chars.len())..].iter().collect();
            spans.push(Span::raw(before));
            spans.push(Span::styled(
                at.to_string(),
                Style::default().fg(theme.fg).bg(theme.highlight),
            ));
            spans.push(Span::raw(after));
        } else {
            spans.push(Span::raw(self.value.clone()));
        }

        let paragraph = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title.to_string()),
        );
        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_appends_at_cursor() {
        let mut input = TextInput::new();
        for c in "abc".chars() {
            input.insert_char(c);
        }
        input.move_left();
        input.insert_char('X');

        assert_eq!(input.value(), "abXc");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn test_backspace_removes_before_cursor() {
        let mut input = TextInput::with_value("abc");
        input.backspace();
        assert_eq!(input.value(), "ab");

        input.move_home();
        input.backspace();
        assert_eq!(input.value(), "ab");
    }

    #[test]
    fn test_delete_removes_at_cursor() {
        let mut input = TextInput::with_value("abc");
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "bc");
    }

    #[test]
    fn test_multibyte_characters() {
        let mut input = TextInput::with_value("héllo");
        assert_eq!(input.cursor(), 5);

        input.move_home();
        input.move_right();
        input.delete();
        assert_eq!(input.value(), "hllo");
    }

    #[test]
    fn test_handle_key_editing() {
        let mut input = TextInput::new();
        assert!(input.handle_key(&key(KeyCode::Char('h'))));
        assert!(input.handle_key(&key(KeyCode::Char('i'))));
        assert_eq!(input.value(), "hi");

        assert!(input.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "h");

        // Keys the input does not understand are not consumed.
        assert!(!input.handle_key(&key(KeyCode::Enter)));
        assert!(!input.handle_key(&key(KeyCode::Esc)));
    }

    #[test]
    fn test_ctrl_u_kills_to_start() {
        let mut input = TextInput::with_value("for: me #Unresolved");
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(input.handle_key(&ctrl_u));
        assert_eq!(input.value(), "");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_set_value_moves_cursor_to_end() {
        let mut input = TextInput::new();
        input.set_value("query");
        assert_eq!(input.cursor(), 5);
    }
}
