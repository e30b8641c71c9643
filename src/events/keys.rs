//! Key binding definitions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key binding configuration.
pub struct KeyBindings {
    /// Whether vim-style bindings are enabled.
    pub vim_mode: bool,
}

impl KeyBindings {
    /// Create new key bindings.
    pub fn new(vim_mode: bool) -> Self {
        Self { vim_mode }
    }

    /// Move selection down: Down, or `j` in vim mode.
    pub fn is_down(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::Down || (self.vim_mode && key.code == KeyCode::Char('j'))
    }

    /// Move selection up: Up, or `k` in vim mode.
    pub fn is_up(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::Up || (self.vim_mode && key.code == KeyCode::Char('k'))
    }

    /// Scroll half a page down: Ctrl-d in vim mode, PageDown always.
    pub fn is_page_down(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::PageDown
            || (self.vim_mode
                && key.code == KeyCode::Char('d')
                && key.modifiers.contains(KeyModifiers::CONTROL))
    }

    /// Scroll half a page up: Ctrl-u in vim mode, PageUp always.
    pub fn is_page_up(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::PageUp
            || (self.vim_mode
                && key.code == KeyCode::Char('u')
                && key.modifiers.contains(KeyModifiers::CONTROL))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_vim_mode_navigation() {
        let bindings = KeyBindings::new(true);
        assert!(bindings.is_down(&key(KeyCode::Char('j'))));
        assert!(bindings.is_up(&key(KeyCode::Char('k'))));
        assert!(bindings.is_down(&key(KeyCode::Down)));
        assert!(bindings.is_up(&key(KeyCode::Up)));
    }

    #[test]
    fn test_arrow_keys_without_vim_mode() {
        let bindings = KeyBindings::new(false);
        assert!(!bindings.is_down(&key(KeyCode::Char('j'))));
        assert!(!bindings.is_up(&key(KeyCode::Char('k'))));
        assert!(bindings.is_down(&key(KeyCode::Down)));
        assert!(bindings.is_up(&key(KeyCode::Up)));
    }

    #[test]
    fn test_ctrl_paging_requires_modifier() {
        let bindings = KeyBindings::new(true);
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert!(bindings.is_page_down(&ctrl_d));
        assert!(!bindings.is_page_down(&key(KeyCode::Char('d'))));
    }
}
