//! Toast notifications.
//!
//! Transient user feedback rendered in the bottom-right corner: mutation
//! outcomes, load failures and clipboard confirmations all surface here.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Severity of a notification; drives color, icon and time to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Success => "✓",
            Self::Warning => "⚠",
            Self::Error => "✗",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Success => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    /// How long a toast of this level stays on screen. Failures linger
    /// longer than confirmations.
    pub fn ttl(&self) -> Duration {
        match self {
            Self::Info | Self::Success => Duration::from_secs(3),
            Self::Warning | Self::Error => Duration::from_secs(5),
        }
    }
}

/// A single toast message.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    created_at: Instant,
    ttl: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            ttl: level.ttl(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Error)
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// The toast queue: at most three visible, oldest dropped first.
#[derive(Debug, Default)]
pub struct NotificationManager {
    notifications: VecDeque<Notification>,
}

/// Maximum number of toasts on screen at once.
const MAX_VISIBLE: usize = 3;

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
        while self.notifications.len() > MAX_VISIBLE {
            self.notifications.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Notification::info(message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Notification::success(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Notification::warning(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Notification::error(message));
    }

    /// Drop expired toasts. Called once per tick.
    pub fn tick(&mut self) {
        self.notifications.retain(|n| !n.is_expired());
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// Render the queue stacked in the bottom-right corner.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let width = 50.min(area.width.saturating_sub(4));
        let inner_width = width.saturating_sub(4).max(1) as usize;

        // One box per toast, tall enough for the wrapped message.
        let heights: Vec<u16> = self
            .notifications
            .iter()
            .map(|n| {
                let text_len = n.message.chars().count() + 2;
                ((text_len + inner_width - 1) / inner_width) as u16 + 2
            })
            .collect();
        let total: u16 = heights
            .iter()
            .sum::<u16>()
            .min(area.height.saturating_sub(2));

        let stack = Rect::new(
            area.x + area.width.saturating_sub(width + 2),
            area.y + area.height.saturating_sub(total + 1),
            width,
            total,
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(heights.iter().map(|&h| Constraint::Length(h)))
            .split(stack);

        for (notification, chunk) in self.notifications.iter().zip(chunks.iter()) {
            let style = Style::default().fg(notification.level.color());
            let text = Line::from(vec![
                Span::styled(
                    format!("{} ", notification.level.icon()),
                    style.add_modifier(Modifier::BOLD),
                ),
                Span::styled(&notification.message, style),
            ]);

            frame.render_widget(Clear, *chunk);
            frame.render_widget(
                Paragraph::new(text)
                    .block(Block::default().borders(Borders::ALL).border_style(style))
                    .wrap(Wrap { trim: true }),
                *chunk,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ttls() {
        assert_eq!(NotificationLevel::Info.ttl(), Duration::from_secs(3));
        assert_eq!(NotificationLevel::Success.ttl(), Duration::from_secs(3));
        assert_eq!(NotificationLevel::Warning.ttl(), Duration::from_secs(5));
        assert_eq!(NotificationLevel::Error.ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_level_icons() {
        assert_eq!(NotificationLevel::Success.icon(), "✓");
        assert_eq!(NotificationLevel::Error.icon(), "✗");
    }

    #[test]
    fn test_fresh_notification_not_expired() {
        assert!(!Notification::info("hello").is_expired());
    }

    #[test]
    fn test_queue_caps_at_three() {
        let mut manager = NotificationManager::new();
        manager.info("one");
        manager.success("two");
        manager.warning("three");
        manager.error("four");

        assert_eq!(manager.len(), 3);
        let messages: Vec<&str> = manager.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three", "four"]);
    }

    #[test]
    fn test_tick_drops_expired() {
        let mut manager = NotificationManager::new();
        let mut toast = Notification::info("gone");
        toast.ttl = Duration::from_millis(1);
        manager.push(toast);

        std::thread::sleep(Duration::from_millis(5));
        manager.tick();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut manager = NotificationManager::new();
        manager.info("one");
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }
}
