//! Single-issue view, plus the overlays layered on top of it.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::api::types::{IssueSummary, User};
use crate::state::IssueDetailState;
use crate::ui::components::{Spinner, TextInput};
use crate::ui::theme::Theme;

/// Everything the detail screen needs to draw one frame.
pub struct DetailViewContext<'a> {
    pub detail: &'a IssueDetailState,
    /// The list-shape issue shown while the full load is in flight.
    pub placeholder: Option<&'a IssueSummary>,
    pub theme: &'a Theme,
    pub spinner: &'a Spinner,
}

/// The single-issue screen.
///
/// Holds the scroll position and the field and comment cursors; the issue
/// itself lives in [`IssueDetailState`].
#[derive(Debug, Default)]
pub struct DetailView {
    scroll: usize,
    selected_field: usize,
    selected_comment: Option<usize>,
    content_lines: usize,
    visible_height: usize,
}

impl DetailView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.scroll = 0;
        self.selected_field = 0;
        self.selected_comment = None;
    }

    pub fn scroll_down(&mut self) {
        let max = self.content_lines.saturating_sub(self.visible_height);
        self.scroll = (self.scroll + 1).min(max);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    /// Move the field cursor down, clamped to the issue's fields.
    pub fn select_next_field(&mut self, detail: &IssueDetailState) {
        let count = detail.issue.as_ref().map(|i| i.fields.len()).unwrap_or(0);
        if count > 0 && self.selected_field + 1 < count {
            self.selected_field += 1;
        }
    }

    pub fn select_previous_field(&mut self, detail: &IssueDetailState) {
        let _ = detail;
        self.selected_field = self.selected_field.saturating_sub(1);
    }

    /// Index of the field under the cursor, clamped.
    pub fn selected_field_index(&self, detail: &IssueDetailState) -> Option<usize> {
        let count = detail.issue.as_ref().map(|i| i.fields.len()).unwrap_or(0);
        if count == 0 {
            None
        } else {
            Some(self.selected_field.min(count - 1))
        }
    }

    /// Move the comment cursor down; the first press selects the first
    /// comment.
    pub fn select_next_comment(&mut self, detail: &IssueDetailState) {
        let count = detail.issue.as_ref().map(|i| i.comments.len()).unwrap_or(0);
        if count == 0 {
            return;
        }
        self.selected_comment = Some(match self.selected_comment {
            None => 0,
            Some(i) => (i + 1).min(count - 1),
        });
    }

    /// Move the comment cursor up; moving past the first comment clears
    /// the selection.
    pub fn select_previous_comment(&mut self) {
        self.selected_comment = match self.selected_comment {
            Some(0) | None => None,
            Some(i) => Some(i - 1),
        };
    }

    /// Index of the comment under the cursor, clamped.
    pub fn selected_comment_index(&self, detail: &IssueDetailState) -> Option<usize> {
        let count = detail.issue.as_ref().map(|i| i.comments.len()).unwrap_or(0);
        if count == 0 {
            None
        } else {
            self.selected_comment.map(|i| i.min(count - 1))
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &DetailViewContext) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(ctx.theme.dim_style())
            .title(self.title(ctx));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = self.build_lines(ctx);
        self.content_lines = lines.len();
        self.visible_height = inner.height as usize;
        let max = self.content_lines.saturating_sub(self.visible_height);
        self.scroll = self.scroll.min(max);

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll as u16, 0));
        frame.render_widget(paragraph, inner);
    }

    fn title(&self, ctx: &DetailViewContext) -> String {
        let id = ctx
            .detail
            .issue
            .as_ref()
            .map(|i| i.display_id().to_string())
            .or_else(|| ctx.placeholder.map(|p| p.display_id().to_string()))
            .unwrap_or_default();
        if ctx.detail.is_refreshing {
            format!(" {} {} ", id, ctx.spinner.symbol())
        } else {
            format!(" {} ", id)
        }
    }

    fn build_lines(&self, ctx: &DetailViewContext) -> Vec<Line<'static>> {
        let theme = ctx.theme;
        let Some(issue) = &ctx.detail.issue else {
            return self.build_placeholder_lines(ctx);
        };

        let mut lines: Vec<Line> = Vec::new();
        if let Some(project) = &issue.project {
            lines.push(Line::styled(format!("{}", project), theme.dim_style()));
        }
        lines.push(Line::styled(issue.summary.clone(), theme.title_style()));
        lines.push(Line::raw(""));

        let selected = self.selected_field_index(ctx.detail);
        for (i, field) in issue.fields.iter().enumerate() {
            let marker = if selected == Some(i) { "> " } else { "  " };
            let style = if selected == Some(i) {
                theme.selected_style()
            } else {
                Style::default().fg(theme.fg)
            };
            lines.push(Line::from(vec![
                Span::styled(marker.to_string(), style),
                Span::styled(
                    format!("{}: ", field.name.as_deref().unwrap_or(&field.id)),
                    theme.dim_style(),
                ),
                Span::styled(field.value_text(), style),
            ]));
        }

        if let Some(description) = &issue.description {
            lines.push(Line::raw(""));
            for text_line in description.lines() {
                lines.push(Line::styled(
                    text_line.to_string(),
                    Style::default().fg(theme.fg),
                ));
            }
        }

        if !issue.attachments.is_empty() {
            lines.push(Line::raw(""));
            lines.push(Line::styled("Attachments", theme.title_style()));
            for attachment in &issue.attachments {
                let mut spans = vec![
                    Span::styled("  • ".to_string(), theme.dim_style()),
                    Span::styled(attachment.name.clone(), Style::default().fg(theme.fg)),
                ];
                if attachment.id.is_none() {
                    spans.push(Span::styled(
                        format!("  {} uploading", ctx.spinner.symbol()),
                        theme.dim_style(),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        if !issue.links.is_empty() {
            lines.push(Line::raw(""));
            lines.push(Line::styled("Links", theme.title_style()));
            for link in &issue.links {
                let label = link
                    .link_type
                    .as_ref()
                    .and_then(|t| t.name.clone())
                    .unwrap_or_default();
                for linked in &link.issues {
                    lines.push(Line::from(vec![
                        Span::styled(format!("  {} ", label), theme.dim_style()),
                        Span::styled(
                            format!("{}", linked),
                            Style::default().fg(theme.fg),
                        ),
                    ]));
                }
            }
        }

        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("Comments ({})", issue.comments.len()),
            theme.title_style(),
        ));
        let selected_comment = self.selected_comment_index(ctx.detail);
        for (i, comment) in issue.comments.iter().enumerate() {
            let author = comment
                .author
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let marker = if selected_comment == Some(i) { "> " } else { "  " };
            let author_style = if selected_comment == Some(i) {
                theme.selected_style()
            } else {
                theme.dim_style()
            };
            lines.push(Line::from(vec![
                Span::styled(marker.to_string(), author_style),
                Span::styled(author, author_style),
            ]));
            for text_line in comment.text.lines() {
                lines.push(Line::styled(
                    format!("  {}", text_line),
                    Style::default().fg(theme.fg),
                ));
            }
        }

        lines
    }

    /// Drawn before the full issue arrives: the list shape plus a spinner.
    fn build_placeholder_lines(&self, ctx: &DetailViewContext) -> Vec<Line<'static>> {
        let theme = ctx.theme;
        let mut lines: Vec<Line> = Vec::new();
        if let Some(summary) = ctx.placeholder {
            lines.push(Line::styled(summary.summary.clone(), theme.title_style()));
            if let Some(priority) = summary.priority_field() {
                lines.push(Line::from(vec![
                    Span::styled("  Priority: ".to_string(), theme.dim_style()),
                    Span::styled(priority.value_text(), Style::default().fg(theme.fg)),
                ]));
            }
            if let Some(assignee) = summary.assignee_field() {
                lines.push(Line::from(vec![
                    Span::styled("  Assignee: ".to_string(), theme.dim_style()),
                    Span::styled(assignee.value_text(), Style::default().fg(theme.fg)),
                ]));
            }
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled(ctx.spinner.symbol(), theme.title_style()),
            Span::styled(" loading issue", theme.dim_style()),
        ]));
        lines
    }
}

/// A centered popup rectangle of at most `width` x `height`.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// The summary/description edit overlay.
pub fn render_edit_overlay(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    spinner: &Spinner,
    summary_input: &TextInput,
    description_input: &TextInput,
    description_focused: bool,
    saving: bool,
) {
    let popup = popup_area(area, 70, 9);
    frame.render_widget(Clear, popup);

    let title = if saving {
        format!(" Edit issue {} ", spinner.symbol())
    } else {
        " Edit issue ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.title_style())
        .title(title);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    summary_input.render(frame, chunks[0], " Summary ", theme, !description_focused);
    description_input.render(frame, chunks[1], " Description ", theme, description_focused);
    frame.render_widget(
        Paragraph::new(Line::styled(
            "Tab switch field  Enter save  Esc cancel",
            theme.dim_style(),
        ))
        .alignment(Alignment::Center),
        chunks[2],
    );
}

/// The comment compose overlay, with mention suggestions underneath.
pub fn render_compose_overlay(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    comment_input: &TextInput,
    suggestions: &[User],
) {
    let extra = suggestions.len().min(5) as u16;
    let popup = popup_area(area, 70, 6 + extra);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.title_style())
        .title(" Add comment ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    comment_input.render(frame, chunks[0], " Comment ", theme, true);

    if !suggestions.is_empty() {
        let lines: Vec<Line> = suggestions
            .iter()
            .take(extra as usize)
            .map(|user| {
                Line::from(vec![
                    Span::styled(
                        format!("@{}", user.login.as_deref().unwrap_or(&user.id)),
                        Style::default().fg(theme.fg),
                    ),
                    Span::styled(format!("  {}", user), theme.dim_style()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[1]);
    }

    frame.render_widget(
        Paragraph::new(Line::styled("Enter post  Esc close", theme.dim_style()))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

/// A single-line prompt overlay, shared by the attach-path, field-value and
/// project prompts.
pub fn render_prompt_overlay(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    title: &str,
    input: &TextInput,
) {
    let popup = popup_area(area, 60, 5);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.title_style());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(inner);

    input.render(frame, chunks[0], title, theme, true);
    frame.render_widget(
        Paragraph::new(Line::styled("Enter apply  Esc cancel", theme.dim_style()))
            .alignment(Alignment::Center),
        chunks[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{IssueDetail, IssueField};
    use serde_json::json;
    use std::collections::HashMap;

    fn state_with_fields(count: usize) -> IssueDetailState {
        let mut state = IssueDetailState::new();
        state.set_issue(IssueDetail {
            id: "2-1".to_string(),
            id_readable: Some("DEMO-1".to_string()),
            number_in_project: Some(1),
            summary: "Test".to_string(),
            description: None,
            project: None,
            fields: (0..count)
                .map(|i| IssueField {
                    id: format!("110-{}", i),
                    name: Some(format!("Field {}", i)),
                    value: json!(null),
                    has_state_machine: false,
                })
                .collect(),
            comments: vec![],
            attachments: vec![],
            links: vec![],
            field_hash: HashMap::new(),
        });
        state
    }

    #[test]
    fn test_field_cursor_clamps_to_fields() {
        let state = state_with_fields(2);
        let mut view = DetailView::new();

        assert_eq!(view.selected_field_index(&state), Some(0));
        view.select_next_field(&state);
        assert_eq!(view.selected_field_index(&state), Some(1));
        // At the end; stays put.
        view.select_next_field(&state);
        assert_eq!(view.selected_field_index(&state), Some(1));

        view.select_previous_field(&state);
        view.select_previous_field(&state);
        assert_eq!(view.selected_field_index(&state), Some(0));
    }

    #[test]
    fn test_field_cursor_without_issue() {
        let state = IssueDetailState::new();
        let mut view = DetailView::new();
        assert_eq!(view.selected_field_index(&state), None);
        view.select_next_field(&state);
        assert_eq!(view.selected_field_index(&state), None);
    }

    #[test]
    fn test_selected_index_survives_shrinking_field_list() {
        let mut view = DetailView::new();
        let state = state_with_fields(5);
        for _ in 0..4 {
            view.select_next_field(&state);
        }
        assert_eq!(view.selected_field_index(&state), Some(4));

        // The reload came back with fewer fields.
        let smaller = state_with_fields(2);
        assert_eq!(view.selected_field_index(&smaller), Some(1));
    }

    fn state_with_comments(count: usize) -> IssueDetailState {
        let mut state = state_with_fields(0);
        if let Some(issue) = state.issue.as_mut() {
            issue.comments = (0..count)
                .map(|i| crate::api::types::Comment {
                    id: format!("4-{}", i),
                    text: format!("comment {}", i),
                    author: None,
                    created: None,
                })
                .collect();
        }
        state
    }

    #[test]
    fn test_comment_cursor_starts_cleared_and_clamps() {
        let state = state_with_comments(2);
        let mut view = DetailView::new();

        assert_eq!(view.selected_comment_index(&state), None);
        view.select_next_comment(&state);
        assert_eq!(view.selected_comment_index(&state), Some(0));
        view.select_next_comment(&state);
        view.select_next_comment(&state);
        assert_eq!(view.selected_comment_index(&state), Some(1));

        // Moving back past the first comment clears the selection.
        view.select_previous_comment();
        assert_eq!(view.selected_comment_index(&state), Some(0));
        view.select_previous_comment();
        assert_eq!(view.selected_comment_index(&state), None);
    }

    #[test]
    fn test_comment_cursor_without_comments() {
        let state = state_with_comments(0);
        let mut view = DetailView::new();
        view.select_next_comment(&state);
        assert_eq!(view.selected_comment_index(&state), None);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut view = DetailView::new();
        view.content_lines = 20;
        view.visible_height = 15;
        for _ in 0..10 {
            view.scroll_down();
        }
        assert_eq!(view.scroll, 5);
        view.scroll_up();
        assert_eq!(view.scroll, 4);
        view.reset();
        assert_eq!(view.scroll, 0);
    }

    #[test]
    fn test_popup_area_is_clamped_and_centered() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = popup_area(area, 60, 10);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 15);

        let tiny = popup_area(Rect::new(0, 0, 10, 4), 60, 10);
        assert_eq!(tiny.width, 10);
        assert_eq!(tiny.height, 4);
    }
}
