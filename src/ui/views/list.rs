//! Issue list view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::state::ListState;
use crate::ui::components::{Spinner, TextInput};
use crate::ui::theme::Theme;

/// Everything the list screen needs to draw one frame.
pub struct ListViewContext<'a> {
    pub list: &'a ListState,
    pub theme: &'a Theme,
    pub spinner: &'a Spinner,
    pub profile_name: &'a str,
    /// Whether the search input has focus.
    pub searching: bool,
    pub search_input: &'a TextInput,
    /// Highlighted suggestion row, when navigating the dropdown.
    pub suggestion_selected: Option<usize>,
}

/// The issue list screen.
///
/// Holds only the scroll offset; the issues and flags live in
/// [`ListState`].
#[derive(Debug, Default)]
pub struct ListView {
    offset: usize,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &ListViewContext) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        self.render_search_bar(frame, chunks[0], ctx);
        self.render_rows(frame, chunks[1], ctx);

        if ctx.searching && !ctx.list.query_assist_suggestions.is_empty() {
            self.render_suggestions(frame, chunks[1], ctx);
        }
    }

    fn render_search_bar(&self, frame: &mut Frame, area: Rect, ctx: &ListViewContext) {
        let title = format!(" {} ", ctx.profile_name);
        if ctx.searching {
            ctx.search_input
                .render(frame, area, &title, ctx.theme, true);
        } else {
            let query = if ctx.list.query.is_empty() {
                Span::styled("press / to search", ctx.theme.dim_style())
            } else {
                Span::styled(ctx.list.query.clone(), Style::default().fg(ctx.theme.fg))
            };
            let paragraph = Paragraph::new(Line::from(query)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(ctx.theme.dim_style())
                    .title(title),
            );
            frame.render_widget(paragraph, area);
        }
    }

    fn render_rows(&mut self, frame: &mut Frame, area: Rect, ctx: &ListViewContext) {
        let list = ctx.list;
        let theme = ctx.theme;

        if let Some(error) = &list.loading_error {
            let lines = vec![
                Line::raw(""),
                Line::styled(error.clone(), Style::default().fg(theme.error)),
                Line::styled("press r to retry", theme.dim_style()),
            ];
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
            return;
        }

        if !list.is_initialized || (list.is_loading && list.issues.is_empty()) {
            let line = Line::from(vec![
                Span::styled(ctx.spinner.symbol(), theme.title_style()),
                Span::styled(" loading issues", theme.dim_style()),
            ]);
            frame.render_widget(Paragraph::new(vec![Line::raw(""), line]).alignment(Alignment::Center), area);
            return;
        }

        if list.issues.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::styled("no issues match the query", theme.dim_style()))
                    .alignment(Alignment::Center),
                area,
            );
            return;
        }

        let visible = area.height.saturating_sub(1) as usize;
        // Keep the cursor in the window.
        if list.selected < self.offset {
            self.offset = list.selected;
        } else if visible > 0 && list.selected >= self.offset + visible {
            self.offset = list.selected + 1 - visible;
        }

        let id_width = list
            .issues
            .iter()
            .map(|i| i.display_id().chars().count())
            .max()
            .unwrap_or(0);

        let mut lines: Vec<Line> = Vec::with_capacity(visible + 1);
        for (row, issue) in list
            .issues
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(visible)
        {
            let selected = row == list.selected;
            let marker = if selected { "> " } else { "  " };
            let base = if selected {
                ctx.theme.selected_style()
            } else {
                Style::default().fg(theme.fg)
            };

            let mut spans = vec![
                Span::styled(marker, base),
                Span::styled(
                    format!("{:width$}  ", issue.display_id(), width = id_width),
                    if selected { base } else { theme.dim_style() },
                ),
                Span::styled(issue.summary.clone(), base),
            ];
            if let Some(priority) = issue.priority_field() {
                spans.push(Span::styled(
                    format!("  [{}]", priority.value_text()),
                    theme.dim_style(),
                ));
            }
            if let Some(assignee) = issue.assignee_field() {
                spans.push(Span::styled(
                    format!("  @{}", assignee.value_text()),
                    theme.dim_style(),
                ));
            }
            lines.push(Line::from(spans));
        }

        if list.is_loading_more {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(ctx.spinner.symbol(), theme.title_style()),
                Span::styled(" loading more", theme.dim_style()),
            ]));
        } else if list.is_list_end_reached {
            lines.push(Line::styled("  end of results", theme.dim_style()));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_suggestions(&self, frame: &mut Frame, area: Rect, ctx: &ListViewContext) {
        let suggestions = &ctx.list.query_assist_suggestions;
        let height = (suggestions.len() as u16 + 2).min(area.height);
        let width = area.width.saturating_sub(2).min(60);
        let popup = Rect::new(area.x + 1, area.y, width, height);

        let lines: Vec<Line> = suggestions
            .iter()
            .enumerate()
            .take(height.saturating_sub(2) as usize)
            .map(|(i, suggestion)| {
                let selected = ctx.suggestion_selected == Some(i);
                let style = if selected {
                    ctx.theme.selected_style()
                } else {
                    Style::default().fg(ctx.theme.fg)
                };
                let mut spans = vec![Span::styled(suggestion.label().to_string(), style)];
                if let Some(description) = &suggestion.description {
                    spans.push(Span::styled(
                        format!("  {}", description),
                        ctx.theme.dim_style(),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(ctx.theme.dim_style()),
            ),
            popup,
        );
    }
}
