//! State of the issue list view.
//!
//! All transitions here are synchronous and pure; the async work that
//! drives them lives in the task spawner, and the pagination policy that
//! sequences them lives in the app update loop.

use crate::api::types::{IssueSummary, QuerySuggestion};

/// The issue list: query, suggestions, pagination flags and the issues
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// The current search query text.
    pub query: String,
    /// Suggestion rows for the query input.
    pub query_assist_suggestions: Vec<QuerySuggestion>,
    /// Pagination offset of the next page.
    pub skip: usize,
    /// Whether a first-page load is in flight.
    pub is_loading: bool,
    /// Whether a next-page load is in flight.
    pub is_loading_more: bool,
    /// Whether the last page has been reached.
    pub is_list_end_reached: bool,
    /// User-facing message of the last list failure.
    pub loading_error: Option<String>,
    /// Whether the first load has settled, successfully or not.
    pub is_initialized: bool,
    /// Whether a manual refresh is in flight.
    pub is_refreshing: bool,
    /// The issues, in server order.
    pub issues: Vec<IssueSummary>,
    /// Cursor position in the list.
    pub selected: usize,
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the query text exactly as given.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Begin a fresh first-page load.
    ///
    /// Resets pagination and clears the previous failure so a broken list
    /// can recover.
    pub fn start_loading(&mut self) {
        self.is_loading = true;
        self.skip = 0;
        self.loading_error = None;
        self.is_list_end_reached = false;
    }

    pub fn stop_loading(&mut self) {
        self.is_loading = false;
    }

    /// Begin loading the page at `new_skip`.
    pub fn start_loading_more(&mut self, new_skip: usize) {
        self.is_loading_more = true;
        self.skip = new_skip;
    }

    pub fn stop_loading_more(&mut self) {
        self.is_loading_more = false;
    }

    /// Replace the issue list wholesale.
    ///
    /// No merging, no deduplication; when loading more, the caller
    /// concatenates pages before calling. Marks the list initialized.
    pub fn receive_issues(&mut self, issues: Vec<IssueSummary>) {
        self.issues = issues;
        self.is_initialized = true;
        if !self.issues.is_empty() {
            self.selected = self.selected.min(self.issues.len() - 1);
        } else {
            self.selected = 0;
        }
    }

    /// Record a list load failure.
    ///
    /// Stale results are worse than none, so the issues are dropped;
    /// pagination stops against a broken backend; and the list counts as
    /// initialized so the error row renders instead of the first-load
    /// placeholder.
    pub fn set_loading_error(&mut self, message: impl Into<String>) {
        self.loading_error = Some(message.into());
        self.issues = Vec::new();
        self.is_list_end_reached = true;
        self.is_initialized = true;
        self.selected = 0;
    }

    /// Mark the last page as reached.
    pub fn list_end_reached(&mut self) {
        self.is_list_end_reached = true;
    }

    /// Fold a fresh copy of one issue back into the list.
    ///
    /// Only the list-shaped fields of `updated` are copied into the entry
    /// with the matching ID; anything else on the updated issue never
    /// reaches the list. Order and length are preserved, non-matching
    /// entries are untouched, and an unknown ID is a no-op.
    pub fn update_issue_on_list(&mut self, updated: &IssueSummary) {
        if let Some(entry) = self.issues.iter_mut().find(|issue| issue.id == updated.id) {
            entry.id_readable = updated.id_readable.clone();
            entry.summary = updated.summary.clone();
            entry.fields = updated.fields.clone();
        }
    }

    pub fn set_query_assist_suggestions(&mut self, suggestions: Vec<QuerySuggestion>) {
        self.query_assist_suggestions = suggestions;
    }

    pub fn clear_assist_suggestions(&mut self) {
        self.query_assist_suggestions = Vec::new();
    }

    /// The issue under the cursor.
    pub fn selected_issue(&self) -> Option<&IssueSummary> {
        self.issues.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.issues.is_empty() {
            self.selected = (self.selected + 1).min(self.issues.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Whether the cursor sits on the last loaded issue, which is when
    /// the next page gets requested.
    pub fn at_list_end(&self) -> bool {
        !self.issues.is_empty() && self.selected + 1 == self.issues.len()
    }
}
