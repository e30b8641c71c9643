//! Main application state and event loop.
//!
//! This module implements The Elm Architecture (TEA) pattern: `update`
//! folds key and tick events into the model, `handle_message` folds
//! results arriving from background tasks, and `view` renders the whole
//! frame from the model. All remote work is spawned through the
//! [`TaskSpawner`]; nothing here awaits.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::actions::{
    available_actions, copy_comment_url, copy_issue_url, open_in_browser, IssueAction,
};
use crate::api::permissions::PermissionCache;
use crate::api::types::{IssueSummary, ProjectRef, User};
use crate::config::{Config, Profile};
use crate::error::AppError;
use crate::events::{Event, KeyBindings};
use crate::state::{IssueDetailState, ListState, ViewSession};
use crate::storage::Storage;
use crate::tasks::{
    ApiMessage, AttachOutcome, CommentOutcome, MutationOutcome, PickedFile, SharedApi,
    TaskSpawner,
};
use crate::ui::{
    render_compose_overlay, render_edit_overlay, render_prompt_overlay, ActionMenu, DetailView,
    DetailViewContext, HelpView, ListView, ListViewContext, MenuOutcome, NotificationManager,
    Spinner, TextInput, Theme,
};
use crate::usage;

/// The current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// The backend handshake is in flight.
    #[default]
    Connecting,
    /// The issue list.
    IssueList,
    /// A single issue.
    IssueDetail,
    /// The key binding reference.
    Help,
}

/// The single-line prompt for a custom field edit.
struct FieldEditor {
    field_id: String,
    has_state_machine: bool,
    name: String,
    input: TextInput,
}

/// The main application model.
pub struct App {
    state: AppState,
    /// Where to return when help closes.
    previous_state: AppState,
    should_quit: bool,
    /// Set when an unrecoverable error ends the run; printed after the
    /// terminal is restored.
    fatal_error: Option<AppError>,

    config: Config,
    profile: Profile,
    keys: KeyBindings,
    theme: Theme,
    issues_per_page: usize,
    storage: Storage,
    spawner: TaskSpawner,

    // Established by the handshake.
    api: Option<SharedApi>,
    base_url: String,
    current_user: Option<User>,
    permissions: PermissionCache,

    /// Query passed on the command line, consumed by the first load.
    initial_query: Option<String>,

    notifications: NotificationManager,
    spinner: Spinner,

    list: ListState,
    list_session: ViewSession,
    list_view: ListView,
    searching: bool,
    search_input: TextInput,
    suggestion_selected: Option<usize>,

    detail: IssueDetailState,
    detail_session: ViewSession,
    detail_view: DetailView,
    detail_issue_id: Option<String>,
    /// The list-shape issue shown while the full load is in flight.
    detail_placeholder: Option<IssueSummary>,

    action_menu: ActionMenu,
    summary_input: TextInput,
    description_input: TextInput,
    edit_focus_description: bool,
    comment_input: TextInput,
    attach_input: Option<TextInput>,
    field_editor: Option<FieldEditor>,
    project_input: Option<TextInput>,

    help_view: HelpView,
}

impl App {
    pub fn new(config: Config, profile: Profile, storage: Storage, spawner: TaskSpawner) -> Self {
        let theme = Theme::by_name(&config.settings.theme);
        let keys = KeyBindings::new(config.settings.vim_mode);
        let issues_per_page = config.settings.issues_per_page;

        Self {
            state: AppState::Connecting,
            previous_state: AppState::Connecting,
            should_quit: false,
            fatal_error: None,
            config,
            profile,
            keys,
            theme,
            issues_per_page,
            storage,
            spawner,
            api: None,
            base_url: String::new(),
            current_user: None,
            permissions: PermissionCache::default(),
            initial_query: None,
            notifications: NotificationManager::new(),
            spinner: Spinner::new(),
            list: ListState::new(),
            list_session: ViewSession::new(),
            list_view: ListView::new(),
            searching: false,
            search_input: TextInput::new(),
            suggestion_selected: None,
            detail: IssueDetailState::new(),
            detail_session: ViewSession::new(),
            detail_view: DetailView::new(),
            detail_issue_id: None,
            detail_placeholder: None,
            action_menu: ActionMenu::new(),
            summary_input: TextInput::new(),
            description_input: TextInput::new(),
            edit_focus_description: false,
            comment_input: TextInput::new(),
            attach_input: None,
            field_editor: None,
            project_input: None,
            help_view: HelpView::new(),
        }
    }

    /// Override the first query, usually from the command line.
    pub fn set_initial_query(&mut self, query: Option<String>) {
        self.initial_query = query;
    }

    /// Start the backend handshake for the current profile.
    pub fn connect(&mut self) {
        info!(profile = %self.profile.name, "connecting");
        self.state = AppState::Connecting;
        self.spawner.spawn_connect(self.profile.clone());
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// The error that ended the run, if any.
    pub fn fatal_error(&self) -> Option<&AppError> {
        self.fatal_error.as_ref()
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    pub fn detail(&self) -> &IssueDetailState {
        &self.detail
    }

    fn notify_error(&mut self, message: impl Into<String>) {
        self.notifications.error(message);
    }

    /// Route a recoverable error to a toast; everything else ends the run.
    fn handle_error(&mut self, error: AppError) {
        if error.is_critical() {
            warn!(%error, "critical error, shutting down");
            self.fatal_error = Some(error);
            self.should_quit = true;
        } else {
            self.notify_error(error.user_message());
        }
    }

    /// Install an established connection. Kicks off the first list load
    /// from the stored query and the cached first page.
    pub fn install_connection(
        &mut self,
        api: SharedApi,
        base_url: String,
        user: User,
        permissions: PermissionCache,
    ) {
        info!(user = %user, "connected");
        self.api = Some(api);
        self.base_url = base_url;
        self.current_user = Some(user);
        self.permissions = permissions;
        self.state = AppState::IssueList;

        let query = self
            .initial_query
            .take()
            .or_else(|| self.storage.last_query())
            .unwrap_or_default();
        self.list.set_query(query);

        // Show the cached page immediately; the fresh load replaces it.
        if let Some(cached) = self.storage.cached_issues() {
            self.list.receive_issues(cached);
        }

        self.list.start_loading();
        self.spawn_first_page(false);
    }

    fn spawn_first_page(&self, is_background_refresh: bool) {
        let Some(api) = &self.api else {
            return;
        };
        self.spawner.spawn_fetch_issues(
            api,
            &self.list_session.guard(),
            self.list.query.clone(),
            self.issues_per_page,
            is_background_refresh,
        );
    }

    // ---------------------------------------------------------------- update

    /// Fold one terminal event into the model.
    pub fn update(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(_, _) => {}
            Event::Tick => {
                self.spinner.tick();
                self.notifications.tick();
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.state == AppState::Help {
            self.handle_help_key(&key);
            return;
        }

        // Overlays swallow input, innermost first.
        if self.action_menu.is_visible() {
            self.handle_menu_key(&key);
            return;
        }
        if self.attach_input.is_some() {
            self.handle_attach_key(&key);
            return;
        }
        if self.field_editor.is_some() {
            self.handle_field_editor_key(&key);
            return;
        }
        if self.project_input.is_some() {
            self.handle_project_key(&key);
            return;
        }
        if self.detail.edit_mode {
            self.handle_edit_key(&key);
            return;
        }
        if self.detail.add_comment_mode {
            self.handle_compose_key(&key);
            return;
        }
        if self.searching {
            self.handle_search_key(&key);
            return;
        }

        if key.code == KeyCode::Char('?') {
            self.previous_state = self.state;
            self.help_view.reset_scroll();
            self.state = AppState::Help;
            return;
        }
        if key.code == KeyCode::Char('p') {
            self.switch_to_next_profile();
            return;
        }

        match self.state {
            AppState::Connecting => {
                if key.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::IssueList => self.handle_list_key(&key),
            AppState::IssueDetail => self.handle_detail_key(&key),
            AppState::Help => {}
        }
    }

    fn handle_help_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => {
                self.state = self.previous_state;
            }
            _ if self.keys.is_down(key) => self.help_view.scroll_down(),
            _ if self.keys.is_up(key) => self.help_view.scroll_up(),
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, key: &KeyEvent) {
        match self.action_menu.handle_input(key) {
            Some(MenuOutcome::Selected(action)) => self.run_action(action),
            // Dismissal is a silent no-op.
            Some(MenuOutcome::Dismissed) => debug!("action menu dismissed"),
            None => {}
        }
    }

    fn handle_list_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => {
                self.searching = true;
                self.suggestion_selected = None;
                self.search_input.set_value(self.list.query.clone());
                self.spawn_suggestions();
            }
            KeyCode::Char('r') => self.refresh_list(),
            KeyCode::Enter => self.open_selected_issue(),
            _ if self.keys.is_down(key) => {
                if self.list.at_list_end() {
                    self.load_more();
                } else {
                    self.list.select_next();
                }
            }
            _ if self.keys.is_up(key) => self.list.select_previous(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.searching = false;
                self.suggestion_selected = None;
                self.list.clear_assist_suggestions();
            }
            KeyCode::Enter => {
                if let Some(index) = self.suggestion_selected {
                    self.apply_suggestion(index);
                } else {
                    let query = self.search_input.value().to_string();
                    self.submit_search(query);
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                let count = self.list.query_assist_suggestions.len();
                if count > 0 {
                    self.suggestion_selected = Some(match self.suggestion_selected {
                        Some(i) => (i + 1) % count,
                        None => 0,
                    });
                }
            }
            KeyCode::Up => {
                let count = self.list.query_assist_suggestions.len();
                if count > 0 {
                    self.suggestion_selected = Some(match self.suggestion_selected {
                        Some(0) | None => count - 1,
                        Some(i) => i - 1,
                    });
                }
            }
            _ => {
                if self.search_input.handle_key(key) {
                    self.suggestion_selected = None;
                    self.spawn_suggestions();
                }
            }
        }
    }

    fn handle_detail_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.close_detail(),
            KeyCode::Char('r') => self.refresh_detail(),
            KeyCode::Char('e') => self.start_editing(),
            KeyCode::Char('c') => self.start_composing(),
            KeyCode::Char('a') => self.show_actions(),
            KeyCode::Char('f') => self.open_field_editor(),
            KeyCode::Char('m') => {
                if self.detail.fully_loaded {
                    self.project_input = Some(TextInput::new());
                }
            }
            KeyCode::Char('J') => self.detail_view.select_next_field(&self.detail),
            KeyCode::Char('K') => self.detail_view.select_previous_field(&self.detail),
            KeyCode::Char(']') => self.detail_view.select_next_comment(&self.detail),
            KeyCode::Char('[') => self.detail_view.select_previous_comment(),
            _ if self.keys.is_down(key) => self.detail_view.scroll_down(),
            _ if self.keys.is_up(key) => self.detail_view.scroll_up(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => self.detail.cancel_editing(),
            KeyCode::Tab => self.edit_focus_description = !self.edit_focus_description,
            KeyCode::Enter => self.save_changes(),
            _ => {
                let input = if self.edit_focus_description {
                    &mut self.description_input
                } else {
                    &mut self.summary_input
                };
                if input.handle_key(key) {
                    self.detail.summary_copy = self.summary_input.value().to_string();
                    self.detail.description_copy = self.description_input.value().to_string();
                }
            }
        }
    }

    fn handle_compose_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                // The draft survives; only a successful post clears it.
                self.detail.comment_text = self.comment_input.value().to_string();
                self.detail.stop_composing();
            }
            KeyCode::Enter => self.post_comment(),
            _ => {
                if self.comment_input.handle_key(key) {
                    self.detail.comment_text = self.comment_input.value().to_string();
                    self.refresh_mentions();
                }
            }
        }
    }

    fn handle_attach_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                // Cancelled picker: silent no-op.
                self.attach_input = None;
            }
            KeyCode::Enter => {
                let Some(input) = self.attach_input.take() else {
                    return;
                };
                let path = input.value().trim().to_string();
                if path.is_empty() {
                    return;
                }
                self.spawner
                    .spawn_pick_file(&self.detail_session.guard(), path.into());
            }
            _ => {
                if let Some(input) = self.attach_input.as_mut() {
                    input.handle_key(key);
                }
            }
        }
    }

    fn handle_field_editor_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.field_editor = None;
            }
            KeyCode::Enter => {
                let Some(editor) = self.field_editor.take() else {
                    return;
                };
                self.submit_field_edit(editor);
            }
            _ => {
                if let Some(editor) = self.field_editor.as_mut() {
                    editor.input.handle_key(key);
                }
            }
        }
    }

    fn handle_project_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.project_input = None;
            }
            KeyCode::Enter => {
                let Some(input) = self.project_input.take() else {
                    return;
                };
                let project_id = input.value().trim().to_string();
                if !project_id.is_empty() {
                    self.submit_project_move(project_id);
                }
            }
            _ => {
                if let Some(input) = self.project_input.as_mut() {
                    input.handle_key(key);
                }
            }
        }
    }

    // -------------------------------------------------------- list commands

    fn submit_search(&mut self, query: String) {
        self.searching = false;
        self.suggestion_selected = None;
        self.list.clear_assist_suggestions();
        self.list_view.reset();

        if let Err(e) = self.storage.store_last_query(&query) {
            warn!(%e, "failed to persist last query");
        }
        if !query.is_empty() {
            if let Err(e) = self.storage.push_recent_search(&query) {
                warn!(%e, "failed to persist recent search");
            }
        }

        usage::track(usage::CATEGORY_ISSUE_LIST, "Submitted search");
        self.list.set_query(query);
        self.list.start_loading();
        self.spawn_first_page(false);
    }

    fn apply_suggestion(&mut self, index: usize) {
        let Some(suggestion) = self.list.query_assist_suggestions.get(index) else {
            return;
        };
        let applied = suggestion.apply_to(self.search_input.value());
        // Saved searches and recents carry a full query and run at once;
        // assist completions go back into the input.
        if suggestion.query.is_some() {
            self.submit_search(applied);
        } else {
            self.search_input.set_value(applied);
            self.suggestion_selected = None;
            self.spawn_suggestions();
        }
    }

    fn spawn_suggestions(&mut self) {
        let Some(api) = &self.api else {
            return;
        };
        let owner_id = self
            .current_user
            .as_ref()
            .map(|user| user.ownership_id().to_string())
            .unwrap_or_default();
        self.spawner.spawn_fetch_suggestions(
            api,
            &self.list_session.guard(),
            self.storage.recent_searches(),
            owner_id,
            self.search_input.value().to_string(),
            self.search_input.cursor(),
        );
    }

    fn refresh_list(&mut self) {
        if self.list.is_refreshing {
            return;
        }
        usage::track(usage::CATEGORY_ISSUE_LIST, "Manually refreshed");
        self.list.is_refreshing = true;
        self.spawn_first_page(true);
    }

    /// Request the next page. Only one page load runs at a time, and a
    /// reached end stops pagination entirely.
    fn load_more(&mut self) {
        if self.list.is_loading_more || self.list.is_list_end_reached {
            return;
        }
        let Some(api) = &self.api else {
            return;
        };
        let new_skip = self.list.skip + self.issues_per_page;
        self.list.start_loading_more(new_skip);
        self.spawner.spawn_load_more(
            api,
            &self.list_session.guard(),
            self.list.query.clone(),
            self.issues_per_page,
            new_skip,
        );
    }

    fn open_selected_issue(&mut self) {
        let Some(issue) = self.list.selected_issue() else {
            return;
        };
        let issue_id = issue.id.clone();
        self.detail_placeholder = Some(issue.clone());
        self.detail = IssueDetailState::new();
        self.detail_view.reset();
        self.detail_issue_id = Some(issue_id.clone());

        self.detail_session.close();
        self.detail_session = ViewSession::new();

        usage::track(usage::CATEGORY_ISSUE, "Opened");
        if let Some(api) = &self.api {
            self.spawner
                .spawn_load_issue(api, &self.detail_session.guard(), issue_id);
        }
        self.state = AppState::IssueDetail;
    }

    // ------------------------------------------------------ detail commands

    fn close_detail(&mut self) {
        self.detail_session.close();
        self.detail = IssueDetailState::new();
        self.detail_issue_id = None;
        self.detail_placeholder = None;
        self.comment_input.clear();
        self.state = AppState::IssueList;
    }

    fn refresh_detail(&mut self) {
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        self.detail.is_refreshing = true;
        self.spawner
            .spawn_load_issue(api, &self.detail_session.guard(), issue_id.clone());
    }

    fn start_editing(&mut self) {
        if !self.detail.fully_loaded
            || !self
                .permissions
                .can_update_general_info(self.detail.project())
        {
            return;
        }
        self.detail.start_editing();
        self.summary_input.set_value(self.detail.summary_copy.clone());
        self.description_input
            .set_value(self.detail.description_copy.clone());
        self.edit_focus_description = false;
    }

    fn save_changes(&mut self) {
        if self.detail.is_saving_edited_issue {
            return;
        }
        // Guard before the local flag flip: without a spawn there is no
        // settle message to ever clear it.
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        self.detail.begin_save();
        usage::track(usage::CATEGORY_ISSUE, "Updated");
        self.spawner.spawn_save_changes(
            api,
            &self.detail_session.guard(),
            issue_id.clone(),
            self.detail.summary_copy.clone(),
            self.detail.description_copy.clone(),
        );
    }

    fn start_composing(&mut self) {
        if !self.detail.can_add_comment(&self.permissions) {
            return;
        }
        self.detail.start_composing();
        self.comment_input.set_value(self.detail.comment_text.clone());
    }

    fn post_comment(&mut self) {
        let text = self.comment_input.value().trim().to_string();
        if text.is_empty() {
            return;
        }
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        usage::track(usage::CATEGORY_ISSUE, "Added comment");
        self.spawner
            .spawn_add_comment(api, &self.detail_session.guard(), issue_id.clone(), text);
    }

    /// Fetch mention rows for the text after the last `@`, if any.
    fn refresh_mentions(&mut self) {
        let text = self.comment_input.value();
        let Some(at) = text.rfind('@') else {
            self.detail.comment_suggestions = Vec::new();
            return;
        };
        let query = text[at + 1..].to_string();
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        self.spawner.spawn_fetch_mentions(
            api,
            &self.detail_session.guard(),
            issue_id.clone(),
            query,
        );
    }

    fn show_actions(&mut self) {
        let Some(issue) = &self.detail.issue else {
            return;
        };
        let selected_comment = self
            .detail_view
            .selected_comment_index(&self.detail)
            .and_then(|i| issue.comments.get(i));
        let actions = available_actions(issue, &self.permissions, selected_comment);
        self.action_menu.open(actions);
    }

    /// The comment under the detail view's comment cursor, if any.
    fn selected_comment(&self) -> Option<&crate::api::types::Comment> {
        let issue = self.detail.issue.as_ref()?;
        let index = self.detail_view.selected_comment_index(&self.detail)?;
        issue.comments.get(index)
    }

    fn run_action(&mut self, action: IssueAction) {
        match action {
            IssueAction::EditIssue => self.start_editing(),
            IssueAction::CopyIssueUrl => {
                let Some(issue) = &self.detail.issue else {
                    return;
                };
                match copy_issue_url(issue, &self.base_url) {
                    Ok(url) => {
                        debug!(%url, "copied issue url");
                        self.notifications.success("Issue URL has been copied");
                    }
                    Err(error) => self.handle_error(error),
                }
            }
            IssueAction::OpenInBrowser => {
                let Some(issue) = &self.detail.issue else {
                    return;
                };
                match open_in_browser(issue, &self.base_url) {
                    Ok(url) => debug!(%url, "opened issue in browser"),
                    Err(error) => self.handle_error(error),
                }
            }
            IssueAction::AttachImage => {
                self.attach_input = Some(TextInput::new());
            }
            IssueAction::CopyCommentUrl => {
                let (Some(issue), Some(comment)) = (&self.detail.issue, self.selected_comment())
                else {
                    return;
                };
                match copy_comment_url(issue, &self.base_url, comment) {
                    Ok(url) => {
                        debug!(%url, "copied comment url");
                        self.notifications.success("Comment URL has been copied");
                    }
                    Err(error) => self.handle_error(error),
                }
            }
            IssueAction::ReplyToComment => self.start_reply(),
        }
    }

    /// Open the comment composer pre-filled with a mention of the selected
    /// comment's author.
    fn start_reply(&mut self) {
        if !self.detail.can_add_comment(&self.permissions) {
            return;
        }
        let mention = self
            .selected_comment()
            .and_then(|comment| comment.author.as_ref())
            .and_then(|author| author.login.as_deref())
            .map(|login| format!("@{} ", login));
        if let Some(mention) = mention {
            self.detail.comment_text = mention;
        }
        self.start_composing();
    }

    fn open_field_editor(&mut self) {
        let Some(index) = self.detail_view.selected_field_index(&self.detail) else {
            return;
        };
        let Some(issue) = &self.detail.issue else {
            return;
        };
        let field = &issue.fields[index];
        self.field_editor = Some(FieldEditor {
            field_id: field.id.clone(),
            has_state_machine: field.has_state_machine,
            name: field.name.clone().unwrap_or_else(|| field.id.clone()),
            input: TextInput::with_value(field.value_text()),
        });
    }

    fn submit_field_edit(&mut self, editor: FieldEditor) {
        let text = editor.input.value().trim().to_string();
        if text.is_empty() {
            return;
        }
        // State-machine fields take an event name; plain fields a value.
        let value = if editor.has_state_machine {
            json!({ "id": text })
        } else {
            json!({ "name": text })
        };

        // Optimistic: the view shows the new value before the remote call.
        self.detail.apply_field_value(&editor.field_id, value.clone());

        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        usage::track(usage::CATEGORY_ISSUE, "Updated field");
        self.spawner.spawn_update_field(
            api,
            &self.detail_session.guard(),
            issue_id.clone(),
            editor.field_id,
            editor.has_state_machine,
            value,
        );
    }

    fn submit_project_move(&mut self, project_id: String) {
        // Optimistic: the view moves before the remote call.
        self.detail.apply_project(ProjectRef {
            id: project_id.clone(),
            short_name: None,
            name: None,
            ring_id: None,
        });
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        usage::track(usage::CATEGORY_ISSUE, "Moved to project");
        self.spawner.spawn_update_project(
            api,
            &self.detail_session.guard(),
            issue_id.clone(),
            project_id,
        );
    }

    fn switch_to_next_profile(&mut self) {
        if self.config.profiles.len() < 2 {
            return;
        }
        let current = self
            .config
            .profiles
            .iter()
            .position(|p| p.name == self.profile.name)
            .unwrap_or(0);
        let next = self.config.profiles[(current + 1) % self.config.profiles.len()].clone();
        info!(from = %self.profile.name, to = %next.name, "switching profile");

        // Drop everything tied to the old backend.
        self.list_session.close();
        self.detail_session.close();
        self.list_session = ViewSession::new();
        self.detail_session = ViewSession::new();
        self.list = ListState::new();
        self.detail = IssueDetailState::new();
        self.detail_issue_id = None;
        self.detail_placeholder = None;
        self.list_view.reset();
        self.searching = false;
        self.api = None;
        self.current_user = None;
        self.permissions = PermissionCache::default();

        match Storage::new(&next.name) {
            Ok(storage) => self.storage = storage,
            Err(error) => {
                self.handle_error(AppError::Io(error));
                return;
            }
        }
        self.profile = next;
        self.connect();
    }

    // ------------------------------------------------------------- messages

    /// Fold one background-task result into the model.
    ///
    /// Results stamped with a stale session ID are dropped: the view that
    /// asked for them is gone.
    pub fn handle_message(&mut self, message: ApiMessage) {
        match message {
            ApiMessage::ClientConnected(result) => match result {
                Ok(connection) => {
                    let crate::tasks::Connection {
                        client,
                        user,
                        permissions,
                    } = *connection;
                    let base_url = client.base_url().to_string();
                    self.install_connection(Arc::new(client), base_url, user, permissions);
                }
                Err(error) => {
                    self.fatal_error = Some(AppError::Api(error));
                    self.should_quit = true;
                }
            },

            ApiMessage::IssuesFetched {
                session,
                query,
                result,
                is_background_refresh,
            } => {
                if !self.list_session.accepts(session) || query != self.list.query {
                    debug!("dropping stale issue page");
                    return;
                }
                self.list.stop_loading();
                if is_background_refresh {
                    self.list.is_refreshing = false;
                }
                match result {
                    Ok(page) => {
                        let end = !page.has_more();
                        self.list.receive_issues(page.issues);
                        if end {
                            self.list.list_end_reached();
                        }
                        if let Err(e) = self.storage.store_cached_issues(&self.list.issues) {
                            warn!(%e, "failed to cache issue page");
                        }
                    }
                    Err(error) => {
                        self.list
                            .set_loading_error(AppError::Api(error).user_message());
                    }
                }
            }

            ApiMessage::MoreIssuesFetched { session, result } => {
                if !self.list_session.accepts(session) {
                    return;
                }
                self.list.stop_loading_more();
                match result {
                    Ok(page) => {
                        let end = !page.has_more();
                        let mut issues = std::mem::take(&mut self.list.issues);
                        issues.extend(page.issues);
                        self.list.receive_issues(issues);
                        if end {
                            self.list.list_end_reached();
                        }
                    }
                    Err(error) => {
                        self.list
                            .set_loading_error(AppError::Api(error).user_message());
                    }
                }
            }

            ApiMessage::SuggestionsFetched { session, result } => {
                if !self.list_session.accepts(session) {
                    return;
                }
                match result {
                    Ok(suggestions) => self.list.set_query_assist_suggestions(suggestions),
                    // The rows already shown stay as they were.
                    Err(error) => {
                        debug!(%error, "suggestion fetch failed");
                        self.notify_error("Failed to load suggestions");
                    }
                }
            }

            ApiMessage::IssueLoaded {
                session,
                issue_id,
                result,
            } => {
                if !self.detail_session.accepts(session) {
                    debug!(%issue_id, "dropping stale issue load");
                    return;
                }
                self.detail.is_refreshing = false;
                match result {
                    Ok(issue) => self.detail.set_issue(*issue),
                    Err(error) => {
                        debug!(%issue_id, %error, "issue load failed");
                        self.notify_error("Failed to load issue");
                    }
                }
            }

            ApiMessage::FieldUpdateSettled { session, outcome } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                self.settle_mutation(outcome, "Failed to update issue field");
            }

            ApiMessage::ProjectUpdateSettled { session, outcome } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                self.settle_mutation(outcome, "Failed to update issue project");
            }

            ApiMessage::SaveSettled { session, outcome } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                // The editor closes on every outcome.
                self.detail.finish_save();
                self.settle_mutation(outcome, "Failed to update issue");
            }

            ApiMessage::CommentPosted { session, outcome } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                match outcome {
                    CommentOutcome::Created { comment, reload } => {
                        self.detail.comment_created(comment);
                        self.comment_input.clear();
                        if let Ok(issue) = reload {
                            self.detail.set_issue(*issue);
                        }
                    }
                    // The draft and compose mode stay untouched.
                    CommentOutcome::Failed(error) => {
                        debug!(%error, "comment post failed");
                        self.notify_error("Cannot post comment");
                    }
                }
            }

            ApiMessage::MentionsFetched { session, result } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                match result {
                    Ok(users) => self.detail.comment_suggestions = users,
                    Err(error) => {
                        debug!(%error, "mention fetch failed");
                        self.notify_error("Cannot load suggestions");
                    }
                }
            }

            ApiMessage::FilePicked { session, result } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                match result {
                    Ok(file) => self.begin_attach(file),
                    Err(error) => {
                        debug!(%error, "file pick failed");
                        self.notify_error("ImagePicker error");
                    }
                }
            }

            ApiMessage::AttachSettled { session, outcome } => {
                if !self.detail_session.accepts(session) {
                    return;
                }
                match outcome {
                    AttachOutcome::Uploaded(attachment) => {
                        self.detail.attach_succeeded(attachment);
                    }
                    AttachOutcome::Failed(error) => {
                        debug!(%error, "attach failed");
                        self.notify_error("Cannot attach file");
                        self.detail.attach_failed();
                    }
                }
                self.detail.attach_settled();
            }
        }
    }

    /// Fold a mutation outcome into the model: resync from the reload on
    /// every outcome, propagate to the list only on success.
    fn settle_mutation(&mut self, outcome: MutationOutcome, failure_note: &str) {
        match outcome {
            MutationOutcome::Applied { reload } => match reload {
                Ok(issue) => {
                    self.list.update_issue_on_list(&issue.summary_shape());
                    self.detail.set_issue(*issue);
                }
                Err(error) => {
                    debug!(%error, "post-mutation reload failed");
                    self.notify_error("Failed to load issue");
                }
            },
            MutationOutcome::Failed { error, reload } => {
                debug!(%error, "mutation failed, resyncing");
                self.notify_error(failure_note);
                if let Ok(issue) = reload {
                    self.detail.set_issue(*issue);
                }
            }
        }
    }

    fn begin_attach(&mut self, file: PickedFile) {
        // Guard before the optimistic prepend: without a spawn there is no
        // settle message to ever remove the placeholder.
        let (Some(api), Some(issue_id)) = (&self.api, &self.detail_issue_id) else {
            return;
        };
        let placeholder = crate::api::types::Attachment::placeholder(&file.name);
        self.detail.begin_attach(placeholder);
        usage::track(usage::CATEGORY_ISSUE, "Attached image");
        self.spawner
            .spawn_attach_file(api, &self.detail_session.guard(), issue_id.clone(), file);
    }

    // ----------------------------------------------------------------- view

    /// Render one frame from the model.
    pub fn view(&mut self, frame: &mut Frame) {
        let area = frame.area();
        match self.state {
            AppState::Connecting => {
                let lines = vec![
                    Line::raw(""),
                    Line::from(vec![
                        Span::styled(self.spinner.symbol(), self.theme.title_style()),
                        Span::styled(
                            format!(" connecting to {}", self.profile.name),
                            self.theme.dim_style(),
                        ),
                    ]),
                ];
                frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
            }
            AppState::Help => self.help_view.render(frame, area, &self.theme),
            AppState::IssueList => {
                let ctx = ListViewContext {
                    list: &self.list,
                    theme: &self.theme,
                    spinner: &self.spinner,
                    profile_name: &self.profile.name,
                    searching: self.searching,
                    search_input: &self.search_input,
                    suggestion_selected: self.suggestion_selected,
                };
                self.list_view.render(frame, area, &ctx);
            }
            AppState::IssueDetail => {
                let ctx = DetailViewContext {
                    detail: &self.detail,
                    placeholder: self.detail_placeholder.as_ref(),
                    theme: &self.theme,
                    spinner: &self.spinner,
                };
                self.detail_view.render(frame, area, &ctx);

                if self.detail.edit_mode {
                    render_edit_overlay(
                        frame,
                        area,
                        &self.theme,
                        &self.spinner,
                        &self.summary_input,
                        &self.description_input,
                        self.edit_focus_description,
                        self.detail.is_saving_edited_issue,
                    );
                } else if self.detail.add_comment_mode {
                    render_compose_overlay(
                        frame,
                        area,
                        &self.theme,
                        &self.comment_input,
                        &self.detail.comment_suggestions,
                    );
                } else if let Some(input) = &self.attach_input {
                    render_prompt_overlay(frame, area, &self.theme, " Attach file path ", input);
                } else if let Some(editor) = &self.field_editor {
                    let title = format!(" {} ", editor.name);
                    render_prompt_overlay(frame, area, &self.theme, &title, &editor.input);
                } else if let Some(input) = &self.project_input {
                    render_prompt_overlay(frame, area, &self.theme, " Move to project ", input);
                }

                self.action_menu.render(frame, area, &self.theme);
            }
        }

        self.notifications.render(frame, area);
    }
}
