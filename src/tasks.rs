//! Async task management for non-blocking API operations.
//!
//! This module provides a way to execute async operations in background tasks
//! while keeping the UI responsive. It uses tokio channels to communicate
//! results back to the main event loop.
//!
//! # Architecture
//!
//! The task system follows a simple pattern:
//! 1. The main loop applies any optimistic state change synchronously
//! 2. Instead of awaiting inline, it spawns a background task via `TaskSpawner`,
//!    passing the current view's [`SessionGuard`]
//! 3. The main loop continues rendering and handling events
//! 4. When the task completes, it stamps an `ApiMessage` with its session ID
//!    and sends it through the channel (cancelled sessions send nothing)
//! 5. The main loop polls the channel with `try_recv()` and applies results
//!    whose session the current view still accepts
//!
//! Mutations never roll back on failure. Every mutation task refetches the
//! issue after the remote call settles, success or not, so the view converges
//! on whatever the server holds.
//!
//! # Adding New Task Types
//!
//! To add a new async operation:
//! 1. Add a variant to `ApiMessage` for the result
//! 2. Add a spawn method to `TaskSpawner`
//! 3. Handle the message in the main event loop

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::error::{ApiError, Result as ApiResult};
use crate::api::permissions::PermissionCache;
use crate::api::types::{Attachment, Comment, IssueDetail, IssuePage, QuerySuggestion, User};
use crate::api::{TrackerApi, TrackerClient};
use crate::config::Profile;
use crate::state::{issue_id_is_readable, SessionGuard};

/// The API handle shared between the app and its background tasks.
pub type SharedApi = Arc<dyn TrackerApi>;

/// Everything established during the backend handshake.
#[derive(Debug)]
pub struct Connection {
    pub client: TrackerClient,
    /// The authenticated user; saved-search ownership is matched against it.
    pub user: User,
    /// The user's permission grants, loaded once at startup.
    pub permissions: PermissionCache,
}

/// A file read from disk, ready to upload.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// How a mutation settled.
///
/// Both arms carry the result of the post-mutation refetch: the view is
/// resynced from the server after a failure instead of rolled back.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The remote call succeeded.
    Applied {
        reload: ApiResult<Box<IssueDetail>>,
    },
    /// The remote call failed; the refetch ran anyway.
    Failed {
        error: ApiError,
        reload: ApiResult<Box<IssueDetail>>,
    },
}

/// How posting a comment settled.
///
/// Comments are not optimistic: nothing is appended until the server
/// confirms, and a failure leaves the draft untouched.
#[derive(Debug)]
pub enum CommentOutcome {
    Created {
        comment: Comment,
        reload: ApiResult<Box<IssueDetail>>,
    },
    Failed(ApiError),
}

/// How an attachment upload settled.
#[derive(Debug)]
pub enum AttachOutcome {
    Uploaded(Attachment),
    Failed(ApiError),
}

/// Messages sent from background tasks to the main event loop.
///
/// Each variant represents the result of an async operation, stamped with
/// the ID of the view session that started it. The main loop drops messages
/// whose session is no longer current.
#[derive(Debug)]
pub enum ApiMessage {
    /// Initial connection handshake result
    ClientConnected(ApiResult<Box<Connection>>),

    /// Issue search results (first page or refresh)
    IssuesFetched {
        session: u64,
        query: String,
        result: ApiResult<IssuePage>,
        is_background_refresh: bool,
    },

    /// Pagination results for the next page
    MoreIssuesFetched {
        session: u64,
        result: ApiResult<IssuePage>,
    },

    /// Query-assist or saved-search suggestions
    SuggestionsFetched {
        session: u64,
        result: ApiResult<Vec<QuerySuggestion>>,
    },

    /// Full issue load result
    IssueLoaded {
        session: u64,
        issue_id: String,
        result: ApiResult<Box<IssueDetail>>,
    },

    /// Custom field update settled
    FieldUpdateSettled {
        session: u64,
        outcome: MutationOutcome,
    },

    /// Project move settled
    ProjectUpdateSettled {
        session: u64,
        outcome: MutationOutcome,
    },

    /// Summary/description save settled
    SaveSettled {
        session: u64,
        outcome: MutationOutcome,
    },

    /// Comment creation settled
    CommentPosted {
        session: u64,
        outcome: CommentOutcome,
    },

    /// Mention suggestions for the comment composer
    MentionsFetched {
        session: u64,
        result: ApiResult<Vec<User>>,
    },

    /// A file was read from disk for attaching
    FilePicked {
        session: u64,
        result: std::io::Result<PickedFile>,
    },

    /// Attachment upload settled
    AttachSettled {
        session: u64,
        outcome: AttachOutcome,
    },
}

/// Fetch an issue, routing by the shape of its ID.
///
/// Readable IDs have no direct endpoint and go through the search-based
/// lookup. The field hash is rebuilt on every load.
async fn load_issue_flow<A>(api: &A, issue_id: &str) -> ApiResult<IssueDetail>
where
    A: TrackerApi + ?Sized,
{
    let mut issue = if issue_id_is_readable(issue_id) {
        api.hackish_get_issue_by_readable_id(issue_id).await?
    } else {
        api.get_issue(issue_id).await?
    };
    issue.rebuild_field_hash();
    Ok(issue)
}

/// Refetch after a mutation and fold both results into an outcome.
async fn settle_mutation<A>(api: &A, issue_id: &str, update: ApiResult<()>) -> MutationOutcome
where
    A: TrackerApi + ?Sized,
{
    let reload = load_issue_flow(api, issue_id).await.map(Box::new);
    match update {
        Ok(()) => MutationOutcome::Applied { reload },
        Err(error) => MutationOutcome::Failed { error, reload },
    }
}

async fn update_field_flow<A>(
    api: &A,
    issue_id: &str,
    field_id: &str,
    has_state_machine: bool,
    value: serde_json::Value,
) -> MutationOutcome
where
    A: TrackerApi + ?Sized,
{
    // State-machine fields only accept events; plain fields take values.
    let update = if has_state_machine {
        api.apply_field_event(issue_id, field_id, &value).await
    } else {
        api.update_field_value(issue_id, field_id, &value).await
    };
    settle_mutation(api, issue_id, update).await
}

async fn update_project_flow<A>(api: &A, issue_id: &str, project_id: &str) -> MutationOutcome
where
    A: TrackerApi + ?Sized,
{
    let update = api.update_project(issue_id, project_id).await;
    settle_mutation(api, issue_id, update).await
}

async fn save_changes_flow<A>(
    api: &A,
    issue_id: &str,
    summary: &str,
    description: &str,
) -> MutationOutcome
where
    A: TrackerApi + ?Sized,
{
    let update = api
        .update_summary_description(issue_id, summary, description)
        .await;
    settle_mutation(api, issue_id, update).await
}

async fn add_comment_flow<A>(api: &A, issue_id: &str, text: &str) -> CommentOutcome
where
    A: TrackerApi + ?Sized,
{
    match api.add_comment(issue_id, text).await {
        Ok(comment) => CommentOutcome::Created {
            comment,
            reload: load_issue_flow(api, issue_id).await.map(Box::new),
        },
        Err(error) => CommentOutcome::Failed(error),
    }
}

/// Compute suggestions for the search input.
///
/// A non-empty query goes to the server's query assist and its rows are
/// passed through untouched. An empty query is answered from the user's
/// own saved searches followed by the stored recent searches.
async fn suggest_flow<A>(
    api: &A,
    recent_searches: Vec<String>,
    owner_id: &str,
    query: &str,
    caret: usize,
) -> ApiResult<Vec<QuerySuggestion>>
where
    A: TrackerApi + ?Sized,
{
    if !query.is_empty() {
        let response = api.get_query_assist_suggestions(query, caret).await?;
        return Ok(response.suggestions);
    }
    let mut suggestions: Vec<QuerySuggestion> = api
        .get_saved_queries()
        .await?
        .into_iter()
        .filter(|saved| {
            saved
                .owner
                .as_ref()
                .map(|owner| owner.ownership_id() == owner_id)
                .unwrap_or(false)
        })
        .collect();
    suggestions.extend(recent_searches.into_iter().map(QuerySuggestion::recent));
    Ok(suggestions)
}

async fn connect_flow(profile: &Profile) -> ApiResult<Connection> {
    let client = TrackerClient::new(profile).await?;
    let user = client.get_current_user().await?;
    let grants = client.get_permission_grants().await?;
    Ok(Connection {
        client,
        user,
        permissions: PermissionCache::new(grants),
    })
}

/// Spawns background tasks for async operations.
///
/// This struct holds a channel sender and provides methods to spawn
/// various types of async operations. Each method clones the necessary
/// data and spawns a tokio task that sends its result through the channel.
#[derive(Clone)]
pub struct TaskSpawner {
    tx: mpsc::UnboundedSender<ApiMessage>,
}

impl TaskSpawner {
    /// Create a new TaskSpawner with the given channel sender.
    pub fn new(tx: mpsc::UnboundedSender<ApiMessage>) -> Self {
        Self { tx }
    }

    /// Spawn the backend handshake: client, current user, permissions.
    pub fn spawn_connect(&self, profile: Profile) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = connect_flow(&profile).await.map(Box::new);
            let _ = tx.send(ApiMessage::ClientConnected(result));
        });
    }

    /// Spawn a task to fetch the first page of issues for a query.
    pub fn spawn_fetch_issues(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        query: String,
        top: usize,
        is_background_refresh: bool,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = api.get_issues(&query, top, 0).await.map(|issues| IssuePage {
                issues,
                top,
                skip: 0,
            });
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::IssuesFetched {
                session: guard.id(),
                query,
                result,
                is_background_refresh,
            });
        });
    }

    /// Spawn a task to load the next page of issues (pagination).
    pub fn spawn_load_more(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        query: String,
        top: usize,
        skip: usize,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = api
                .get_issues(&query, top, skip)
                .await
                .map(|issues| IssuePage { issues, top, skip });
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::MoreIssuesFetched {
                session: guard.id(),
                result,
            });
        });
    }

    /// Spawn a task to compute search suggestions for the query and caret.
    pub fn spawn_fetch_suggestions(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        recent_searches: Vec<String>,
        owner_id: String,
        query: String,
        caret: usize,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let result =
                suggest_flow(api.as_ref(), recent_searches, &owner_id, &query, caret).await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::SuggestionsFetched {
                session: guard.id(),
                result,
            });
        });
    }

    /// Spawn a task to load a full issue by entity or readable ID.
    pub fn spawn_load_issue(&self, api: &SharedApi, guard: &SessionGuard, issue_id: String) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = load_issue_flow(api.as_ref(), &issue_id).await.map(Box::new);
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::IssueLoaded {
                session: guard.id(),
                issue_id,
                result,
            });
        });
    }

    /// Spawn a task to update a custom field and refetch.
    pub fn spawn_update_field(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        field_id: String,
        has_state_machine: bool,
        value: serde_json::Value,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let outcome =
                update_field_flow(api.as_ref(), &issue_id, &field_id, has_state_machine, value)
                    .await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::FieldUpdateSettled {
                session: guard.id(),
                outcome,
            });
        });
    }

    /// Spawn a task to move the issue to another project and refetch.
    pub fn spawn_update_project(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        project_id: String,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let outcome = update_project_flow(api.as_ref(), &issue_id, &project_id).await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::ProjectUpdateSettled {
                session: guard.id(),
                outcome,
            });
        });
    }

    /// Spawn a task to save edited summary and description and refetch.
    pub fn spawn_save_changes(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        summary: String,
        description: String,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let outcome = save_changes_flow(api.as_ref(), &issue_id, &summary, &description).await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::SaveSettled {
                session: guard.id(),
                outcome,
            });
        });
    }

    /// Spawn a task to post a comment and refetch on success.
    pub fn spawn_add_comment(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        text: String,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let outcome = add_comment_flow(api.as_ref(), &issue_id, &text).await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::CommentPosted {
                session: guard.id(),
                outcome,
            });
        });
    }

    /// Spawn a task to fetch mention suggestions for the comment composer.
    pub fn spawn_fetch_mentions(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        query: String,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = api.get_mention_suggests(&[issue_id], &query).await;
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::MentionsFetched {
                session: guard.id(),
                result,
            });
        });
    }

    /// Spawn a task to read a file off the event loop for attaching.
    pub fn spawn_pick_file(&self, guard: &SessionGuard, path: PathBuf) {
        let tx = self.tx.clone();
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = tokio::fs::read(&path).await.map(|bytes| PickedFile {
                name: path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("attachment")
                    .to_string(),
                bytes,
            });
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::FilePicked {
                session: guard.id(),
                result,
            });
        });
    }

    /// Spawn a task to upload a picked file as an attachment.
    pub fn spawn_attach_file(
        &self,
        api: &SharedApi,
        guard: &SessionGuard,
        issue_id: String,
        file: PickedFile,
    ) {
        let tx = self.tx.clone();
        let api = Arc::clone(api);
        let guard = guard.clone();
        tokio::spawn(async move {
            let outcome = match api.attach_file(&issue_id, &file.name, file.bytes).await {
                Ok(attachment) => AttachOutcome::Uploaded(attachment),
                Err(error) => AttachOutcome::Failed(error),
            };
            if guard.is_cancelled() {
                return;
            }
            let _ = tx.send(ApiMessage::AttachSettled {
                session: guard.id(),
                outcome,
            });
        });
    }
}

/// Create a new task channel and spawner.
///
/// Returns a tuple of (receiver, spawner). The receiver should be polled
/// in the main event loop, and the spawner should be used to spawn tasks.
pub fn create_task_channel() -> (mpsc::UnboundedReceiver<ApiMessage>, TaskSpawner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (rx, TaskSpawner::new(tx))
}
