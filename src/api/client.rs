//! YouTrack API client implementation.
//!
//! This module provides the main client for interacting with the YouTrack
//! REST API. It handles authentication, request/response processing, error
//! handling, and retry logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::auth::Auth;
use super::error::{ApiError, Result};
use super::permissions::PermissionGrant;
use super::types::{
    Attachment, Comment, IssueDetail, IssueSummary, QueryAssistResponse, QuerySuggestion, User,
};
use crate::config::Profile;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Field selector for issues on the list.
const ISSUE_LIST_FIELDS: &str = "id,idReadable,summary,\
    fields(id,name,hasStateMachine,value(id,name,localizedName,login,fullName,avatarUrl,presentation,color(background)))";

/// Field selector for a fully loaded issue.
const ISSUE_DETAIL_FIELDS: &str = "id,idReadable,numberInProject,summary,description,\
    project(id,shortName,name,ringId),\
    fields(id,name,hasStateMachine,value(id,name,localizedName,login,fullName,avatarUrl,presentation,color(background))),\
    comments(id,text,created,author(id,ringId,login,fullName,avatarUrl)),\
    attachments(id,name,url),\
    links(id,direction,linkType(name,sourceToTarget,targetToSource),issues(id,idReadable,summary))";

/// Field selector for comments.
const COMMENT_FIELDS: &str = "id,text,created,author(id,ringId,login,fullName,avatarUrl)";

/// Field selector for users.
const USER_FIELDS: &str = "id,ringId,login,fullName,avatarUrl";

/// The remote operations the app performs against a tracker.
///
/// Implemented by [`TrackerClient`]; test code substitutes mocks so the
/// async flows can be exercised without a server.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Fetch a fully loaded issue by entity ID.
    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetail>;

    /// Fetch a fully loaded issue by human-readable ID.
    ///
    /// There is no direct lookup for readable IDs, so this searches for
    /// `issue id: {id}` and takes the first hit.
    async fn hackish_get_issue_by_readable_id(&self, readable_id: &str) -> Result<IssueDetail>;

    /// Search issues; returns one page of list-shaped issues.
    async fn get_issues(&self, query: &str, top: usize, skip: usize) -> Result<Vec<IssueSummary>>;

    /// Create a comment on an issue.
    async fn add_comment(&self, issue_id: &str, text: &str) -> Result<Comment>;

    /// Upload a file as an issue attachment.
    async fn attach_file(&self, issue_id: &str, file_name: &str, bytes: Vec<u8>)
        -> Result<Attachment>;

    /// Set a custom field to a plain value.
    async fn update_field_value(
        &self,
        issue_id: &str,
        field_id: &str,
        value: &serde_json::Value,
    ) -> Result<()>;

    /// Apply a state-machine event to a custom field.
    async fn apply_field_event(
        &self,
        issue_id: &str,
        field_id: &str,
        event: &serde_json::Value,
    ) -> Result<()>;

    /// Move an issue to another project.
    async fn update_project(&self, issue_id: &str, project_id: &str) -> Result<()>;

    /// Update an issue's summary and description.
    async fn update_summary_description(
        &self,
        issue_id: &str,
        summary: &str,
        description: &str,
    ) -> Result<()>;

    /// Fetch mention suggestions for comment composition.
    async fn get_mention_suggests(&self, issue_ids: &[String], query: &str) -> Result<Vec<User>>;

    /// Fetch query-assist suggestions for a search query and caret.
    async fn get_query_assist_suggestions(
        &self,
        query: &str,
        caret: usize,
    ) -> Result<QueryAssistResponse>;

    /// Fetch the saved searches visible to the current user.
    async fn get_saved_queries(&self) -> Result<Vec<QuerySuggestion>>;

    /// Fetch the current authenticated user.
    async fn get_current_user(&self) -> Result<User>;
}

/// The YouTrack API client.
///
/// Provides async methods for interacting with the YouTrack REST API.
/// Handles authentication, error handling, and retry logic for transient
/// failures.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    /// The HTTP client.
    client: Client,
    /// The base URL for the YouTrack instance.
    base_url: String,
    /// Authentication credentials.
    auth: Auth,
}

impl TrackerClient {
    /// Create a new YouTrack client from a profile.
    ///
    /// Retrieves the permanent token from the OS keyring and validates the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token cannot be retrieved from the keyring
    /// - The HTTP client cannot be built
    /// - Connection validation fails
    #[instrument(skip(profile), fields(profile_name = %profile.name))]
    pub async fn new(profile: &Profile) -> Result<Self> {
        info!("Creating YouTrack client for profile");

        let auth = Auth::from_keyring(&profile.name)?;

        let client = Self::build_http_client()?;

        let base_url = normalize_base_url(&profile.url);

        let tracker = Self {
            client,
            base_url,
            auth,
        };

        // Validate connection
        tracker.validate_connection().await?;

        info!("YouTrack client created and connection validated");
        Ok(tracker)
    }

    /// Create a new YouTrack client with an explicit token.
    ///
    /// Use this for testing or when credentials are provided directly.
    /// Does NOT validate the connection automatically.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The YouTrack instance URL
    /// * `token` - The permanent token
    pub fn with_token(base_url: &str, token: &str) -> Result<Self> {
        let auth = Auth::new(token);
        let client = Self::build_http_client()?;
        let base_url = normalize_base_url(base_url);

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::Network)
    }

    /// Validate the connection by calling the /users/me endpoint.
    ///
    /// This verifies that:
    /// - The URL is reachable
    /// - The token is valid
    /// - The user has access to the YouTrack instance
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<User> {
        debug!("Validating YouTrack connection");

        let user = self.get_current_user().await.map_err(|e| {
            error!("Connection validation failed: {}", e);
            match e {
                ApiError::Unauthorized => e,
                ApiError::Network(ref _err) => {
                    ApiError::ConnectionFailed(format!("Cannot connect to {}: {}", self.base_url, e))
                }
                _ => ApiError::ConnectionFailed(e.to_string()),
            }
        })?;

        info!("Connected as user: {}", user);
        Ok(user)
    }

    /// Fetch the permission grants of the current user.
    ///
    /// Calls the Hub permission cache bundled with the YouTrack instance.
    #[instrument(skip(self))]
    pub async fn get_permission_grants(&self) -> Result<Vec<PermissionGrant>> {
        let url = format!(
            "{}/hub/api/rest/permissions/cache?fields=global,permission(key),projects(id,ringId)",
            self.base_url
        );
        let grants: Vec<PermissionGrant> = self.get(&url).await?;
        debug!("Loaded {} permission grants", grants.len());
        Ok(grants)
    }

    /// Perform a GET request with authentication and error handling.
    ///
    /// Includes retry logic for transient failures (rate limiting, server
    /// errors). Only GETs retry; mutations are not idempotent.
    #[instrument(skip(self), fields(url = %url))]
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempts = 0;
        let mut last_error: Option<ApiError> = None;

        while attempts < MAX_RETRIES {
            attempts += 1;
            debug!("Request attempt {}/{}", attempts, MAX_RETRIES);

            match self.execute_get::<T>(url).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if Self::is_retryable(&e) && attempts < MAX_RETRIES {
                        let delay = Self::calculate_retry_delay(attempts);
                        warn!(
                            "Request failed (attempt {}), retrying in {}ms: {}",
                            attempts, delay, e
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ApiError::ServerError("Max retries exceeded".to_string())))
    }

    /// Execute a single GET request.
    async fn execute_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Perform a POST request with a JSON body, parsing the JSON response.
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Perform a POST request with a JSON body, discarding the response body.
    async fn post_json_unit(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let url = response.url().to_string();
        let error_body = response.text().await.unwrap_or_default();
        debug!("Error response body: {}", error_body);
        Err(Self::error_from_response(status, &url, &error_body))
    }

    /// Handle the HTTP response, checking for errors and parsing JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            // Try to get error details from response body
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(Self::error_from_response(status, &url, &error_body))
        }
    }

    /// Create an appropriate error from an HTTP response.
    fn error_from_response(status: StatusCode, url: &str, body: &str) -> ApiError {
        // Try to extract the YouTrack error message from the response
        let context = if body.is_empty() {
            url.to_string()
        } else {
            // YouTrack returns {"error": ..., "error_description": ...}
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                let description = json
                    .get("error_description")
                    .or_else(|| json.get("error"))
                    .and_then(|v| v.as_str());
                if let Some(description) = description {
                    return ApiError::from_status(status, description);
                }
            }
            url.to_string()
        };

        ApiError::from_status(status, &context)
    }

    /// Check if an error is retryable.
    fn is_retryable(error: &ApiError) -> bool {
        matches!(
            error,
            ApiError::RateLimited | ApiError::ServerError(_) | ApiError::Network(_)
        )
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(attempt: u32) -> u64 {
        RETRY_DELAY_MS * 2u64.pow(attempt - 1)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Response shape of the mention endpoint.
#[derive(Debug, Deserialize)]
struct MentionResponse {
    #[serde(default)]
    users: Vec<User>,
}

#[async_trait]
impl TrackerApi for TrackerClient {
    #[instrument(skip(self), fields(issue_id = %issue_id))]
    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetail> {
        debug!("Fetching issue");

        let url = format!(
            "{}/api/issues/{}?fields={}",
            self.base_url, issue_id, ISSUE_DETAIL_FIELDS
        );
        let issue: IssueDetail = self.get(&url).await.map_err(|e| {
            if matches!(e, ApiError::NotFound(_)) {
                ApiError::NotFound(format!("Issue '{}' not found", issue_id))
            } else {
                e
            }
        })?;

        debug!("Fetched issue: {}", issue.display_id());
        Ok(issue)
    }

    #[instrument(skip(self), fields(readable_id = %readable_id))]
    async fn hackish_get_issue_by_readable_id(&self, readable_id: &str) -> Result<IssueDetail> {
        debug!("Fetching issue by readable ID via search");

        let query = format!("issue id: {}", readable_id);
        let url = format!(
            "{}/api/issues?query={}&$top=1&fields={}",
            self.base_url,
            urlencoding::encode(&query),
            ISSUE_DETAIL_FIELDS
        );

        let mut issues: Vec<IssueDetail> = self.get(&url).await?;
        if issues.is_empty() {
            return Err(ApiError::NotFound(format!(
                "Issue '{}' not found",
                readable_id
            )));
        }
        Ok(issues.remove(0))
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn get_issues(&self, query: &str, top: usize, skip: usize) -> Result<Vec<IssueSummary>> {
        debug!("Searching issues: top={}, skip={}", top, skip);

        let url = format!(
            "{}/api/issues?query={}&$top={}&$skip={}&fields={}",
            self.base_url,
            urlencoding::encode(query),
            top.min(100), // keep pages bounded
            skip,
            ISSUE_LIST_FIELDS
        );

        let issues: Vec<IssueSummary> = self.get(&url).await?;
        debug!("Found {} issues", issues.len());
        Ok(issues)
    }

    #[instrument(skip(self, text), fields(issue_id = %issue_id))]
    async fn add_comment(&self, issue_id: &str, text: &str) -> Result<Comment> {
        let url = format!(
            "{}/api/issues/{}/comments?fields={}",
            self.base_url, issue_id, COMMENT_FIELDS
        );
        let comment: Comment = self.post_json(&url, &json!({ "text": text })).await?;
        debug!("Created comment {}", comment.id);
        Ok(comment)
    }

    #[instrument(skip(self, bytes), fields(issue_id = %issue_id, file_name = %file_name))]
    async fn attach_file(
        &self,
        issue_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment> {
        let url = format!(
            "{}/api/issues/{}/attachments?muteUpdateNotifications=true&fields=id,name,url",
            self.base_url, issue_id
        );

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        // The attachments endpoint answers with the created entries.
        let mut created: Vec<Attachment> = self.handle_response(response).await?;
        created.pop().ok_or_else(|| {
            ApiError::InvalidResponse("attachment upload returned no entries".to_string())
        })
    }

    #[instrument(skip(self, value), fields(issue_id = %issue_id, field_id = %field_id))]
    async fn update_field_value(
        &self,
        issue_id: &str,
        field_id: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let url = format!(
            "{}/api/issues/{}/fields/{}?fields=id",
            self.base_url, issue_id, field_id
        );
        self.post_json_unit(&url, &json!({ "value": value })).await
    }

    #[instrument(skip(self, event), fields(issue_id = %issue_id, field_id = %field_id))]
    async fn apply_field_event(
        &self,
        issue_id: &str,
        field_id: &str,
        event: &serde_json::Value,
    ) -> Result<()> {
        let url = format!(
            "{}/api/issues/{}/fields/{}/event?fields=id",
            self.base_url, issue_id, field_id
        );
        self.post_json_unit(&url, &json!({ "event": event })).await
    }

    #[instrument(skip(self), fields(issue_id = %issue_id, project_id = %project_id))]
    async fn update_project(&self, issue_id: &str, project_id: &str) -> Result<()> {
        let url = format!("{}/api/issues/{}?fields=id", self.base_url, issue_id);
        self.post_json_unit(&url, &json!({ "project": { "id": project_id } }))
            .await
    }

    #[instrument(skip(self, summary, description), fields(issue_id = %issue_id))]
    async fn update_summary_description(
        &self,
        issue_id: &str,
        summary: &str,
        description: &str,
    ) -> Result<()> {
        let url = format!("{}/api/issues/{}?fields=id", self.base_url, issue_id);
        self.post_json_unit(
            &url,
            &json!({ "summary": summary, "description": description }),
        )
        .await
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn get_mention_suggests(&self, issue_ids: &[String], query: &str) -> Result<Vec<User>> {
        let url = format!(
            "{}/api/mention?$top=10&fields=users({})",
            self.base_url, USER_FIELDS
        );
        let issues: Vec<serde_json::Value> =
            issue_ids.iter().map(|id| json!({ "id": id })).collect();
        let response: MentionResponse = self
            .post_json(&url, &json!({ "issues": issues, "query": query }))
            .await?;
        Ok(response.users)
    }

    #[instrument(skip(self), fields(query = %query, caret = caret))]
    async fn get_query_assist_suggestions(
        &self,
        query: &str,
        caret: usize,
    ) -> Result<QueryAssistResponse> {
        let url = format!(
            "{}/api/search/assist?fields=query,caret,suggestions(option,description,caret,completionStart,completionEnd)",
            self.base_url
        );
        self.post_json(&url, &json!({ "query": query, "caret": caret }))
            .await
    }

    #[instrument(skip(self))]
    async fn get_saved_queries(&self) -> Result<Vec<QuerySuggestion>> {
        let url = format!(
            "{}/api/savedQueries?fields=id,name,query,owner({})",
            self.base_url, USER_FIELDS
        );
        self.get(&url).await
    }

    #[instrument(skip(self))]
    async fn get_current_user(&self) -> Result<User> {
        let url = format!("{}/api/users/me?fields={}", self.base_url, USER_FIELDS);
        self.get(&url).await
    }
}

/// Normalize the base URL by removing trailing slashes and ensuring HTTPS.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}
