//! YouTrack API request and response types.
//!
//! These types model the YouTrack REST API responses for issues, comments,
//! attachments, saved searches and query-assist suggestions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A YouTrack user.
///
/// Returned by `GET /api/users/me`, and embedded in comments, saved
/// searches and custom field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's entity ID.
    pub id: String,
    /// The user's Hub ring ID. Saved-search ownership is keyed on this.
    #[serde(default)]
    pub ring_id: Option<String>,
    /// The login name.
    #[serde(default)]
    pub login: Option<String>,
    /// The display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// URL of the user's avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    /// The ID that saved-search owners are matched against: the Hub ring
    /// ID when present, the entity ID otherwise.
    pub fn ownership_id(&self) -> &str {
        self.ring_id.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .full_name
            .as_deref()
            .or(self.login.as_deref())
            .unwrap_or(&self.id);
        write!(f, "{}", name)
    }
}

/// A project reference as embedded in issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    /// The project entity ID.
    pub id: String,
    /// The project key (e.g., "DEMO").
    #[serde(default)]
    pub short_name: Option<String>,
    /// The project display name.
    #[serde(default)]
    pub name: Option<String>,
    /// The project's Hub ring ID, used for permission checks.
    #[serde(default)]
    pub ring_id: Option<String>,
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(&self.id);
        write!(f, "{}", name)
    }
}

/// A custom field on an issue.
///
/// Values are heterogeneous (enum bundles, users, periods, plain strings),
/// so they stay as raw JSON and are rendered through [`IssueField::value_text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueField {
    /// The field instance ID.
    pub id: String,
    /// The field name (e.g., "Priority", "Assignee").
    #[serde(default)]
    pub name: Option<String>,
    /// The field value: object, array of objects, scalar or null.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Whether the field is driven by a state machine. Updates to such
    /// fields go through events instead of plain value sets.
    #[serde(default)]
    pub has_state_machine: bool,
}

impl IssueField {
    /// Render the field value for display.
    pub fn value_text(&self) -> String {
        Self::render_value(&self.value)
    }

    fn render_value(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "?".to_string(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Object(obj) => obj
                .get("localizedName")
                .or_else(|| obj.get("name"))
                .or_else(|| obj.get("presentation"))
                .or_else(|| obj.get("login"))
                .and_then(|v| v.as_str())
                .unwrap_or("?")
                .to_string(),
            serde_json::Value::Array(items) => {
                if items.is_empty() {
                    "?".to_string()
                } else {
                    items
                        .iter()
                        .map(Self::render_value)
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            }
        }
    }
}

/// An issue as it appears on the list: the summary shape.
///
/// Returned by `GET /api/issues?query=...` as a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    /// The issue entity ID (e.g., "2-42").
    pub id: String,
    /// The human-readable ID (e.g., "DEMO-42").
    #[serde(default)]
    pub id_readable: Option<String>,
    /// The issue summary/title.
    #[serde(default)]
    pub summary: String,
    /// The issue custom fields.
    #[serde(default)]
    pub fields: Vec<IssueField>,
}

impl IssueSummary {
    /// The ID shown to the user: readable when known, entity ID otherwise.
    pub fn display_id(&self) -> &str {
        self.id_readable.as_deref().unwrap_or(&self.id)
    }

    /// The "Priority" custom field, if the issue has one.
    pub fn priority_field(&self) -> Option<&IssueField> {
        self.field_by_name("Priority")
    }

    /// The "Assignee" custom field, if the issue has one.
    pub fn assignee_field(&self) -> Option<&IssueField> {
        self.field_by_name("Assignee")
    }

    fn field_by_name(&self, name: &str) -> Option<&IssueField> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
    }
}

impl fmt::Display for IssueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.display_id(), self.summary)
    }
}

/// One page of an issue search, together with the window it was asked for.
#[derive(Debug, Clone)]
pub struct IssuePage {
    /// The issues in this page.
    pub issues: Vec<IssueSummary>,
    /// How many issues were requested.
    pub top: usize,
    /// The offset this page starts at.
    pub skip: usize,
}

impl IssuePage {
    /// Check if another page may exist. A short page means the end.
    pub fn has_more(&self) -> bool {
        self.issues.len() >= self.top
    }

    /// Get the offset for the next page.
    pub fn next_skip(&self) -> usize {
        self.skip + self.issues.len()
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// The comment ID.
    pub id: String,
    /// The comment text (YouTrack wiki/markdown markup, shown as-is).
    #[serde(default)]
    pub text: String,
    /// The comment author.
    #[serde(default)]
    pub author: Option<User>,
    /// Creation timestamp, epoch milliseconds.
    #[serde(default)]
    pub created: Option<i64>,
}

/// An attachment on an issue.
///
/// A freshly picked file has no server ID yet; [`Attachment::placeholder`]
/// builds the optimistic entry shown while the upload is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The attachment ID, absent for not-yet-uploaded placeholders.
    #[serde(default)]
    pub id: Option<String>,
    /// The file name.
    pub name: String,
    /// Download URL, absent for placeholders.
    #[serde(default)]
    pub url: Option<String>,
}

impl Attachment {
    /// Build the optimistic placeholder for a file being uploaded.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            url: None,
        }
    }
}

/// A typed link between issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    /// The link instance ID.
    pub id: String,
    /// Link direction: "OUTWARD", "INWARD" or "BOTH".
    #[serde(default)]
    pub direction: Option<String>,
    /// The link type (e.g., "Subtask", "Depend").
    #[serde(default)]
    pub link_type: Option<LinkType>,
    /// The issues on the far end of the link.
    #[serde(default)]
    pub issues: Vec<IssueSummary>,
}

/// The type of an issue link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkType {
    /// The link type name.
    #[serde(default)]
    pub name: Option<String>,
    /// Label for the outward direction (e.g., "parent for").
    #[serde(default)]
    pub source_to_target: Option<String>,
    /// Label for the inward direction (e.g., "subtask of").
    #[serde(default)]
    pub target_to_source: Option<String>,
}

/// A fully loaded issue: the detail shape.
///
/// Returned by `GET /api/issues/{id}` with the full field selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetail {
    /// The issue entity ID.
    pub id: String,
    /// The human-readable ID.
    #[serde(default)]
    pub id_readable: Option<String>,
    /// The issue's sequence number within its project.
    #[serde(default)]
    pub number_in_project: Option<i64>,
    /// The issue summary/title.
    #[serde(default)]
    pub summary: String,
    /// The issue description markup.
    #[serde(default)]
    pub description: Option<String>,
    /// The project the issue belongs to.
    #[serde(default)]
    pub project: Option<ProjectRef>,
    /// The issue custom fields.
    #[serde(default)]
    pub fields: Vec<IssueField>,
    /// Comments, oldest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Links to other issues.
    #[serde(default)]
    pub links: Vec<IssueLink>,
    /// Lookup from lowercased field name to field value. Computed after
    /// load, never sent over the wire.
    #[serde(skip)]
    pub field_hash: HashMap<String, serde_json::Value>,
}

impl IssueDetail {
    /// The ID shown to the user: readable when known, entity ID otherwise.
    pub fn display_id(&self) -> &str {
        self.id_readable.as_deref().unwrap_or(&self.id)
    }

    /// Rebuild the lowercased field-name lookup from the current fields.
    pub fn rebuild_field_hash(&mut self) {
        self.field_hash = self
            .fields
            .iter()
            .filter_map(|f| {
                f.name
                    .as_ref()
                    .map(|name| (name.to_lowercase(), f.value.clone()))
            })
            .collect();
    }

    /// Project the detail shape down to the list shape.
    pub fn summary_shape(&self) -> IssueSummary {
        IssueSummary {
            id: self.id.clone(),
            id_readable: self.id_readable.clone(),
            summary: self.summary.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Build the issue's web URL, optionally anchored to a comment.
    ///
    /// Uses `{project key}-{number in project}` when both are known and
    /// falls back to the readable or entity ID.
    pub fn web_url(&self, base_url: &str, comment_id: Option<&str>) -> String {
        let ident = match (
            self.project.as_ref().and_then(|p| p.short_name.as_deref()),
            self.number_in_project,
        ) {
            (Some(short_name), Some(number)) => format!("{}-{}", short_name, number),
            _ => self.display_id().to_string(),
        };
        let mut url = format!("{}/issue/{}", base_url.trim_end_matches('/'), ident);
        if let Some(comment_id) = comment_id {
            url.push_str(&format!("#comment={}", comment_id));
        }
        url
    }
}

impl fmt::Display for IssueDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.display_id(), self.summary)
    }
}

/// One row in the search suggestion dropdown.
///
/// Saved searches, stored recent searches and remote query-assist
/// completions all share this shape; unused halves stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySuggestion {
    /// Entity ID, present only for saved searches.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// The full query text to apply on selection.
    #[serde(default)]
    pub query: Option<String>,
    /// Completion text, present only for query-assist rows.
    #[serde(default)]
    pub option: Option<String>,
    /// Caret position after applying an assist completion.
    #[serde(default)]
    pub caret: Option<usize>,
    /// Start of the span an assist completion replaces, in characters.
    #[serde(default)]
    pub completion_start: Option<usize>,
    /// End of the span an assist completion replaces, in characters.
    #[serde(default)]
    pub completion_end: Option<usize>,
    /// Secondary description line.
    #[serde(default)]
    pub description: Option<String>,
    /// Owner of a saved search.
    #[serde(default)]
    pub owner: Option<User>,
}

impl QuerySuggestion {
    /// Wrap a stored recent search as a suggestion row.
    pub fn recent(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: None,
            name: Some(text.clone()),
            query: Some(text),
            option: None,
            caret: None,
            completion_start: None,
            completion_end: None,
            description: None,
            owner: None,
        }
    }

    /// The text shown for this row.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.option.as_deref())
            .or(self.query.as_deref())
            .unwrap_or("")
    }

    /// Apply this suggestion to the current query text.
    ///
    /// Saved searches and recents carry a full query and replace the text
    /// wholesale; assist completions splice their option into the span the
    /// server marked.
    pub fn apply_to(&self, current: &str) -> String {
        if let Some(query) = &self.query {
            return query.clone();
        }
        let Some(option) = &self.option else {
            return current.to_string();
        };
        let chars: Vec<char> = current.chars().collect();
        let start = self.completion_start.unwrap_or(chars.len()).min(chars.len());
        let end = self.completion_end.unwrap_or(chars.len()).min(chars.len());
        let mut result: String = chars[..start].iter().collect();
        result.push_str(option);
        result.extend(&chars[end.max(start)..]);
        result
    }
}

/// Query-assist response.
///
/// Returned by `POST /api/search/assist`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAssistResponse {
    /// The query the suggestions were computed for.
    #[serde(default)]
    pub query: Option<String>,
    /// The caret position the suggestions were computed for.
    #[serde(default)]
    pub caret: Option<usize>,
    /// The suggestion rows.
    #[serde(default)]
    pub suggestions: Vec<QuerySuggestion>,
}
