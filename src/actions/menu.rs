//! The single-issue action menu.
//!
//! The menu is built per issue from the user's permission grants: an action
//! the user cannot perform is simply absent, so selecting an entry never
//! hits a permission wall. Closing the menu without choosing is a silent
//! no-op.

use arboard::Clipboard;

use crate::api::permissions::PermissionCache;
use crate::api::types::{Comment, IssueDetail};
use crate::error::AppError;

/// An entry in the issue action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    /// Open the summary/description editor.
    EditIssue,
    /// Copy the issue's web URL to the clipboard.
    CopyIssueUrl,
    /// Open the issue in the default browser.
    OpenInBrowser,
    /// Pick a file and attach it to the issue.
    AttachImage,
    /// Copy the selected comment's anchored URL to the clipboard.
    CopyCommentUrl,
    /// Compose a comment pre-filled with a mention of the selected
    /// comment's author.
    ReplyToComment,
}

impl IssueAction {
    /// The menu label for this action.
    pub fn title(&self) -> &'static str {
        match self {
            Self::EditIssue => "Edit issue",
            Self::CopyIssueUrl => "Copy issue URL",
            Self::OpenInBrowser => "Open issue in browser",
            Self::AttachImage => "Attach image",
            Self::CopyCommentUrl => "Copy comment URL",
            Self::ReplyToComment => "Reply to comment",
        }
    }
}

/// Build the action menu for an issue.
///
/// Editing and attaching appear only when the permission grants allow them
/// for the issue's project; the URL actions are always available. Comment
/// entries appear only when the comment cursor rests on a comment.
pub fn available_actions(
    issue: &IssueDetail,
    permissions: &PermissionCache,
    selected_comment: Option<&Comment>,
) -> Vec<IssueAction> {
    let mut actions = Vec::new();
    if permissions.can_update_general_info(issue.project.as_ref()) {
        actions.push(IssueAction::EditIssue);
    }
    actions.push(IssueAction::CopyIssueUrl);
    actions.push(IssueAction::OpenInBrowser);
    if permissions.can_add_attachment_to(issue.project.as_ref()) {
        actions.push(IssueAction::AttachImage);
    }
    if selected_comment.is_some() {
        actions.push(IssueAction::CopyCommentUrl);
        if permissions.can_comment_on(issue.project.as_ref()) {
            actions.push(IssueAction::ReplyToComment);
        }
    }
    actions
}

/// Copy the issue's web URL to the system clipboard.
///
/// Returns the copied URL so the caller can show it.
pub fn copy_issue_url(issue: &IssueDetail, base_url: &str) -> Result<String, AppError> {
    let url = issue.web_url(base_url, None);
    let mut clipboard = Clipboard::new()
        .map_err(|e| AppError::other(format!("Clipboard unavailable: {}", e)))?;
    clipboard
        .set_text(url.clone())
        .map_err(|e| AppError::other(format!("Failed to copy to clipboard: {}", e)))?;
    Ok(url)
}

/// Copy a comment's anchored web URL to the system clipboard.
///
/// Returns the copied URL so the caller can show it.
pub fn copy_comment_url(
    issue: &IssueDetail,
    base_url: &str,
    comment: &Comment,
) -> Result<String, AppError> {
    let url = issue.web_url(base_url, Some(&comment.id));
    let mut clipboard = Clipboard::new()
        .map_err(|e| AppError::other(format!("Clipboard unavailable: {}", e)))?;
    clipboard
        .set_text(url.clone())
        .map_err(|e| AppError::other(format!("Failed to copy to clipboard: {}", e)))?;
    Ok(url)
}

/// Open the issue's web URL in the default browser.
///
/// Returns the opened URL so the caller can show it.
pub fn open_in_browser(issue: &IssueDetail, base_url: &str) -> Result<String, AppError> {
    let url = issue.web_url(base_url, None);
    open::that(&url)?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::permissions::{
        PermissionGrant, PermissionRef, CREATE_ATTACHMENT, CREATE_COMMENT, UPDATE_ISSUE,
    };
    use crate::api::types::ProjectRef;
    use std::collections::HashMap;

    fn global_grant(key: &str) -> PermissionGrant {
        PermissionGrant {
            global: true,
            permission: Some(PermissionRef {
                key: key.to_string(),
            }),
            projects: vec![],
        }
    }

    fn create_test_issue() -> IssueDetail {
        IssueDetail {
            id: "2-42".to_string(),
            id_readable: Some("DEMO-42".to_string()),
            number_in_project: Some(42),
            summary: "Test".to_string(),
            description: None,
            project: Some(ProjectRef {
                id: "0-1".to_string(),
                short_name: Some("DEMO".to_string()),
                name: None,
                ring_id: Some("ring-0-1".to_string()),
            }),
            fields: vec![],
            comments: vec![],
            attachments: vec![],
            links: vec![],
            field_hash: HashMap::new(),
        }
    }

    #[test]
    fn test_full_permissions_build_full_menu_in_order() {
        let permissions = PermissionCache::new(vec![
            global_grant(UPDATE_ISSUE),
            global_grant(CREATE_ATTACHMENT),
        ]);

        let actions = available_actions(&create_test_issue(), &permissions, None);

        assert_eq!(
            actions,
            vec![
                IssueAction::EditIssue,
                IssueAction::CopyIssueUrl,
                IssueAction::OpenInBrowser,
                IssueAction::AttachImage,
            ]
        );
    }

    #[test]
    fn test_no_permissions_leave_url_actions_only() {
        let actions = available_actions(&create_test_issue(), &PermissionCache::default(), None);

        assert_eq!(
            actions,
            vec![IssueAction::CopyIssueUrl, IssueAction::OpenInBrowser]
        );
    }

    #[test]
    fn test_update_permission_alone_adds_edit_only() {
        let permissions = PermissionCache::new(vec![global_grant(UPDATE_ISSUE)]);

        let actions = available_actions(&create_test_issue(), &permissions, None);

        assert!(actions.contains(&IssueAction::EditIssue));
        assert!(!actions.contains(&IssueAction::AttachImage));
    }

    fn test_comment() -> Comment {
        Comment {
            id: "4-7".to_string(),
            text: "looks good".to_string(),
            author: None,
            created: None,
        }
    }

    #[test]
    fn test_selected_comment_adds_copy_comment_url() {
        let comment = test_comment();
        let actions = available_actions(
            &create_test_issue(),
            &PermissionCache::default(),
            Some(&comment),
        );

        assert!(actions.contains(&IssueAction::CopyCommentUrl));
        // Replying needs the comment permission.
        assert!(!actions.contains(&IssueAction::ReplyToComment));
    }

    #[test]
    fn test_selected_comment_with_permission_adds_reply() {
        let permissions = PermissionCache::new(vec![global_grant(CREATE_COMMENT)]);
        let comment = test_comment();

        let actions = available_actions(&create_test_issue(), &permissions, Some(&comment));

        assert!(actions.contains(&IssueAction::ReplyToComment));
    }

    #[test]
    fn test_comment_url_is_anchored() {
        let issue = create_test_issue();
        let comment = test_comment();

        let url = issue.web_url("https://demo.youtrack.cloud", Some(&comment.id));

        assert_eq!(url, "https://demo.youtrack.cloud/issue/DEMO-42#comment=4-7");
    }

    #[test]
    fn test_action_titles() {
        assert_eq!(IssueAction::EditIssue.title(), "Edit issue");
        assert_eq!(IssueAction::CopyIssueUrl.title(), "Copy issue URL");
        assert_eq!(IssueAction::OpenInBrowser.title(), "Open issue in browser");
        assert_eq!(IssueAction::AttachImage.title(), "Attach image");
        assert_eq!(IssueAction::CopyCommentUrl.title(), "Copy comment URL");
        assert_eq!(IssueAction::ReplyToComment.title(), "Reply to comment");
    }
}
