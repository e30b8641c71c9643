//! Issue actions and the action menu.
//!
//! This module provides:
//! - Action definitions for the single-issue menu
//! - A capability-gated builder that only lists performable actions
//! - Executors for the clipboard and browser actions

mod menu;

pub use menu::{
    available_actions, copy_comment_url, copy_issue_url, open_in_browser, IssueAction,
};
