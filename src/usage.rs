//! Usage event tracking.
//!
//! Mirrors the classic analytics calls as structured log events under the
//! `usage` target. Events land in the normal log file; nothing leaves the
//! machine, and a missing subscriber just swallows them.

/// Category for single-issue view events.
pub const CATEGORY_ISSUE: &str = "Issue";

/// Category for issue list events.
pub const CATEGORY_ISSUE_LIST: &str = "Issue list";

/// Record a usage event. Fire-and-forget.
pub fn track(category: &str, event: &str) {
    tracing::info!(target: "usage", category, event);
}
