//! Permission checks for issue operations.
//!
//! YouTrack exposes the current user's permission grants through the Hub
//! permission cache. Each grant is either global or scoped to a set of
//! projects; issue operations are gated on the grants loaded at startup.

use serde::{Deserialize, Serialize};

use super::types::ProjectRef;

/// Permission key for editing issue summary, description and fields.
pub const UPDATE_ISSUE: &str = "JetBrains.YouTrack.UPDATE_ISSUE";

/// Permission key for commenting on issues.
pub const CREATE_COMMENT: &str = "JetBrains.YouTrack.CREATE_COMMENT";

/// Permission key for attaching files to issues.
pub const CREATE_ATTACHMENT: &str = "JetBrains.YouTrack.CREATE_ATTACHMENT_ISSUE";

/// A single permission grant from the Hub permission cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Whether the permission applies to every project.
    #[serde(default)]
    pub global: bool,
    /// The granted permission.
    #[serde(default)]
    pub permission: Option<PermissionRef>,
    /// The projects the grant is scoped to, when not global.
    #[serde(default)]
    pub projects: Vec<ProjectScope>,
}

/// Reference to a permission by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRef {
    /// The permission key (e.g., "JetBrains.YouTrack.UPDATE_ISSUE").
    pub key: String,
}

/// A project scope inside a permission grant.
///
/// The Hub cache identifies projects by their Hub ring ID; the entity ID
/// is matched as a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScope {
    /// The project ID as the Hub knows it.
    pub id: String,
    /// The project's ring ID, when the cache includes it.
    #[serde(default)]
    pub ring_id: Option<String>,
}

/// The current user's permission grants, queried per issue operation.
#[derive(Debug, Clone, Default)]
pub struct PermissionCache {
    grants: Vec<PermissionGrant>,
}

impl PermissionCache {
    /// Build a cache from loaded grants.
    pub fn new(grants: Vec<PermissionGrant>) -> Self {
        Self { grants }
    }

    /// Check whether a permission is granted for a project.
    ///
    /// A global grant always matches. A scoped grant matches when the
    /// project's ring ID (or entity ID) appears in its scope. Without a
    /// project there is nothing to scope against, so only global grants
    /// count.
    pub fn has(&self, permission_key: &str, project: Option<&ProjectRef>) -> bool {
        self.grants
            .iter()
            .filter(|grant| {
                grant
                    .permission
                    .as_ref()
                    .map(|p| p.key.as_str() == permission_key)
                    .unwrap_or(false)
            })
            .any(|grant| {
                grant.global
                    || project
                        .map(|p| grant.projects.iter().any(|scope| scope_matches(scope, p)))
                        .unwrap_or(false)
            })
    }

    /// Whether the user may edit the issue's summary, description and fields.
    pub fn can_update_general_info(&self, project: Option<&ProjectRef>) -> bool {
        self.has(UPDATE_ISSUE, project)
    }

    /// Whether the user may attach files to issues of this project.
    pub fn can_add_attachment_to(&self, project: Option<&ProjectRef>) -> bool {
        self.has(CREATE_ATTACHMENT, project)
    }

    /// Whether the user may comment on issues of this project.
    pub fn can_comment_on(&self, project: Option<&ProjectRef>) -> bool {
        self.has(CREATE_COMMENT, project)
    }
}

fn scope_matches(scope: &ProjectScope, project: &ProjectRef) -> bool {
    if let (Some(scope_ring), Some(project_ring)) = (&scope.ring_id, &project.ring_id) {
        if scope_ring == project_ring {
            return true;
        }
    }
    scope.id == project.id
        || project
            .ring_id
            .as_deref()
            .map(|ring| ring == scope.id)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(key: &str, global: bool, project_ring_ids: &[&str]) -> PermissionGrant {
        PermissionGrant {
            global,
            permission: Some(PermissionRef {
                key: key.to_string(),
            }),
            projects: project_ring_ids
                .iter()
                .map(|ring_id| ProjectScope {
                    id: ring_id.to_string(),
                    ring_id: Some(ring_id.to_string()),
                })
                .collect(),
        }
    }

    fn project(ring_id: &str) -> ProjectRef {
        ProjectRef {
            id: "0-1".to_string(),
            short_name: Some("DEMO".to_string()),
            name: None,
            ring_id: Some(ring_id.to_string()),
        }
    }

    #[test]
    fn test_global_grant_matches_any_project() {
        let cache = PermissionCache::new(vec![grant(UPDATE_ISSUE, true, &[])]);
        assert!(cache.can_update_general_info(Some(&project("ring-1"))));
        assert!(cache.can_update_general_info(None));
    }

    #[test]
    fn test_scoped_grant_matches_own_project_only() {
        let cache = PermissionCache::new(vec![grant(CREATE_COMMENT, false, &["ring-1"])]);
        assert!(cache.can_comment_on(Some(&project("ring-1"))));
        assert!(!cache.can_comment_on(Some(&project("ring-2"))));
        // No project to scope against.
        assert!(!cache.can_comment_on(None));
    }

    #[test]
    fn test_missing_permission_never_matches() {
        let cache = PermissionCache::new(vec![grant(CREATE_COMMENT, true, &[])]);
        assert!(!cache.can_add_attachment_to(Some(&project("ring-1"))));
    }

    #[test]
    fn test_empty_cache_denies_everything() {
        let cache = PermissionCache::default();
        assert!(!cache.can_update_general_info(Some(&project("ring-1"))));
        assert!(!cache.can_comment_on(Some(&project("ring-1"))));
        assert!(!cache.can_add_attachment_to(Some(&project("ring-1"))));
    }

    #[test]
    fn test_scope_matches_entity_id_fallback() {
        let cache = PermissionCache::new(vec![PermissionGrant {
            global: false,
            permission: Some(PermissionRef {
                key: UPDATE_ISSUE.to_string(),
            }),
            projects: vec![ProjectScope {
                id: "0-1".to_string(),
                ring_id: None,
            }],
        }]);

        let project = ProjectRef {
            id: "0-1".to_string(),
            short_name: None,
            name: None,
            ring_id: None,
        };
        assert!(cache.can_update_general_info(Some(&project)));
    }
}
