//! Persistent key-value storage.
//!
//! This module stores small pieces of app state on disk as JSON, scoped
//! per profile: the last submitted search query, the recent search list,
//! and the last loaded issue page (shown instantly on startup while the
//! fresh load runs).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, trace};

use crate::api::types::IssueSummary;

/// Storage key for the last submitted search query.
pub const LAST_QUERY_KEY: &str = "last_query";

/// Storage key for the recent search list.
pub const RECENT_SEARCHES_KEY: &str = "recent_searches";

/// Storage key for the cached first page of issues.
pub const ISSUES_CACHE_KEY: &str = "issues_cache";

/// How many recent searches are kept.
pub const MAX_RECENT_SEARCHES: usize = 10;

/// Disk-backed key-value store, one JSON file per key.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Base directory for storage.
    base_dir: PathBuf,
    /// Current profile name.
    profile: String,
}

impl Storage {
    /// Create a storage handle for the given profile.
    pub fn new(profile: &str) -> io::Result<Self> {
        let base_dir = dirs::cache_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No cache directory available"))?
            .join("lazytrack");

        Ok(Self {
            base_dir,
            profile: profile.to_string(),
        })
    }

    /// Create a storage handle with an explicit base directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>, profile: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            profile: profile.to_string(),
        }
    }

    /// Get the profile-specific storage directory.
    fn profile_dir(&self) -> PathBuf {
        self.base_dir.join(&self.profile)
    }

    /// Get the path for a storage key.
    fn item_path(&self, key: &str) -> PathBuf {
        // Sanitize the key to be safe for filesystem
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.profile_dir().join(format!("{}.json", safe_key))
    }

    /// Read a value for a key.
    ///
    /// Returns `None` when the key is absent or the stored JSON no longer
    /// parses (the corrupted file is removed).
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.item_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Failed to read storage file {:?}: {}", path, e);
                }
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                trace!("Storage hit for {:?}", path);
                Some(value)
            }
            Err(e) => {
                debug!("Failed to parse storage file {:?}: {}", path, e);
                // Remove corrupted file
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Write a value for a key.
    pub fn set_item<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        let path = self.item_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, content)?;
        trace!("Stored data to {:?}", path);
        Ok(())
    }

    /// Remove a key.
    pub fn remove_item(&self, key: &str) -> io::Result<()> {
        let path = self.item_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed storage key {}", key);
        }
        Ok(())
    }

    /// Remove everything stored for this profile.
    pub fn clear(&self) -> io::Result<()> {
        let dir = self.profile_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            debug!("Cleared storage for profile {}", self.profile);
        }
        Ok(())
    }

    /// The last submitted search query, if any.
    pub fn last_query(&self) -> Option<String> {
        self.get_item(LAST_QUERY_KEY)
    }

    /// Remember the last submitted search query.
    pub fn store_last_query(&self, query: &str) -> io::Result<()> {
        self.set_item(LAST_QUERY_KEY, &query)
    }

    /// The recent searches, most recent first.
    pub fn recent_searches(&self) -> Vec<String> {
        self.get_item(RECENT_SEARCHES_KEY).unwrap_or_default()
    }

    /// Push a query onto the recent search list.
    ///
    /// The query moves to the front, duplicates are dropped, and the list
    /// is capped at [`MAX_RECENT_SEARCHES`]. Empty queries are ignored.
    pub fn push_recent_search(&self, query: &str) -> io::Result<()> {
        if query.is_empty() {
            return Ok(());
        }

        let mut recents = self.recent_searches();
        recents.retain(|q| q != query);
        recents.insert(0, query.to_string());
        recents.truncate(MAX_RECENT_SEARCHES);
        self.set_item(RECENT_SEARCHES_KEY, &recents)
    }

    /// The cached first page of issues, if any.
    pub fn cached_issues(&self) -> Option<Vec<IssueSummary>> {
        self.get_item(ISSUES_CACHE_KEY)
    }

    /// Cache the first page of issues for instant startup display.
    pub fn store_cached_issues(&self, issues: &[IssueSummary]) -> io::Result<()> {
        self.set_item(ISSUES_CACHE_KEY, &issues)
    }

    /// The base directory, mainly for diagnostics.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempdir().unwrap();
        let storage = Storage::with_base_dir(dir.path(), "test");
        (dir, storage)
    }

    fn create_test_issue(id: &str, summary: &str) -> IssueSummary {
        IssueSummary {
            id: id.to_string(),
            id_readable: None,
            summary: summary.to_string(),
            fields: vec![],
        }
    }

    #[test]
    fn test_item_roundtrip() {
        let (_dir, storage) = create_test_storage();

        storage.set_item("answer", &42u32).unwrap();
        assert_eq!(storage.get_item::<u32>("answer"), Some(42));
    }

    #[test]
    fn test_missing_item_is_none() {
        let (_dir, storage) = create_test_storage();
        assert_eq!(storage.get_item::<String>("missing"), None);
    }

    #[test]
    fn test_corrupted_item_is_removed() {
        let (_dir, storage) = create_test_storage();

        storage.set_item("broken", &"ok").unwrap();
        let path = storage.item_path("broken");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(storage.get_item::<String>("broken"), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_item() {
        let (_dir, storage) = create_test_storage();

        storage.set_item("gone", &"value").unwrap();
        storage.remove_item("gone").unwrap();
        assert_eq!(storage.get_item::<String>("gone"), None);
    }

    #[test]
    fn test_clear() {
        let (_dir, storage) = create_test_storage();

        storage.store_last_query("for: me").unwrap();
        storage.push_recent_search("for: me").unwrap();
        storage.clear().unwrap();

        assert_eq!(storage.last_query(), None);
        assert!(storage.recent_searches().is_empty());
    }

    #[test]
    fn test_profiles_are_separated() {
        let dir = tempdir().unwrap();
        let first = Storage::with_base_dir(dir.path(), "first");
        let second = Storage::with_base_dir(dir.path(), "second");

        first.store_last_query("project: A").unwrap();
        assert_eq!(second.last_query(), None);
    }

    #[test]
    fn test_last_query_roundtrip() {
        let (_dir, storage) = create_test_storage();

        assert_eq!(storage.last_query(), None);
        storage.store_last_query("for: me #Unresolved").unwrap();
        assert_eq!(
            storage.last_query().as_deref(),
            Some("for: me #Unresolved")
        );
    }

    #[test]
    fn test_recent_searches_front_insert() {
        let (_dir, storage) = create_test_storage();

        storage.push_recent_search("first").unwrap();
        storage.push_recent_search("second").unwrap();

        assert_eq!(storage.recent_searches(), vec!["second", "first"]);
    }

    #[test]
    fn test_recent_searches_dedupe_moves_to_front() {
        let (_dir, storage) = create_test_storage();

        storage.push_recent_search("first").unwrap();
        storage.push_recent_search("second").unwrap();
        storage.push_recent_search("first").unwrap();

        assert_eq!(storage.recent_searches(), vec!["first", "second"]);
    }

    #[test]
    fn test_recent_searches_capped() {
        let (_dir, storage) = create_test_storage();

        for i in 0..15 {
            storage.push_recent_search(&format!("query-{}", i)).unwrap();
        }

        let recents = storage.recent_searches();
        assert_eq!(recents.len(), MAX_RECENT_SEARCHES);
        assert_eq!(recents[0], "query-14");
    }

    #[test]
    fn test_recent_searches_ignore_empty() {
        let (_dir, storage) = create_test_storage();

        storage.push_recent_search("").unwrap();
        assert!(storage.recent_searches().is_empty());
    }

    #[test]
    fn test_cached_issues_roundtrip() {
        let (_dir, storage) = create_test_storage();

        let issues = vec![
            create_test_issue("2-1", "First issue"),
            create_test_issue("2-2", "Second issue"),
        ];
        storage.store_cached_issues(&issues).unwrap();

        let cached = storage.cached_issues().unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].summary, "First issue");
    }

    #[test]
    fn test_special_characters_in_key() {
        let (_dir, storage) = create_test_storage();

        storage.set_item("weird/key:name", &"value").unwrap();
        assert_eq!(
            storage.get_item::<String>("weird/key:name"),
            Some("value".to_string())
        );
    }
}
