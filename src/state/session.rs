//! Liveness tracking for the issue views.
//!
//! Every view gets a session with a unique ID and a cancellation token.
//! Background tasks carry a [`SessionGuard`] and stamp their results with
//! the session ID; the app applies a result only while [`ViewSession::accepts`]
//! holds. Closing a view cancels the token, so late completions from a
//! previous view are dropped instead of being written into fresh state.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Liveness of one mounted view.
#[derive(Debug)]
pub struct ViewSession {
    id: u64,
    token: CancellationToken,
}

impl ViewSession {
    pub fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hand out a guard for a task spawned on behalf of this session.
    pub fn guard(&self) -> SessionGuard {
        SessionGuard {
            id: self.id,
            token: self.token.clone(),
        }
    }

    /// Whether a result stamped with `session_id` may still be applied.
    pub fn accepts(&self, session_id: u64) -> bool {
        session_id == self.id && !self.token.is_cancelled()
    }

    /// Close the session. In-flight work for it is discarded on arrival.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Cheap handle a background task carries to check its session's liveness.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    id: u64,
    token: CancellationToken,
}

impl SessionGuard {
    /// The session ID to stamp results with.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the session closes.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_get_distinct_ids() {
        let first = ViewSession::new();
        let second = ViewSession::new();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_accepts_own_id_while_open() {
        let session = ViewSession::new();
        assert!(session.accepts(session.id()));
        assert!(!session.accepts(session.id() + 1));
    }

    #[test]
    fn test_closed_session_rejects_own_id() {
        let session = ViewSession::new();
        let id = session.id();
        session.close();
        assert!(!session.accepts(id));
    }

    #[test]
    fn test_guard_observes_close() {
        let session = ViewSession::new();
        let guard = session.guard();
        assert!(!guard.is_cancelled());
        session.close();
        assert!(guard.is_cancelled());
    }

    #[test]
    fn test_drop_cancels_outstanding_guards() {
        let session = ViewSession::new();
        let guard = session.guard();
        drop(session);
        assert!(guard.is_cancelled());
    }

    #[test]
    fn test_replacing_session_rejects_stale_results() {
        let mut session = ViewSession::new();
        let stale_id = session.id();
        let stale_guard = session.guard();

        session = ViewSession::new();

        assert!(stale_guard.is_cancelled());
        assert!(!session.accepts(stale_id));
        assert!(session.accepts(session.id()));
    }

    #[tokio::test]
    async fn test_cancelled_completes_after_close() {
        let session = ViewSession::new();
        let guard = session.guard();
        session.close();
        // Must not hang.
        guard.cancelled().await;
    }
}
