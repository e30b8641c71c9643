//! View state machines.
//!
//! The list and detail states are plain data with synchronous transition
//! methods; all remote work happens in the task spawner and flows back as
//! messages. Sessions tie in-flight work to the view that started it.

pub mod detail;
pub mod list;
pub mod session;

pub use detail::{issue_id_is_readable, IssueDetailState};
pub use list::ListState;
pub use session::{SessionGuard, ViewSession};
