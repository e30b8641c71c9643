//! LazyTrack, a terminal user interface for YouTrack.
//!
//! The crate is organized around The Elm Architecture: [`app::App`] owns
//! all state, [`tasks::TaskSpawner`] runs every remote call on the tokio
//! runtime, and results come back over a channel as [`tasks::ApiMessage`]
//! values stamped with the [`state::ViewSession`] that asked for them.

pub mod actions;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod ui;
pub mod usage;

pub use app::{App, AppState};
pub use error::AppError;
