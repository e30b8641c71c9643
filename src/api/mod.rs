//! YouTrack API client and types.
//!
//! This module provides the interface for communicating with the YouTrack REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod permissions;
pub mod types;

pub use auth::Auth;
pub use client::{TrackerApi, TrackerClient};
pub use error::{ApiError, Result as ApiResult};
pub use permissions::PermissionCache;
