//! Tunebridge: OAuth token lifecycle manager for a music-service bridge.
//!
//! Acquires, persists, refreshes, and revokes per-user authorization tokens
//! so downstream tooling (search, playlists, playback) can act on a user's
//! behalf without re-authenticating every call. The music endpoints
//! themselves are external collaborators; this crate owns only the
//! credential lifecycle.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tunebridge::auth::{FileCredentialStore, SessionManager};
//! use tunebridge::config::BridgeConfig;
//!
//! # async fn example() -> Result<(), tunebridge::error::AuthError> {
//! let config = BridgeConfig::from_env()?;
//! let store = Arc::new(FileCredentialStore::new_default());
//! let sessions = SessionManager::new(config, store);
//! let token = sessions.get_valid_access_token("alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{AuthError, Result};
