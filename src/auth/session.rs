//! Single entry point for obtaining a currently-valid access token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::AuthError;

use super::record::TokenStatus;
use super::refresh::RefreshCoordinator;
use super::secret::SecretString;
use super::store::CredentialStore;

/// Facade hiding validation and refresh from downstream callers.
///
/// Everything that needs to act on a user's behalf goes through
/// [`get_valid_access_token`](SessionManager::get_valid_access_token);
/// refresh, rotation, and purging are invisible to it.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tunebridge::auth::{FileCredentialStore, SessionManager};
/// use tunebridge::config::BridgeConfig;
///
/// # async fn example() -> Result<(), tunebridge::error::AuthError> {
/// let config = BridgeConfig::from_env()?;
/// let store = Arc::new(FileCredentialStore::new_default());
/// let sessions = SessionManager::new(config, store);
/// let token = sessions.get_valid_access_token("alice").await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    refresher: RefreshCoordinator,
    grace_window: std::time::Duration,
}

/// Secret-free summary of a stored grant, safe for display and logging.
#[derive(Debug, Clone)]
pub struct GrantStatus {
    pub user_id: String,
    pub scope: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    pub status: TokenStatus,
    pub has_refresh_token: bool,
}

impl SessionManager {
    pub fn new(config: BridgeConfig, store: Arc<dyn CredentialStore>) -> Self {
        let grace_window = config.grace_window;
        Self {
            refresher: RefreshCoordinator::new(config, store.clone()),
            store,
            grace_window,
        }
    }

    /// Return a usable access token for the user, refreshing transparently.
    ///
    /// * no stored grant → [`AuthError::NotAuthorized`]
    /// * valid token → returned directly, no network I/O
    /// * stale token → delegated to the refresh coordinator; its outcome
    ///   (`ReauthorizationRequired`, `Retryable`) propagates unchanged
    pub async fn get_valid_access_token(&self, user_id: &str) -> Result<SecretString, AuthError> {
        let record = self.store.get(user_id)?.ok_or(AuthError::NotAuthorized)?;
        match record.classify(Utc::now(), self.grace_window) {
            TokenStatus::Valid => Ok(record.access_token),
            TokenStatus::ExpiringSoon | TokenStatus::Expired => {
                debug!(user_id, "stored token stale; refreshing");
                let refreshed = self.refresher.refresh(user_id).await?;
                Ok(refreshed.access_token)
            }
        }
    }

    /// Delete the stored grant for a user.
    pub fn revoke(&self, user_id: &str) -> Result<(), AuthError> {
        if self.store.delete(user_id)? {
            Ok(())
        } else {
            Err(AuthError::NotAuthorized)
        }
    }

    /// Users with a stored grant, for administrative tooling.
    pub fn list_users(&self) -> Result<Vec<String>, AuthError> {
        self.store.list_users()
    }

    /// Secret-free status for one user, or `None` when no grant exists.
    pub fn status(&self, user_id: &str) -> Result<Option<GrantStatus>, AuthError> {
        let record = match self.store.get(user_id)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let status = record.classify(Utc::now(), self.grace_window);
        Ok(Some(GrantStatus {
            user_id: record.user_id,
            scope: record.scope,
            issued_at: record.issued_at,
            access_expires_at: record.access_expires_at,
            status,
            has_refresh_token: record.refresh_token.is_some(),
        }))
    }
}
