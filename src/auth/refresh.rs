//! Single-flight refresh of stale access tokens.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::AuthError;

use super::flow::{expiry_timestamp, split_scope};
use super::record::{TokenRecord, TokenStatus};
use super::secret::SecretString;
use super::store::CredentialStore;

/// Serializes refresh attempts per user and talks to the token endpoint.
///
/// Concurrent callers for the same user queue on that user's lock and then
/// observe the holder's result through the store re-read; callers for
/// different users never contend. Exactly one network call is made per
/// staleness event. No internal retry: transient failures surface as
/// [`AuthError::Retryable`] and the caller owns backoff policy.
pub struct RefreshCoordinator {
    client: reqwest::Client,
    config: BridgeConfig,
    store: Arc<dyn CredentialStore>,
    /// Lazily-populated per-user locks; entries are never removed, one small
    /// allocation per user the process has seen.
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RefreshCoordinator {
    pub fn new(config: BridgeConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Obtain a fresh record for a user whose token is stale.
    ///
    /// Holding the per-user lock, re-reads the store first: a waiter whose
    /// predecessor already refreshed returns the now-fresh record without a
    /// network call.
    pub async fn refresh(&self, user_id: &str) -> Result<TokenRecord, AuthError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let current = self.store.get(user_id)?.ok_or(AuthError::NotAuthorized)?;
        if current.classify(Utc::now(), self.config.grace_window) == TokenStatus::Valid {
            debug!(user_id, "record already refreshed by a concurrent caller");
            return Ok(current);
        }

        let refresh_token = match current.refresh_token.clone() {
            Some(token) => token,
            None => {
                // grant never issued a refresh token; nothing to renew with
                warn!(user_id, "stale grant has no refresh token; purging");
                self.store.delete(user_id)?;
                return Err(AuthError::ReauthorizationRequired);
            }
        };

        let resp = self
            .client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let payload: RefreshResponse = match resp.json().await {
                Ok(payload) => payload,
                Err(err) => {
                    return Err(AuthError::InvalidResponse(format!(
                        "malformed refresh response: {err}"
                    )))
                }
            };
            let now = Utc::now();
            let record = TokenRecord {
                user_id: current.user_id.clone(),
                access_token: SecretString::new(payload.access_token),
                // server-supplied rotation is authoritative; keep the old
                // refresh token only when the response omits one
                refresh_token: payload
                    .refresh_token
                    .map(SecretString::new)
                    .or(current.refresh_token),
                access_expires_at: expiry_timestamp(now, payload.expires_in)?,
                issued_at: now,
                scope: payload
                    .scope
                    .as_deref()
                    .map(split_scope)
                    .unwrap_or(current.scope),
            };
            self.store.put(user_id, &record)?;
            info!(user_id, expires_at = %record.access_expires_at, "access token refreshed");
            return Ok(record);
        }

        if status.is_server_error() {
            return Err(AuthError::Retryable(format!(
                "token refresh failed with status {status}"
            )));
        }

        let body = resp.text().await.unwrap_or_default();
        let error_code = serde_json::from_str::<OAuthErrorBody>(&body)
            .ok()
            .and_then(|e| e.error);
        if error_code.as_deref() == Some("invalid_grant") {
            warn!(user_id, "refresh token rejected by server; purging grant");
            self.store.delete(user_id)?;
            return Err(AuthError::ReauthorizationRequired);
        }
        Err(AuthError::InvalidResponse(format!(
            "token refresh failed with status {status}: {}",
            error_code.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
}
