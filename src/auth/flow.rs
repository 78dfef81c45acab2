//! First-time grant: the device-code flow against the music service's
//! authorization server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::AuthError;

use super::device_code::{DeviceCodePoll, DeviceCodeSession};
use super::record::TokenRecord;
use super::secret::SecretString;
use super::store::CredentialStore;

/// Progress of an authorization flow for one user.
///
/// Closed set of states; callers can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NotStarted,
    /// Code pair issued; waiting for the user to consent externally.
    AwaitingUserConsent,
    /// Consent observed; exchanging the device code for tokens.
    ExchangingCode,
    /// Terminal success: a grant was persisted.
    Issued,
    /// Terminal failure.
    Failed(FlowFailure),
}

/// Why a flow ended without issuing a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowFailure {
    Denied,
    Timeout,
    ServerError,
}

/// Drives the initial device-code grant and persists the issued record.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tunebridge::auth::{AuthorizationFlow, FileCredentialStore};
/// use tunebridge::config::BridgeConfig;
///
/// # async fn example() -> Result<(), tunebridge::error::AuthError> {
/// let config = BridgeConfig::from_env()?;
/// let store = Arc::new(FileCredentialStore::new_default());
/// let mut flow = AuthorizationFlow::new(config, store);
/// let record = flow.run("alice", Duration::from_secs(900)).await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthorizationFlow {
    client: reqwest::Client,
    config: BridgeConfig,
    store: Arc<dyn CredentialStore>,
    state: FlowState,
}

impl AuthorizationFlow {
    pub fn new(config: BridgeConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            store,
            state: FlowState::NotStarted,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Request a code pair from the authorization server.
    ///
    /// On success the flow is `AwaitingUserConsent`; the caller shows the
    /// verification URI and user code, then polls.
    pub async fn start(&mut self, user_id: &str) -> Result<DeviceCodeSession, AuthError> {
        let resp = match self
            .client
            .post(&self.config.code_pair_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                return Err(err.into());
            }
        };
        if !resp.status().is_success() {
            self.state = FlowState::Failed(FlowFailure::ServerError);
            return Err(AuthError::InvalidResponse(format!(
                "code pair request failed with status {}",
                resp.status()
            )));
        }
        let payload: CodePairResponse = match resp.json().await {
            Ok(payload) => payload,
            Err(err) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                return Err(AuthError::InvalidResponse(format!(
                    "malformed code pair response: {err}"
                )));
            }
        };
        let expires_at = match expiry_timestamp(Utc::now(), payload.expires_in) {
            Ok(at) => at,
            Err(err) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                return Err(err);
            }
        };
        self.state = FlowState::AwaitingUserConsent;
        debug!(user_id, expires_in = payload.expires_in, "code pair issued");
        Ok(DeviceCodeSession {
            user_id: user_id.to_string(),
            verification_uri: payload.verification_uri,
            user_code: payload.user_code,
            device_code: payload.device_code,
            interval_secs: payload.interval,
            expires_at,
        })
    }

    /// Poll once for the outcome of a pending session.
    ///
    /// On `Authorized` the record has already been persisted and the flow is
    /// `Issued`. `Denied` and `Expired` are terminal.
    pub async fn poll(&mut self, session: &DeviceCodeSession) -> Result<DeviceCodePoll, AuthError> {
        if Utc::now() >= session.expires_at {
            self.state = FlowState::Failed(FlowFailure::Timeout);
            return Ok(DeviceCodePoll::Expired);
        }
        let resp = match self
            .client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "device_code"),
                ("device_code", session.device_code.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                return Err(err.into());
            }
        };
        let status = resp.status();
        if status.is_server_error() {
            self.state = FlowState::Failed(FlowFailure::ServerError);
            return Err(AuthError::InvalidResponse(format!(
                "device token poll failed with status {status}"
            )));
        }
        let body = resp.text().await.unwrap_or_default();
        let payload: DeviceTokenResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(err) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                return Err(AuthError::InvalidResponse(format!(
                    "malformed device token response: {err}"
                )));
            }
        };

        if let Some(access_token) = payload.access_token {
            self.state = FlowState::ExchangingCode;
            let now = Utc::now();
            let access_expires_at =
                match expiry_timestamp(now, payload.expires_in.unwrap_or(3600)) {
                    Ok(at) => at,
                    Err(err) => {
                        self.state = FlowState::Failed(FlowFailure::ServerError);
                        return Err(err);
                    }
                };
            let record = TokenRecord {
                user_id: session.user_id.clone(),
                access_token: SecretString::new(access_token),
                refresh_token: payload.refresh_token.map(SecretString::new),
                access_expires_at,
                issued_at: now,
                scope: payload
                    .scope
                    .as_deref()
                    .map(split_scope)
                    .unwrap_or_else(|| split_scope(&self.config.scope)),
            };
            self.store.put(&session.user_id, &record)?;
            self.state = FlowState::Issued;
            info!(user_id = %session.user_id, scope = ?record.scope, "grant issued");
            return Ok(DeviceCodePoll::Authorized { record });
        }

        match payload.error.as_deref() {
            Some("authorization_pending") => Ok(DeviceCodePoll::Pending {
                interval_secs: session.interval_secs,
            }),
            Some("slow_down") => Ok(DeviceCodePoll::SlowDown {
                interval_secs: session.interval_secs + 2,
            }),
            Some("expired_token") => {
                self.state = FlowState::Failed(FlowFailure::Timeout);
                Ok(DeviceCodePoll::Expired)
            }
            Some("access_denied") => {
                warn!(user_id = %session.user_id, "authorization denied by user");
                self.state = FlowState::Failed(FlowFailure::Denied);
                Ok(DeviceCodePoll::Denied)
            }
            Some(other) => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                Err(AuthError::InvalidResponse(format!(
                    "device code error: {other}"
                )))
            }
            None => {
                self.state = FlowState::Failed(FlowFailure::ServerError);
                Err(AuthError::InvalidResponse(
                    "device token response missing token and error".to_string(),
                ))
            }
        }
    }

    /// Start a flow and poll it to completion, bounded by `max_wait`.
    ///
    /// Sleeps the server-directed interval between polls. Terminal failures
    /// map onto [`AuthError::FlowDenied`] and [`AuthError::FlowTimeout`].
    pub async fn run(&mut self, user_id: &str, max_wait: Duration) -> Result<TokenRecord, AuthError> {
        let session = self.start(user_id).await?;
        let deadline = Instant::now() + max_wait;
        let mut interval_secs = session.interval_secs;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.state = FlowState::Failed(FlowFailure::Timeout);
                return Err(AuthError::FlowTimeout);
            }
            tokio::time::sleep(Duration::from_secs(interval_secs).min(remaining)).await;
            match self.poll(&session).await? {
                DeviceCodePoll::Pending { interval_secs: next } => interval_secs = next,
                DeviceCodePoll::SlowDown { interval_secs: next } => interval_secs = next,
                DeviceCodePoll::Authorized { record } => return Ok(record),
                DeviceCodePoll::Denied => return Err(AuthError::FlowDenied),
                DeviceCodePoll::Expired => return Err(AuthError::FlowTimeout),
            }
        }
    }
}

/// Code-pair response; the authorization server uses camelCase field names.
#[derive(Debug, Deserialize)]
struct CodePairResponse {
    #[serde(rename = "deviceCode")]
    device_code: String,
    #[serde(rename = "userCode")]
    user_code: String,
    #[serde(rename = "verificationUri")]
    verification_uri: String,
    #[serde(rename = "expiresIn")]
    expires_in: u64,
    #[serde(rename = "interval", default = "default_poll_interval")]
    interval: u64,
}

fn default_poll_interval() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct DeviceTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn split_scope(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Turn a server-reported `expires_in` into an absolute expiry. The value is
/// attacker-adjacent input; lifetimes that cannot be represented are rejected
/// instead of panicking inside chrono arithmetic.
pub(crate) fn expiry_timestamp(
    now: DateTime<Utc>,
    expires_in: u64,
) -> Result<DateTime<Utc>, AuthError> {
    i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AuthError::InvalidResponse(format!("expires_in out of range: {expires_in}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_scope_handles_space_delimited_lists() {
        assert_eq!(
            split_scope("music:access music:playlists"),
            vec!["music:access".to_string(), "music:playlists".to_string()]
        );
        assert!(split_scope("").is_empty());
    }

    #[test]
    fn expiry_timestamp_rejects_unrepresentable_lifetimes() {
        let now = Utc::now();
        let at = expiry_timestamp(now, 3600).expect("normal lifetime");
        assert_eq!(at, now + TimeDelta::seconds(3600));
        assert!(matches!(
            expiry_timestamp(now, 10_000_000_000_000_000),
            Err(AuthError::InvalidResponse(_))
        ));
        assert!(expiry_timestamp(now, u64::MAX).is_err());
    }
}
