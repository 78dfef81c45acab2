//! Bridge configuration: OAuth client credentials, endpoints, and tuning.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AuthError;

const DEFAULT_CODE_PAIR_URL: &str = "https://api.amazon.com/auth/o2/create/codepair";
const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
const DEFAULT_SCOPE: &str = "music:access";
const DEFAULT_GRACE_WINDOW_SECS: u64 = 60;

/// Configuration for the credential bridge.
///
/// Endpoint URLs default to the music service's authorization server and can
/// be overridden (mainly so tests can point at a mock server).
///
/// # Example
/// ```no_run
/// use tunebridge::config::BridgeConfig;
///
/// let config = BridgeConfig::new("my-client-id")
///     .with_scope("music:access music:playlists");
/// ```
#[derive(Clone)]
pub struct BridgeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub code_pair_url: String,
    pub token_url: String,
    pub scope: String,
    pub grace_window: Duration,
    pub store_dir: PathBuf,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("code_pair_url", &self.code_pair_url)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("grace_window", &self.grace_window)
            .field("store_dir", &self.store_dir)
            .finish()
    }
}

impl BridgeConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: String::new(),
            code_pair_url: DEFAULT_CODE_PAIR_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            grace_window: Duration::from_secs(DEFAULT_GRACE_WINDOW_SECS),
            store_dir: default_store_dir(),
        }
    }

    /// Load configuration from the environment (reads `.env` if present).
    ///
    /// `TUNEBRIDGE_CLIENT_ID` is required; everything else falls back to
    /// defaults. Recognized variables: `TUNEBRIDGE_CLIENT_SECRET`,
    /// `TUNEBRIDGE_CODE_PAIR_URL`, `TUNEBRIDGE_TOKEN_URL`,
    /// `TUNEBRIDGE_SCOPE`, `TUNEBRIDGE_STORE_DIR`, `TUNEBRIDGE_GRACE_SECS`.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();
        let client_id = std::env::var("TUNEBRIDGE_CLIENT_ID").map_err(|_| {
            AuthError::Configuration("TUNEBRIDGE_CLIENT_ID not set".to_string())
        })?;
        let mut config = Self::new(client_id);
        if let Ok(secret) = std::env::var("TUNEBRIDGE_CLIENT_SECRET") {
            config.client_secret = secret;
        }
        if let Ok(url) = std::env::var("TUNEBRIDGE_CODE_PAIR_URL") {
            config.code_pair_url = url;
        }
        if let Ok(url) = std::env::var("TUNEBRIDGE_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(scope) = std::env::var("TUNEBRIDGE_SCOPE") {
            config.scope = scope;
        }
        if let Ok(dir) = std::env::var("TUNEBRIDGE_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("TUNEBRIDGE_GRACE_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                AuthError::Configuration(format!("invalid TUNEBRIDGE_GRACE_SECS: {secs}"))
            })?;
            config.grace_window = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = secret.into();
        self
    }

    pub fn with_code_pair_url(mut self, url: impl Into<String>) -> Self {
        self.code_pair_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;
        self
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }
}

/// Per-user configuration directory holding the credential files.
pub fn default_store_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tunebridge")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tunebridge"))
}
