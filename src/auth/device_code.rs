use chrono::{DateTime, Utc};

use super::record::TokenRecord;

/// Pending device-code authorization for one user.
///
/// Returned by [`AuthorizationFlow::start`](super::flow::AuthorizationFlow::start);
/// the caller shows the URL and code to the user and polls until the grant
/// resolves.
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    pub user_id: String,
    pub verification_uri: String,
    pub user_code: String,
    pub device_code: String,
    pub interval_secs: u64,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a single poll attempt during a device-code flow.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    /// Consent not granted yet; poll again after the interval.
    Pending { interval_secs: u64 },
    /// Server asked to slow down; poll again after the longer interval.
    SlowDown { interval_secs: u64 },
    /// Consent granted; the issued grant has been persisted.
    Authorized { record: TokenRecord },
    /// The user denied the request.
    Denied,
    /// The device code expired before the user consented.
    Expired,
}
