use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::secret::SecretString;

/// A stored grant for one user: the durable unit the credential store owns.
///
/// One record per user. Mutated in place on every refresh: new access token
/// and expiry, refresh token replaced only when the server rotates it.
///
/// # Example
/// ```
/// use tunebridge::auth::{SecretString, TokenRecord};
/// use chrono::{Duration, Utc};
///
/// let record = TokenRecord {
///     user_id: "alice".to_string(),
///     access_token: SecretString::new("access"),
///     refresh_token: Some(SecretString::new("refresh")),
///     access_expires_at: Utc::now() + Duration::hours(1),
///     issued_at: Utc::now(),
///     scope: vec!["music:access".to_string()],
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,
    pub access_token: SecretString,
    /// Absent only for grants the server never issued one for.
    pub refresh_token: Option<SecretString>,
    pub access_expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Vec<String>,
}

/// Usability of a stored access token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    /// Comfortably inside the validity window.
    Valid,
    /// Inside the grace window before expiry; refresh proactively so an
    /// in-flight request does not race the deadline.
    ExpiringSoon,
    /// Past expiry.
    Expired,
}

impl TokenRecord {
    /// Classify this record against `now` with the given grace window.
    ///
    /// Pure and deterministic; never fails and performs no I/O.
    pub fn classify(&self, now: DateTime<Utc>, grace_window: Duration) -> TokenStatus {
        if now >= self.access_expires_at {
            return TokenStatus::Expired;
        }
        // a grace window too large to represent covers the whole remaining
        // lifetime, so the token is at best expiring soon
        let threshold = TimeDelta::from_std(grace_window)
            .ok()
            .and_then(|grace| self.access_expires_at.checked_sub_signed(grace));
        match threshold {
            Some(threshold) if now < threshold => TokenStatus::Valid,
            _ => TokenStatus::ExpiringSoon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record_expiring_at(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            user_id: "alice".to_string(),
            access_token: SecretString::new("access"),
            refresh_token: Some(SecretString::new("refresh")),
            access_expires_at: expires_at,
            issued_at: Utc::now(),
            scope: vec![],
        }
    }

    const GRACE: Duration = Duration::from_secs(60);

    #[test]
    fn far_future_expiry_is_valid() {
        let now = Utc::now();
        let record = record_expiring_at(now + ChronoDuration::hours(1));
        assert_eq!(record.classify(now, GRACE), TokenStatus::Valid);
    }

    #[test]
    fn past_expiry_is_expired_never_valid() {
        let now = Utc::now();
        for secs in [1, 60, 3600, 86_400] {
            let record = record_expiring_at(now - ChronoDuration::seconds(secs));
            assert_eq!(record.classify(now, GRACE), TokenStatus::Expired);
        }
    }

    #[test]
    fn expiry_inside_grace_window_is_expiring_soon() {
        let now = Utc::now();
        let record = record_expiring_at(now + ChronoDuration::seconds(30));
        assert_eq!(record.classify(now, GRACE), TokenStatus::ExpiringSoon);
    }

    #[test]
    fn exact_expiry_instant_is_expired() {
        let now = Utc::now();
        let record = record_expiring_at(now);
        assert_eq!(record.classify(now, GRACE), TokenStatus::Expired);
    }

    #[test]
    fn just_outside_grace_window_is_valid() {
        let now = Utc::now();
        let record = record_expiring_at(now + ChronoDuration::seconds(61));
        assert_eq!(record.classify(now, GRACE), TokenStatus::Valid);
    }

    #[test]
    fn oversized_grace_window_degrades_to_expiring_soon() {
        let now = Utc::now();
        let record = record_expiring_at(now + ChronoDuration::hours(1));
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(record.classify(now, huge), TokenStatus::ExpiringSoon);
        let expired = record_expiring_at(now - ChronoDuration::seconds(1));
        assert_eq!(expired.classify(now, huge), TokenStatus::Expired);
    }

    #[test]
    fn classification_is_deterministic() {
        let now = Utc::now();
        let record = record_expiring_at(now + ChronoDuration::seconds(30));
        let first = record.classify(now, GRACE);
        let second = record.classify(now, GRACE);
        assert_eq!(first, second);
    }
}
