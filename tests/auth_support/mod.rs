#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use tunebridge::auth::{CredentialStore, SecretString, TokenRecord};
use tunebridge::config::BridgeConfig;
use tunebridge::error::AuthError;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<String, TokenRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: TokenRecord) {
        self.records
            .lock()
            .expect("store lock poisoned")
            .insert(record.user_id.clone(), record);
    }

    pub fn snapshot(&self, user_id: &str) -> Option<TokenRecord> {
        self.records
            .lock()
            .expect("store lock poisoned")
            .get(user_id)
            .cloned()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.snapshot(user_id))
    }

    fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), AuthError> {
        self.records
            .lock()
            .expect("store lock poisoned")
            .insert(user_id.to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<bool, AuthError> {
        Ok(self
            .records
            .lock()
            .expect("store lock poisoned")
            .remove(user_id)
            .is_some())
    }

    fn list_users(&self) -> Result<Vec<String>, AuthError> {
        let mut users: Vec<String> = self
            .records
            .lock()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect();
        users.sort();
        Ok(users)
    }
}

/// Config pointed at a wiremock authorization server.
pub fn test_config(server_uri: &str) -> BridgeConfig {
    BridgeConfig::new("client-test")
        .with_client_secret("secret-test")
        .with_code_pair_url(format!("{server_uri}/auth/o2/create/codepair"))
        .with_token_url(format!("{server_uri}/auth/o2/token"))
}

/// Record expiring `expires_in_secs` from now, with a per-user refresh token.
pub fn record(user_id: &str, access_token: &str, expires_in_secs: i64) -> TokenRecord {
    TokenRecord {
        user_id: user_id.to_string(),
        access_token: SecretString::new(access_token),
        refresh_token: Some(SecretString::new(format!("refresh-{user_id}"))),
        access_expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        issued_at: Utc::now(),
        scope: vec!["music:access".to_string()],
    }
}
