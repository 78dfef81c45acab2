//! CLI command handlers for authorize, status, revoke, and user listing.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    AuthorizationFlow, DeviceCodePoll, FileCredentialStore, SessionManager, TokenStatus,
};
use crate::config::BridgeConfig;
use crate::error::AuthError;

fn bridge() -> Result<(BridgeConfig, Arc<FileCredentialStore>), AuthError> {
    let config = BridgeConfig::from_env()?;
    let store = Arc::new(FileCredentialStore::new(config.store_dir.clone()));
    Ok((config, store))
}

/// Handle `tunebridge authorize <user>`.
pub async fn handle_authorize(user_id: &str, max_wait_secs: u64) -> Result<(), AuthError> {
    let (config, store) = bridge()?;
    let mut flow = AuthorizationFlow::new(config, store);
    let session = flow.start(user_id).await?;

    println!("🔗 Visit: {}", session.verification_uri);
    println!("📋 Enter code: {}", session.user_code);
    println!("⏳ Waiting for authorization...");

    let deadline = std::time::Instant::now() + Duration::from_secs(max_wait_secs);
    let mut interval_secs = session.interval_secs;
    loop {
        if std::time::Instant::now() >= deadline {
            eprintln!("❌ Authorization timed out, please try again");
            return Err(AuthError::FlowTimeout);
        }
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        match flow.poll(&session).await? {
            DeviceCodePoll::Authorized { record } => {
                println!("✅ {user_id} authorized (scope: {})", record.scope.join(" "));
                return Ok(());
            }
            DeviceCodePoll::Pending { interval_secs: next } => interval_secs = next,
            DeviceCodePoll::SlowDown { interval_secs: next } => interval_secs = next,
            DeviceCodePoll::Denied => {
                eprintln!("❌ Authorization denied");
                return Err(AuthError::FlowDenied);
            }
            DeviceCodePoll::Expired => {
                eprintln!("❌ Device code expired, please try again");
                return Err(AuthError::FlowTimeout);
            }
        }
    }
}

/// Handle `tunebridge status [user]`.
pub async fn handle_status(user_id: Option<&str>) -> Result<(), AuthError> {
    let (config, store) = bridge()?;
    let sessions = SessionManager::new(config, store);

    let users = match user_id {
        Some(user) => vec![user.to_string()],
        None => sessions.list_users()?,
    };
    if users.is_empty() {
        println!("No authorized users.");
        return Ok(());
    }
    for user in users {
        match sessions.status(&user)? {
            Some(status) => {
                let marker = match status.status {
                    TokenStatus::Valid => "✅ valid",
                    TokenStatus::ExpiringSoon => "⏳ expiring soon",
                    TokenStatus::Expired => "❌ expired",
                };
                println!(
                    "{}: {marker} (expires {}, scope: {})",
                    status.user_id,
                    status.access_expires_at,
                    status.scope.join(" ")
                );
            }
            None => println!("{user}: not authorized"),
        }
    }
    Ok(())
}

/// Handle `tunebridge revoke <user>`.
pub async fn handle_revoke(user_id: &str) -> Result<(), AuthError> {
    let (config, store) = bridge()?;
    let sessions = SessionManager::new(config, store);
    match sessions.revoke(user_id) {
        Ok(()) => {
            println!("✅ Grant revoked for {user_id}");
            Ok(())
        }
        Err(AuthError::NotAuthorized) => {
            eprintln!("No stored grant for {user_id}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Handle `tunebridge users`.
pub async fn handle_users() -> Result<(), AuthError> {
    let (config, store) = bridge()?;
    let sessions = SessionManager::new(config, store);
    let users = sessions.list_users()?;
    if users.is_empty() {
        println!("No authorized users.");
    }
    for user in users {
        println!("{user}");
    }
    Ok(())
}
