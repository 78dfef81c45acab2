//! Administrative CLI: authorize, status, revoke, and user listing.

pub mod admin;

use clap::{Parser, Subcommand};

/// Tunebridge admin CLI
#[derive(Parser, Debug)]
#[command(name = "tunebridge", version, about = "Tunebridge — music service credential bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the device-code authorization flow for a user
    Authorize(AuthorizeArgs),
    /// Show stored grant status
    Status(StatusArgs),
    /// Delete the stored grant for a user
    Revoke(RevokeArgs),
    /// List users with stored grants
    Users,
}

/// Arguments for `tunebridge authorize`.
#[derive(Parser, Debug)]
pub struct AuthorizeArgs {
    /// Operator-chosen identifier for the account
    pub user_id: String,

    /// Maximum seconds to wait for the user to consent
    #[arg(long, default_value_t = 900)]
    pub max_wait_secs: u64,
}

/// Arguments for `tunebridge status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Show one user instead of all
    pub user_id: Option<String>,
}

/// Arguments for `tunebridge revoke`.
#[derive(Parser, Debug)]
pub struct RevokeArgs {
    pub user_id: String,
}
