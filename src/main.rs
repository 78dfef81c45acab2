//! Tunebridge CLI binary entry point.

use clap::Parser;
use tunebridge::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Authorize(args) => {
            tunebridge::cli::admin::handle_authorize(&args.user_id, args.max_wait_secs).await
        }
        Commands::Status(args) => {
            tunebridge::cli::admin::handle_status(args.user_id.as_deref()).await
        }
        Commands::Revoke(args) => tunebridge::cli::admin::handle_revoke(&args.user_id).await,
        Commands::Users => tunebridge::cli::admin::handle_users().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
