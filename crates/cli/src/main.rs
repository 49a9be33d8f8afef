//! Tanam CLI - Database migrations and operational tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tanam-cli migrate
//!
//! # Inspect or clear an email's login attempt counter
//! tanam-cli throttle show user@example.com
//! tanam-cli throttle reset user@example.com
//!
//! # Mark an account's email as verified
//! tanam-cli user verify user@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `throttle` - Inspect and reset login throttling
//! - `user verify` - Verify an account by hand

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tanam-cli")]
#[command(author, version, about = "Tanam API CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and reset login throttling
    Throttle {
        #[command(subcommand)]
        action: ThrottleAction,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum ThrottleAction {
    /// Show the recorded login attempts for an email
    Show {
        /// Account email address
        email: String,
    },
    /// Clear the login attempt counter for an email
    Reset {
        /// Account email address
        email: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Mark an account's email address as verified
    Verify {
        /// Account email address
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Throttle { action } => match action {
            ThrottleAction::Show { email } => commands::throttle::show(&email).await?,
            ThrottleAction::Reset { email } => commands::throttle::reset(&email).await?,
        },
        Commands::User { action } => match action {
            UserAction::Verify { email } => commands::user::verify(&email).await?,
        },
    }
    Ok(())
}
