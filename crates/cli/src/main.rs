//! Shopfront CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopfront-cli migrate
//!
//! # Insert demo catalog data and the demo/admin accounts
//! shopfront-cli seed --demo-password '...' --admin-password '...'
//!
//! # Grant or revoke admin rights
//! shopfront-cli user promote -e someone@example.com
//! shopfront-cli user demote -e someone@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed demo data (idempotent)
//! - `user promote|demote` - Toggle the admin flag

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopfront-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed demo brands, categories, products and users
    Seed {
        /// Password for the demo customer account
        #[arg(long, env = "SEED_DEMO_PASSWORD")]
        demo_password: String,

        /// Password for the admin account
        #[arg(long, env = "SEED_ADMIN_PASSWORD")]
        admin_password: String,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Grant admin rights
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke admin rights
    Demote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Seed {
            demo_password,
            admin_password,
        } => commands::seed::run(&demo_password, &admin_password).await?,
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::user::set_admin(&email, true).await?,
            UserAction::Demote { email } => commands::user::set_admin(&email, false).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_promote() {
        let cli = Cli::try_parse_from(["shopfront-cli", "user", "promote", "-e", "a@b.co"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::User {
                action: UserAction::Promote { ref email }
            } if email == "a@b.co"
        ));
    }
}
