//! `CozyCat` CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply migrations/ to DATABASE_URL
//! cozycat-cli migrate
//!
//! # Load catalog and kitchen data from YAML
//! cozycat-cli seed data/seed.yaml
//!
//! # Create a staff account (password generated when -p is omitted)
//! cozycat-cli user create -e ops@cozycat.in -n "Kitchen Lead" -r operations
//!
//! # Promote or demote an existing account
//! cozycat-cli user set-role -e ops@cozycat.in -r admin
//!
//! # Dump tables to JSON files
//! cozycat-cli export backups/2025-03-01 --tables orders --tables order_items
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cozycat-cli")]
#[command(author, version, about = "CozyCat Kitchen CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert categories, products, variants, vendors, ingredients and recipes
    Seed {
        /// Path to the YAML seed file
        file: PathBuf,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Dump tables to JSON files
    Export {
        /// Output directory, created if missing
        dir: PathBuf,

        /// Tables to export (default: all)
        #[arg(long)]
        tables: Vec<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user with a profile
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Full name shown in the console
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `operations`, `partner`, `customer`)
        #[arg(short, long, default_value = "operations")]
        role: String,

        /// Password; a random one is generated and logged when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Change the role of an existing user
    SetRole {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, &role, password).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
        Commands::Export { dir, tables } => commands::export::run(&dir, &tables).await?,
    }
    Ok(())
}
