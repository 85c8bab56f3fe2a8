//! Bookshelf CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bookshelf migrate
//!
//! # Load the bundled starter catalog (optionally with an admin account)
//! bookshelf seed
//! echo "$ADMIN_PASSWORD" | bookshelf seed --admin-email admin@example.com
//!
//! # Create a user; the password is read from stdin
//! printf '%s\n%s\n' "$PW" "$PW" | bookshelf user create -e reader@example.com -n Reader
//!
//! # Print row counts
//! bookshelf stats --json
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKSHELF_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `RUST_LOG` - log filter (default: `bookshelf_cli=info,bookshelf_storefront=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(author, version, about = "Bookshelf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load catalog fixtures
    Seed {
        /// YAML fixture file (default: bundled starter catalog)
        #[arg(short, long)]
        fixtures: Option<PathBuf>,

        /// Also create an admin account with this email; password from stdin
        #[arg(long)]
        admin_email: Option<String>,

        /// Display name for the admin account
        #[arg(long, default_value = "admin")]
        admin_name: String,
    },
    /// Manage site users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Print catalog row counts
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user (password read from stdin)
    Create {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// User display name
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookshelf_cli=info,bookshelf_storefront=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            fixtures,
            admin_email,
            admin_name,
        } => {
            commands::seed::run(fixtures.as_deref(), admin_email, admin_name).await?;
        }
        Commands::User { action } => match action {
            UserAction::Create { email, name } => {
                commands::user::create(&email, &name).await?;
            }
        },
        Commands::Stats { json } => commands::stats::run(json).await?,
    }
    Ok(())
}
