use std::io;
use std::io::Write;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app;
use crate::app::MigrationError;
use crate::auth;
use crate::core;
use crate::core::DbError;
use crate::db;
use crate::db::{NewUser, Role};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: MigrationError },

    #[error("Running migrations failed")]
    MigrationRunFailed { #[source] source: MigrationError },

    #[error("Creating user failed")]
    UserCreationFailed { #[source] source: DbError },

    #[error("Reading password failed")]
    PasswordPromptFailed { #[source] source: io::Error },

    #[error("Hashing password failed: {0}")]
    PasswordHashingFailed(argon2::password_hash::Error),

    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Parser)]
#[command(name = "rentbook")]
#[command(about = "Rental bookkeeping server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration utilities
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },
    /// Create a user account
    CreateUser {
        /// Username for the new account
        #[arg(short, long)]
        username: String,
        /// One of admin, staff, tenant
        #[arg(short, long, default_value = "admin")]
        role: String,
        /// Email for the new account (optional)
        #[arg(short, long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// List all embedded migrations
    List,
    /// Check if there are pending migrations
    Status,
    /// Run all pending migrations
    Run,
}

/// Runs the requested CLI command. Returns `true` when a command was handled and the
/// server should not start.
pub async fn run_cli(context: &core::Context) -> Result<bool, CliError> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        return Ok(false);
    };

    match command {
        Commands::Migrate { command: MigrateCommands::List } => {
            let migrations = app::list_migrations();
            if migrations.is_empty() {
                println!("No migrations found.");
            } else {
                println!("Available migrations:");
                for (version, description) in migrations {
                    println!("  {version} {description}");
                }
            }
        }
        Commands::Migrate { command: MigrateCommands::Status } => match app::pending_migrations(&context.db).await {
            Ok(pending) if pending.is_empty() => println!("Database is up to date. No pending migrations."),
            Ok(pending) => println!("{} pending migration(s): {pending:?}", pending.len()),
            Err(MigrationError::NoMigrationsApplied) => println!("No migrations have been applied yet."),
            Err(e) => return Err(CliError::MigrationStatusCheckFailed { source: e }),
        },
        Commands::Migrate { command: MigrateCommands::Run } => {
            app::run_migrations(&context.db)
                .await
                .map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Migrations applied successfully.");
        }
        Commands::CreateUser { username, role, email } => {
            let role = Role::from_str(&role).map_err(CliError::InvalidInput)?;

            print!("Enter password for {} user '{}': ", role.as_str(), username);
            io::stdout().flush().map_err(|e| CliError::PasswordPromptFailed { source: e })?;
            let password = rpassword::read_password().map_err(|e| CliError::PasswordPromptFailed { source: e })?;

            app::run_migrations(&context.db)
                .await
                .map_err(|e| CliError::MigrationRunFailed { source: e })?;
            create_user(&context.db, &username, &password, role, email).await?;
            println!("User '{username}' created successfully!");
        }
    }

    Ok(true)
}

async fn create_user(
    db: &core::DbContext,
    username: &str,
    password: &str,
    role: Role,
    email: Option<String>,
) -> Result<(), CliError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CliError::InvalidInput("Username cannot be empty".to_string()));
    }
    auth::check_password_policy(password).map_err(CliError::InvalidInput)?;
    if db::get_user_by_name(db, username).await.is_ok() {
        return Err(CliError::InvalidInput(format!("User '{username}' already exists")));
    }

    let password_hash = auth::hash_password(password).map_err(CliError::PasswordHashingFailed)?;
    let new_user = NewUser {
        username: username.to_string(),
        password_hash: Some(password_hash),
        email,
        role,
    };
    let user = db::create_user(db, new_user)
        .await
        .map_err(|e| CliError::UserCreationFailed { source: e })?;
    tracing::info!(user_id = user.id, role = role.as_str(), "User created from the command line");
    Ok(())
}
