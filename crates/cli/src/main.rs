//! Workroom CLI - the main entry point.
//!
//! Commands:
//! - `init`     - Write a default config file
//! - `serve`    - Start the HTTP gateway
//! - `migrate`  - Apply the database schema
//! - `token`    - Mint a bearer token for a user
//! - `user add` - Register a user with a tenant and role
//! - `index`    - Load knowledge chunks from a JSONL file
//! - `doctor`   - Diagnose configuration and connectivity

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "workroom",
    about = "Workroom - tenant-scoped AI assistants over business data",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.workroom/config.toml)
    #[arg(short, long, global = true, env = "WORKROOM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Apply the database schema
    Migrate,

    /// Mint a bearer token for a user ID
    Token {
        /// The user ID (`sub` claim)
        user: String,

        /// Lifetime in seconds (defaults to auth.token_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Load knowledge chunks from a JSONL file
    Index {
        /// Path to a file with one chunk per line
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Diagnose configuration and connectivity
    Doctor,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Insert or replace a user
    Add {
        #[arg(long)]
        id: String,

        #[arg(long)]
        tenant: String,

        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config_path).await?,
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Migrate => commands::migrate::run(config_path).await?,
        Commands::Token { user, ttl } => commands::token::run(config_path, &user, ttl).await?,
        Commands::User {
            command: UserCommands::Add { id, tenant, role },
        } => commands::user::add(config_path, &id, &tenant, &role).await?,
        Commands::Index { file } => commands::index::run(config_path, &file).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
