//! Crownwell CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Create the config directory and a default config file
//! - `config`   — Validate, show, or locate the configuration
//! - `models`   — List the selectable chat models
//! - `chat`     — Interactive or single-message streaming chat
//! - `records`  — Browse and edit RCA 8D reports and work orders

use clap::{Parser, Subcommand};

mod commands;
mod presentation;

#[derive(Parser)]
#[command(
    name = "crownwell",
    about = "Crownwell — streaming quality-assistant chat client",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the available chat models
    Models,

    /// Chat with the quality assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Model id or label (e.g. gpt-5.1, Fast)
        #[arg(long)]
        model: Option<String>,

        /// Print only the finished answer instead of streaming it
        #[arg(long)]
        plain: bool,
    },

    /// Browse and edit quality records
    Records {
        #[command(subcommand)]
        action: RecordsAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the configuration file and environment
    Validate,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Subcommand)]
enum RecordsAction {
    /// List one page of records, newest first
    List {
        /// Record kind: rca or wo
        kind: String,

        /// Free-text search over the kind's search fields
        #[arg(short, long)]
        search: Option<String>,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show a single record
    Show {
        kind: String,
        id: i64,
    },

    /// Apply a partial update given as a JSON object
    Patch {
        kind: String,
        id: i64,
        /// e.g. '{"status": "closed"}'
        changes: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
        Commands::Models => commands::models::run().await?,
        Commands::Chat {
            message,
            model,
            plain,
        } => commands::chat::run(message, model, plain).await?,
        Commands::Records { action } => match action {
            RecordsAction::List { kind, search, page } => {
                commands::records::list(&kind, search, page).await?
            }
            RecordsAction::Show { kind, id } => commands::records::show(&kind, id).await?,
            RecordsAction::Patch { kind, id, changes } => {
                commands::records::patch(&kind, id, &changes).await?
            }
        },
    }

    Ok(())
}
