//! Bindery CLI - database migrations and data repair tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bindery-cli migrate
//!
//! # Repair malformed stored book URLs
//! bindery-cli repair book-urls
//! bindery-cli repair book-urls --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `repair book-urls` - Normalize stored content/cover URLs

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bindery-cli")]
#[command(author, version, about = "Bindery CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Data repair tools
    Repair {
        #[command(subcommand)]
        target: RepairTarget,
    },
}

#[derive(Subcommand)]
enum RepairTarget {
    /// Normalize stored book URLs: strip stray `.pdf` suffixes from content
    /// URLs and replace sentinel placeholder cover URLs
    BookUrls {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Cover URL written over placeholder sentinels
        #[arg(long)]
        default_cover: Option<String>,
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
        Commands::Repair { target } => match target {
            RepairTarget::BookUrls {
                dry_run,
                default_cover,
            } => {
                commands::repair::book_urls(dry_run, default_cover.as_deref()).await?;
            }
        },
    }
    Ok(())
}
