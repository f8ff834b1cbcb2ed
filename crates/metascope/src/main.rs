//! Metascope CLI - media metadata and GPS extraction.
//!
//! Metascope reads images, audio, video and documents, lists the metadata
//! stored in their containers and decodes EXIF GPS tags into coordinates
//! with a map link.
//!
//! # Usage
//!
//! ```bash
//! # Extract a single file
//! metascope extract photo.jpg
//!
//! # Extract a directory as JSON lines and package the text reports
//! metascope extract ./media/ --format jsonl --output reports.jsonl --export all_metadata.zip
//!
//! # List supported containers
//! metascope formats
//!
//! # View configuration
//! metascope config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Metascope - extract human-readable metadata and GPS coordinates from media files.
#[derive(Parser, Debug)]
#[command(name = "metascope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract metadata and GPS coordinates from files or directories
    Extract(cli::extract::ExtractArgs),

    /// List supported container formats in detection order
    Formats,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln
    let config = match metascope_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `metascope config path`."
            );
            metascope_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Metascope v{}", metascope_core::VERSION);

    match cli.command {
        Commands::Extract(args) => cli::extract::execute(args, config).await,
        Commands::Formats => cli::formats::execute(),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
