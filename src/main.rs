//! Skyposter main entry point
//!
//! Command-line interface for the feed-to-Bluesky relay.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use skyposter::config::{Config, StartArgs, DEFAULT_DATABASE_PATH};
use skyposter::storage::{open_storage, SharedStorage, StorageError};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Skyposter: relays syndication feeds to Bluesky
///
/// Polls every configured feed on its own timer and posts entries that have
/// not been posted before. Every setting can be given as a flag or through the
/// environment (and a `.env` file, if present).
#[derive(Parser, Debug)]
#[command(name = "skyposter")]
#[command(version)]
#[command(about = "Relays syndication feeds to Bluesky", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start polling feeds and posting new entries
    Start(StartArgs),

    /// Inspect or edit the record of posted URLs
    #[command(subcommand)]
    Database(DatabaseCommand),
}

#[derive(Subcommand, Debug)]
enum DatabaseCommand {
    /// Mark URLs as already posted so they are never published
    InsertPosts(UrlsArgs),

    /// Forget URLs so they may be published again
    RemovePosts(UrlsArgs),

    /// Print every recorded URL, oldest first
    List(DatabaseArgs),
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    /// Path of the posted-URL database
    #[arg(long, env = "DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    database_path: PathBuf,
}

#[derive(Args, Debug)]
struct UrlsArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Comma-separated list of URLs
    #[arg(required = true, value_delimiter = ',')]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Start(args) => {
            let config = match args.into_config() {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            };
            handle_start(config).await
        }
        Command::Database(DatabaseCommand::InsertPosts(args)) => handle_insert_posts(args),
        Command::Database(DatabaseCommand::RemovePosts(args)) => handle_remove_posts(args),
        Command::Database(DatabaseCommand::List(args)) => handle_list(args),
    }
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("skyposter=info,warn"),
                1 => EnvFilter::new("skyposter=debug,info"),
                2 => EnvFilter::new("skyposter=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the relay until Ctrl-C
async fn handle_start(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting up");
    tracing::debug!("Configuration: {:?}", config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested; waiting for running jobs to finish"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        // Fails only when the scheduler is already gone
        let _ = shutdown_tx.send(true);
    });

    skyposter::pipeline::relay(config, shutdown_rx)
        .await
        .context("running the relay")?;
    tracing::info!("Shut down cleanly");

    Ok(())
}

/// Handles `database insert-posts`
fn handle_insert_posts(args: UrlsArgs) -> anyhow::Result<()> {
    let store = open_database(&args.database)?;

    for url in normalize_args(&args.urls) {
        match store.add(url) {
            Ok(()) => println!("Inserted {}", url),
            Err(StorageError::DuplicateKey(_)) => println!("Already present: {}", url),
            Err(e) => return Err(e).with_context(|| format!("inserting {}", url)),
        }
    }

    Ok(())
}

/// Handles `database remove-posts`
fn handle_remove_posts(args: UrlsArgs) -> anyhow::Result<()> {
    let store = open_database(&args.database)?;

    for url in normalize_args(&args.urls) {
        if store.remove(url)? {
            println!("Removed {}", url);
        } else {
            println!("Not present: {}", url);
        }
    }

    Ok(())
}

/// Handles `database list`
fn handle_list(args: DatabaseArgs) -> anyhow::Result<()> {
    let store = open_database(&args)?;

    for url in store.list()? {
        println!("{}", url);
    }
    tracing::info!("{} URLs recorded", store.count()?);

    Ok(())
}

fn open_database(args: &DatabaseArgs) -> anyhow::Result<SharedStorage> {
    let storage = open_storage(&args.database_path)
        .with_context(|| format!("opening {}", args.database_path.display()))?;
    Ok(SharedStorage::new(storage))
}

/// Trims arguments and drops empty ones
fn normalize_args(urls: &[String]) -> impl Iterator<Item = &str> {
    urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty())
}
