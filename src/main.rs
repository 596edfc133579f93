//! RedditStats - live subreddit statistics
//!
//! A CLI tool that polls a subreddit's newest posts and keeps a running
//! top-N ranking by upvotes and a post count per author.
//!
//! Exit codes:
//!   0 - Ran for the configured duration (or until Ctrl-C)
//!   1 - Startup error (missing credentials, invalid config, ...)

mod cli;
mod config;
mod error;
mod models;
mod source;
mod stats;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use source::{Credentials, RedditClient};
use stats::{summary_text, LogReporter, StatsTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed flags
    let dotenv_path = dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (mut config, config_path) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("RedditStats v{}", env!("CARGO_PKG_VERSION"));
    match dotenv_path {
        Some(path) => debug!("Loaded environment from {}", path.display()),
        None => debug!("No .env file found"),
    }
    match config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    // Run the tracker
    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .redditstats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the subreddit, polling interval and run duration.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Track the configured subreddit until the run duration elapses or Ctrl-C.
async fn run(args: Args, config: Config) -> Result<()> {
    // Configuration errors are fatal before anything starts
    config.validate()?;
    let credentials = Credentials::from_lookup(|key| args.credential(key))?;

    let client = RedditClient::new(credentials, config.reddit_config())
        .context("Failed to create Reddit client")?;

    let subreddit = config.subreddit().to_string();
    let run_duration = config.run_duration();

    let mut tracker = StatsTracker::new(
        config.tracker_config(),
        Arc::new(client),
        Arc::new(LogReporter::new(subreddit.clone())),
    );

    println!("📡 Tracking r/{}", subreddit);
    println!(
        "   Polling every {}s for {}s (Ctrl-C to stop early)",
        config.tracker.poll_interval_seconds,
        run_duration.as_secs()
    );
    info!("Tracking stats for {}s...", run_duration.as_secs());

    let deadline = Instant::now() + run_duration;
    let snapshot = tracker
        .run_until(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    info!("Run duration elapsed, shutting down");
                }
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => warn!("Interrupted, shutting down"),
                    Err(e) => {
                        warn!("Cannot listen for Ctrl-C: {}", e);
                        tokio::time::sleep_until(deadline).await;
                    }
                },
            }
        })
        .await?;

    println!("\n📊 r/{} summary:", subreddit);
    println!("{}", summary_text(&snapshot, 10));
    println!("\n✅ Done.");

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Returns the path the config came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(DEFAULT_CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
