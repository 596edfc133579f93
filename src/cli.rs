//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and the credential lookup.

use crate::source::reddit::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_PASSWORD, ENV_USERNAME};
use clap::Parser;
use std::path::PathBuf;

/// RedditStats - live subreddit statistics
///
/// Polls a subreddit's newest posts and keeps a running top-N ranking
/// by upvotes and a post count per author, logging both after every
/// post. Credentials are read from the environment or a .env file.
///
/// Examples:
///   redditstats
///   redditstats --subreddit rust --duration 300
///   redditstats -s golang --poll-interval 30 --top 5 -v
///   redditstats --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subreddit to track (without r/)
    ///
    /// Defaults to the config file value, or "golang".
    #[arg(short, long, value_name = "NAME", env = "REDDIT_SUBREDDIT")]
    pub subreddit: Option<String>,

    /// Seconds between two fetches
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Seconds to run before shutting down
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Number of posts kept in the ranking
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,

    /// Posts requested per fetch (1-100)
    #[arg(long, value_name = "N")]
    pub limit: Option<u32>,

    /// User-Agent sent to the Reddit API
    #[arg(long, value_name = "UA", env = "REDDIT_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .redditstats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Reddit app client id
    #[arg(long, env = "REDDIT_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Reddit app client secret
    #[arg(long, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Reddit account username
    #[arg(long, env = "REDDIT_USERNAME", hide_env_values = true)]
    pub username: Option<String>,

    /// Reddit account password
    #[arg(long, env = "REDDIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .redditstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref subreddit) = self.subreddit {
            if subreddit.trim().is_empty() {
                return Err("Subreddit must not be empty".to_string());
            }
        }

        if self.poll_interval == Some(0) {
            return Err("Poll interval must be at least 1 second".to_string());
        }

        if self.duration == Some(0) {
            return Err("Duration must be at least 1 second".to_string());
        }

        if self.top == Some(0) {
            return Err("Top must be at least 1".to_string());
        }

        if let Some(limit) = self.limit {
            if !(1..=100).contains(&limit) {
                return Err("Limit must be between 1 and 100".to_string());
            }
        }

        Ok(())
    }

    /// Credential value for an environment variable name, if given.
    ///
    /// Flags and environment are merged by clap, so this covers both.
    pub fn credential(&self, key: &str) -> Option<String> {
        match key {
            ENV_CLIENT_ID => self.client_id.clone(),
            ENV_CLIENT_SECRET => self.client_secret.clone(),
            ENV_USERNAME => self.username.clone(),
            ENV_PASSWORD => self.password.clone(),
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
