//! Configuration file handling.
//!
//! This module handles loading `.redditstats.toml` and merging it with
//! command-line arguments. Credentials never live in this file; they
//! come from the environment (see [`crate::source::Credentials`]).

use crate::error::ConfigError;
use crate::source::reddit::MAX_FETCH_LIMIT;
use crate::source::RedditConfig;
use crate::stats::TrackerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".redditstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Reddit API settings.
    #[serde(default)]
    pub reddit: RedditSettings,

    /// Polling and ranking settings.
    #[serde(default)]
    pub tracker: TrackerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Reddit API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSettings {
    /// Subreddit to track, without the `r/` prefix.
    #[serde(default = "default_subreddit")]
    pub subreddit: String,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Posts requested per poll (max 100).
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            user_agent: default_user_agent(),
            fetch_limit: default_fetch_limit(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_subreddit() -> String {
    "golang".to_string()
}

fn default_user_agent() -> String {
    RedditConfig::default().user_agent
}

fn default_fetch_limit() -> u32 {
    MAX_FETCH_LIMIT
}

fn default_timeout() -> u64 {
    30
}

/// Polling and ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Seconds between two fetches.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// How long to run before shutting down.
    #[serde(default = "default_run_duration")]
    pub run_duration_seconds: u64,

    /// Number of posts kept in the ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Posts buffered between poller and aggregator.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            run_duration_seconds: default_run_duration(),
            top_n: default_top_n(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_run_duration() -> u64 {
    60
}

fn default_top_n() -> usize {
    10
}

fn default_channel_capacity() -> usize {
    1
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref subreddit) = args.subreddit {
            self.reddit.subreddit = subreddit.clone();
        }
        if let Some(ref user_agent) = args.user_agent {
            self.reddit.user_agent = user_agent.clone();
        }
        if let Some(limit) = args.limit {
            self.reddit.fetch_limit = limit;
        }
        if let Some(interval) = args.poll_interval {
            self.tracker.poll_interval_seconds = interval;
        }
        if let Some(duration) = args.duration {
            self.tracker.run_duration_seconds = duration;
        }
        if let Some(top) = args.top {
            self.tracker.top_n = top;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the merged settings before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let subreddit = self.subreddit();
        if subreddit.is_empty() {
            return Err(ConfigError::Invalid("subreddit must not be empty".to_string()));
        }
        if subreddit.contains('/') || subreddit.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "subreddit name '{}' must not contain '/' or spaces",
                subreddit
            )));
        }
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user agent must not be empty".to_string()));
        }
        if !(1..=MAX_FETCH_LIMIT).contains(&self.reddit.fetch_limit) {
            return Err(ConfigError::Invalid(format!(
                "fetch limit must be between 1 and {}",
                MAX_FETCH_LIMIT
            )));
        }
        if self.reddit.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".to_string()));
        }
        if self.tracker.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "poll interval must be at least 1 second".to_string(),
            ));
        }
        if self.tracker.run_duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "run duration must be at least 1 second".to_string(),
            ));
        }
        if self.tracker.top_n == 0 {
            return Err(ConfigError::Invalid("top must be at least 1".to_string()));
        }
        if self.tracker.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Subreddit without an optional `r/` prefix.
    pub fn subreddit(&self) -> &str {
        let name = self.reddit.subreddit.trim();
        name.strip_prefix("r/").unwrap_or(name)
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.tracker.run_duration_seconds)
    }

    pub fn reddit_config(&self) -> RedditConfig {
        RedditConfig {
            user_agent: self.reddit.user_agent.clone(),
            fetch_limit: self.reddit.fetch_limit,
            timeout_seconds: self.reddit.timeout_seconds,
            ..RedditConfig::default()
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            subreddit: self.subreddit().to_string(),
            poll_interval: Duration::from_secs(self.tracker.poll_interval_seconds),
            top_n: self.tracker.top_n,
            channel_capacity: self.tracker.channel_capacity,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reddit.subreddit, "golang");
        assert_eq!(config.reddit.fetch_limit, 100);
        assert_eq!(config.tracker.poll_interval_seconds, 10);
        assert_eq!(config.tracker.run_duration_seconds, 60);
        assert_eq!(config.tracker.top_n, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[reddit]
subreddit = "rust"
fetch_limit = 50

[tracker]
poll_interval_seconds = 30
top_n = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.reddit.subreddit, "rust");
        assert_eq!(config.reddit.fetch_limit, 50);
        assert_eq!(config.reddit.timeout_seconds, 30);
        assert_eq!(config.tracker.poll_interval_seconds, 30);
        assert_eq!(config.tracker.run_duration_seconds, 60);
        assert_eq!(config.tracker.top_n, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tracker]\nrun_duration_seconds = 120").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.run_duration(), Duration::from_secs(120));
        assert_eq!(config.reddit.subreddit, "golang");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tracker\ntop_n = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config: Config = toml::from_str("[tracker]\ntop_n = 3\npoll_interval_seconds = 5").unwrap();
        let args = Args {
            subreddit: Some("r/rust".to_string()),
            duration: Some(30),
            ..Args::default()
        };

        config.merge_with_args(&args);
        assert_eq!(config.subreddit(), "rust");
        assert_eq!(config.tracker.top_n, 3);
        assert_eq!(config.tracker.poll_interval_seconds, 5);
        assert_eq!(config.tracker.run_duration_seconds, 30);

        let tracker = config.tracker_config();
        assert_eq!(tracker.subreddit, "rust");
        assert_eq!(tracker.poll_interval, Duration::from_secs(5));
        assert_eq!(tracker.top_n, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.reddit.subreddit = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reddit.subreddit = "go lang".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reddit.fetch_limit = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tracker.poll_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tracker.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reddit_config_from_settings() {
        let mut config = Config::default();
        config.reddit.user_agent = "test-agent/0.1".to_string();
        config.reddit.fetch_limit = 25;

        let reddit = config.reddit_config();
        assert_eq!(reddit.user_agent, "test-agent/0.1");
        assert_eq!(reddit.fetch_limit, 25);
        assert!(reddit.api_url.starts_with("https://"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[reddit]"));
        assert!(toml_str.contains("[tracker]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tracker.top_n, 10);
    }
}
