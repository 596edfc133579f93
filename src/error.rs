//! Error types.
//!
//! Fetch errors are transient and only ever logged by the poller.
//! Configuration errors are fatal at startup. Tracker errors cover
//! misuse of the start/stop lifecycle.

use thiserror::Error;

/// Failure while fetching a batch of posts from a source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The subreddit name was empty.
    #[error("subreddit name must not be empty")]
    InvalidSubreddit,

    /// The transport failed (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The OAuth token endpoint refused the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API answered 429.
    #[error("rate limited by the API (reset in {reset_secs:?}s)")]
    RateLimited { reset_secs: Option<u64> },

    /// Any other non-success status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded as a listing.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Invalid or missing startup configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required credential {0} (set it in the environment or .env)")]
    MissingCredential(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Misuse of the tracker lifecycle.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker already started")]
    AlreadyStarted,

    #[error("{task} task failed: {source}")]
    TaskFailed {
        task: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
