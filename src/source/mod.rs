//! Post sources.
//!
//! A source returns the posts currently visible in a subreddit. Calls
//! may fail transiently; the tracker logs the error and tries again on
//! the next tick.

pub mod reddit;

pub use reddit::{Credentials, RedditClient, RedditConfig};

use crate::error::FetchError;
use crate::models::Post;
use futures::future::BoxFuture;

/// Something that can fetch the current batch of posts for a subreddit.
///
/// Successive calls usually overlap: the same post can appear in two
/// batches and will then be counted twice downstream.
pub trait PostSource: Send + Sync {
    fn fetch<'a>(&'a self, subreddit: &'a str) -> BoxFuture<'a, Result<Vec<Post>, FetchError>>;
}
