//! Data models for the stats tracker.
//!
//! This module contains the post item produced by a source and the
//! snapshot type handed to reporters and callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single post as seen in a subreddit listing.
///
/// Posts are never mutated after a source produces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post title.
    #[serde(default)]
    pub title: String,
    /// Username of the author. Deleted accounts show up as `[deleted]`.
    #[serde(default)]
    pub author: String,
    /// Net upvotes.
    #[serde(default)]
    pub score: i64,
}

#[cfg(test)]
impl Post {
    pub fn new(title: impl Into<String>, author: impl Into<String>, score: i64) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            score,
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - Upvotes: {}", self.title, self.score)
    }
}

/// Post count for one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub posts: u64,
}

/// A consistent copy of the tracker state, taken under its lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Top posts, highest score first.
    pub top_posts: Vec<Post>,
    /// Per-author counts, sorted by author.
    pub authors: Vec<AuthorCount>,
    /// Number of posts processed since start.
    pub processed: u64,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
impl StatsSnapshot {
    /// Post count for `author`, or 0 if never seen.
    pub fn posts_by(&self, author: &str) -> u64 {
        self.authors
            .iter()
            .find(|a| a.author == author)
            .map(|a| a.posts)
            .unwrap_or(0)
    }

    /// Scores of the ranked posts, in rank order.
    pub fn scores(&self) -> Vec<i64> {
        self.top_posts.iter().map(|p| p.score).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_display() {
        let post = Post::new("Hello", "user1", 42);
        assert_eq!(post.to_string(), "Hello - Upvotes: 42");
    }

    #[test]
    fn test_post_missing_fields_default() {
        let post: Post = serde_json::from_str(r#"{"title": "Only a title"}"#).unwrap();
        assert_eq!(post.title, "Only a title");
        assert_eq!(post.author, "");
        assert_eq!(post.score, 0);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = StatsSnapshot {
            top_posts: vec![Post::new("A", "user1", 100), Post::new("B", "user2", 50)],
            authors: vec![
                AuthorCount {
                    author: "user1".to_string(),
                    posts: 3,
                },
                AuthorCount {
                    author: "user2".to_string(),
                    posts: 1,
                },
            ],
            processed: 4,
            taken_at: Utc::now(),
        };

        assert_eq!(snapshot.posts_by("user1"), 3);
        assert_eq!(snapshot.posts_by("nobody"), 0);
        assert_eq!(snapshot.scores(), vec![100, 50]);
    }
}
