//! Reporting of tracker state.
//!
//! The tracker calls a [`Reporter`] after every processed post while it
//! still holds the state lock, so each report is a consistent view.

use crate::models::StatsSnapshot;
use crate::stats::tracker::StatsState;
use tracing::info;

/// Receives the state after each processed post.
///
/// Called with the state lock held: implementations must not block, and
/// should copy only what they keep.
pub trait Reporter: Send + Sync {
    fn report(&self, state: &StatsState);
}

/// Emits the state as structured `tracing` records.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    subreddit: String,
}

impl LogReporter {
    pub fn new(subreddit: impl Into<String>) -> Self {
        Self {
            subreddit: subreddit.into(),
        }
    }
}

impl Reporter for LogReporter {
    fn report(&self, state: &StatsState) {
        let top = state.top_posts();
        info!(
            subreddit = %self.subreddit,
            processed = state.processed(),
            "Top {} posts by upvotes:",
            top.len()
        );
        for (rank, post) in top.posts().iter().enumerate() {
            info!(rank = rank + 1, score = post.score, title = %post.title, "{}", post);
        }

        let authors = state.authors();
        info!(
            subreddit = %self.subreddit,
            authors = authors.len(),
            "Users by post count:"
        );
        for entry in authors.sorted() {
            info!(
                author = %entry.author,
                posts = entry.posts,
                "{} - Posts: {}",
                entry.author,
                entry.posts
            );
        }
    }
}

/// Plain-text summary of a snapshot, for the end-of-run printout.
pub fn summary_text(snapshot: &StatsSnapshot, max_authors: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Posts processed: {}", snapshot.processed));
    lines.push(format!(
        "Snapshot taken: {}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    lines.push(String::new());
    lines.push("Top posts:".to_string());
    if snapshot.top_posts.is_empty() {
        lines.push("   (none)".to_string());
    }
    for (rank, post) in snapshot.top_posts.iter().enumerate() {
        lines.push(format!("{:>3}. [{}] {}", rank + 1, post.score, post.title));
    }

    if !snapshot.authors.is_empty() {
        let mut authors = snapshot.authors.clone();
        authors.sort_by_key(|a| std::cmp::Reverse(a.posts));

        lines.push(String::new());
        lines.push(format!("Most active authors ({} total):", authors.len()));
        for entry in authors.iter().take(max_authors) {
            lines.push(format!("   {} - {} posts", entry.author, entry.posts));
        }
    }

    lines.join("\n")
}
