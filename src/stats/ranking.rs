//! Top-N ranking and per-author tally.
//!
//! Both aggregates are plain in-memory structures; locking is the
//! tracker's job.

use crate::models::{AuthorCount, Post};
use std::collections::HashMap;

/// Default number of posts kept in the ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// Bounded ranking of posts, highest score first.
///
/// Ties keep arrival order: `Vec::sort_by` is stable, so a post that
/// arrived earlier stays ahead of a later post with the same score.
#[derive(Debug, Clone)]
pub struct TopPosts {
    capacity: usize,
    posts: Vec<Post>,
}

impl TopPosts {
    /// Creates an empty ranking holding at most `capacity` posts.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            posts: Vec::with_capacity(capacity + 1),
        }
    }

    /// Append a post, re-sort and drop whatever falls past the capacity.
    pub fn insert(&mut self, post: Post) {
        self.posts.push(post);
        self.normalize();
    }

    /// Stable sort by descending score, then truncate.
    pub fn normalize(&mut self) {
        self.posts.sort_by(|a, b| b.score.cmp(&a.score));
        self.posts.truncate(self.capacity);
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }
}

impl Default for TopPosts {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

/// Running post count per author. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct AuthorTally {
    counts: HashMap<String, u64>,
}

impl AuthorTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more post for `author`, returning the new total.
    pub fn record(&mut self, author: &str) -> u64 {
        let count = self.counts.entry(author.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    #[cfg(test)]
    pub fn get(&self, author: &str) -> u64 {
        self.counts.get(author).copied().unwrap_or(0)
    }

    /// Number of distinct authors seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// All counts, sorted by author for deterministic output.
    pub fn sorted(&self) -> Vec<AuthorCount> {
        let mut authors: Vec<AuthorCount> = self
            .counts
            .iter()
            .map(|(author, posts)| AuthorCount {
                author: author.clone(),
                posts: *posts,
            })
            .collect();

        authors.sort_by(|a, b| a.author.cmp(&b.author));
        authors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, score: i64) -> Post {
        Post::new(title, "someone", score)
    }

    #[test]
    fn test_two_posts_ranked_by_score() {
        let mut top = TopPosts::default();
        top.insert(post("Post B", 50));
        top.insert(post("Post A", 100));

        let titles: Vec<&str> = top.posts().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post A", "Post B"]);
    }

    #[test]
    fn test_eleventh_post_evicts_lowest() {
        let mut top = TopPosts::default();
        for score in 1..=11 {
            top.insert(post(&format!("Post {}", score), score));
        }

        assert_eq!(top.len(), 10);
        let scores: Vec<i64> = top.posts().iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    }

    #[test]
    fn test_exactly_capacity_keeps_all_reversed() {
        let mut top = TopPosts::new(5);
        for score in 1..=5 {
            top.insert(post("p", score));
        }

        let scores: Vec<i64> = top.posts().iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut top = TopPosts::new(3);
        top.insert(post("first", 10));
        top.insert(post("second", 10));
        top.insert(post("higher", 20));
        top.insert(post("third", 10));

        let titles: Vec<&str> = top.posts().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["higher", "first", "second"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut top = TopPosts::new(4);
        for score in [3, 9, 1, 7, 5, 9] {
            top.insert(post("p", score));
        }

        let before = top.posts().to_vec();
        top.normalize();
        assert_eq!(top.posts(), before.as_slice());
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut top = TopPosts::new(3);
        for (i, score) in [5, -2, 8, 0, 8, 3, 11].into_iter().enumerate() {
            top.insert(post("p", score));
            assert_eq!(top.len(), (i + 1).min(3));
            assert!(top.posts().windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_tally_counts_per_author() {
        let mut tally = AuthorTally::new();
        assert_eq!(tally.record("user1"), 1);
        assert_eq!(tally.record("user2"), 1);
        assert_eq!(tally.record("user1"), 2);

        assert_eq!(tally.get("user1"), 2);
        assert_eq!(tally.get("user2"), 1);
        assert_eq!(tally.get("user3"), 0);
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn test_tally_sorted_by_author() {
        let mut tally = AuthorTally::new();
        for author in ["carol", "alice", "bob", "carol", "bob", "carol", ""] {
            tally.record(author);
        }

        let names: Vec<String> = tally.sorted().into_iter().map(|a| a.author).collect();
        assert_eq!(names, vec!["", "alice", "bob", "carol"]);
        assert_eq!(tally.get("carol"), 3);
        assert_eq!(tally.get(""), 1);
    }
}
