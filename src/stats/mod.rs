//! Subreddit statistics.
//!
//! This module provides the ranking and tally aggregates, the reporting
//! hook, and the tracker that drives them from a post source.

pub mod ranking;
pub mod report;
pub mod tracker;

pub use report::{summary_text, LogReporter};
pub use tracker::{StatsTracker, TrackerConfig};
