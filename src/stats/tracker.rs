//! Polling and aggregation loops.
//!
//! The poller fetches a batch of posts every tick and hands each post to
//! the aggregator over a bounded channel. A full channel blocks the
//! poller, so a slow aggregator slows down polling instead of growing a
//! queue. The aggregator is the only writer of [`StatsState`]; it takes
//! the state lock for the whole update-and-report step of each post.

use crate::error::TrackerError;
use crate::models::{Post, StatsSnapshot};
use crate::source::PostSource;
use crate::stats::ranking::{AuthorTally, TopPosts, DEFAULT_TOP_N};
use crate::stats::report::Reporter;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Settings for a [`StatsTracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Subreddit to poll, without the `r/` prefix.
    pub subreddit: String,
    /// Time between fetches. The first fetch happens one interval after start.
    pub poll_interval: Duration,
    /// Number of posts kept in the ranking.
    pub top_n: usize,
    /// Posts that may wait in the handoff channel before the poller blocks.
    pub channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            subreddit: "golang".to_string(),
            poll_interval: Duration::from_secs(10),
            top_n: DEFAULT_TOP_N,
            channel_capacity: 1,
        }
    }
}

/// Ranking and tally, plus a running count of processed posts.
#[derive(Debug, Clone)]
pub struct StatsState {
    top_posts: TopPosts,
    authors: AuthorTally,
    processed: u64,
}

impl StatsState {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_posts: TopPosts::new(top_n),
            authors: AuthorTally::new(),
            processed: 0,
        }
    }

    /// Count the author, then rank the post.
    ///
    /// Posts without an author are tallied under the empty string.
    pub fn ingest(&mut self, post: Post) {
        self.authors.record(&post.author);
        self.top_posts.insert(post);
        self.processed += 1;
    }

    pub fn top_posts(&self) -> &TopPosts {
        &self.top_posts
    }

    pub fn authors(&self) -> &AuthorTally {
        &self.authors
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            top_posts: self.top_posts.posts().to_vec(),
            authors: self.authors.sorted(),
            processed: self.processed,
            taken_at: Utc::now(),
        }
    }
}

enum Lifecycle {
    Idle,
    Running {
        shutdown_tx: watch::Sender<bool>,
        poller: JoinHandle<()>,
        aggregator: JoinHandle<()>,
    },
    Stopped,
}

/// Tracks the top posts and most active authors of one subreddit.
pub struct StatsTracker {
    config: TrackerConfig,
    source: Arc<dyn PostSource>,
    reporter: Arc<dyn Reporter>,
    state: Arc<Mutex<StatsState>>,
    lifecycle: Lifecycle,
}

impl StatsTracker {
    pub fn new(
        mut config: TrackerConfig,
        source: Arc<dyn PostSource>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        config.top_n = config.top_n.max(1);
        config.channel_capacity = config.channel_capacity.max(1);

        let state = Arc::new(Mutex::new(StatsState::new(config.top_n)));

        Self {
            config,
            source,
            reporter,
            state,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Spawn the poller and aggregator tasks and return immediately.
    ///
    /// A tracker runs once: starting it again, even after `stop`, fails.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if !matches!(self.lifecycle, Lifecycle::Idle) {
            return Err(TrackerError::AlreadyStarted);
        }

        let (post_tx, post_rx) = mpsc::channel(self.config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poller = tokio::spawn(poll_posts(
            self.source.clone(),
            self.config.subreddit.clone(),
            self.config.poll_interval,
            post_tx,
            shutdown_rx,
        ));
        let aggregator = tokio::spawn(aggregate_posts(
            post_rx,
            self.state.clone(),
            self.reporter.clone(),
        ));

        info!(
            "Tracking r/{} (every {:?}, top {})",
            self.config.subreddit,
            self.config.poll_interval,
            self.config.top_n
        );

        self.lifecycle = Lifecycle::Running {
            shutdown_tx,
            poller,
            aggregator,
        };

        Ok(())
    }

    /// Stop polling, let the aggregator drain what is already queued and
    /// wait for both tasks to finish.
    ///
    /// Calling this before `start` or more than once does nothing.
    pub async fn stop(&mut self) -> Result<(), TrackerError> {
        let (shutdown_tx, poller, aggregator) =
            match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running {
                    shutdown_tx,
                    poller,
                    aggregator,
                } => (shutdown_tx, poller, aggregator),
                Lifecycle::Idle => {
                    self.lifecycle = Lifecycle::Idle;
                    return Ok(());
                }
                Lifecycle::Stopped => return Ok(()),
            };

        // The poller owns the only sender: once it exits the channel closes.
        let _ = shutdown_tx.send(true);

        // Await both before reporting, so a failed poller never leaves the
        // aggregator running.
        let polled = poller.await;
        let aggregated = aggregator.await;

        polled.map_err(|source| TrackerError::TaskFailed {
            task: "poller",
            source,
        })?;
        aggregated.map_err(|source| TrackerError::TaskFailed {
            task: "aggregator",
            source,
        })?;

        info!("Stopped tracking r/{}", self.config.subreddit);
        Ok(())
    }

    /// Start, run until `shutdown` resolves, stop, and return the final state.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<StatsSnapshot, TrackerError>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        shutdown.await;
        self.stop().await?;
        Ok(self.snapshot().await)
    }

    /// Current state, read under the same lock the aggregator writes with.
    pub async fn snapshot(&self) -> StatsSnapshot {
        self.state.lock().await.snapshot()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Running { .. })
    }
}

/// Fetch on every tick and forward each post, in order, to the aggregator.
///
/// Fetch errors are logged and the next tick proceeds as usual. Returns
/// when shutdown is signaled (or its sender is gone) or the aggregator
/// has hung up; either way `posts` is dropped on return.
pub(crate) async fn poll_posts(
    source: Arc<dyn PostSource>,
    subreddit: String,
    period: Duration,
    posts: mpsc::Sender<Post>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let batch = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = source.fetch(&subreddit) => result,
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                error!("Error fetching posts from r/{}: {}", subreddit, e);
                continue;
            }
        };

        debug!("Fetched {} posts from r/{}", batch.len(), subreddit);

        for post in batch {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                sent = posts.send(post) => {
                    if sent.is_err() {
                        debug!("Aggregator gone, stopping poller");
                        return;
                    }
                }
            }
        }
    }

    debug!("Poller for r/{} stopped", subreddit);
}

/// Apply every received post to `state` and report, until the channel closes.
pub(crate) async fn aggregate_posts(
    mut posts: mpsc::Receiver<Post>,
    state: Arc<Mutex<StatsState>>,
    reporter: Arc<dyn Reporter>,
) {
    while let Some(post) = posts.recv().await {
        let mut guard = state.lock().await;
        guard.ingest(post);
        reporter.report(&guard);
    }

    debug!("Post channel closed, aggregator stopped");
}
