//! Scheduler running one independent timer per feed
//!
//! Every feed gets its own task owning its [`FeedPoller`]. A feed's failing
//! tick is logged and the feed simply waits for its next tick; other feeds
//! never notice.

use crate::config::FeedsConfig;
use crate::feed::FeedPoller;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Drives every feed's poller on a fixed interval until shutdown
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    pollers: Vec<FeedPoller>,
    period: Duration,
}

impl Scheduler {
    /// Creates a scheduler for explicit pollers
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Shared tick machinery
    /// * `pollers` - One poller per feed
    /// * `period` - Time between two ticks of the same feed
    pub fn new(pipeline: Arc<Pipeline>, pollers: Vec<FeedPoller>, period: Duration) -> Self {
        Self {
            pipeline,
            pollers,
            period,
        }
    }

    /// Creates one poller per configured feed
    pub fn from_config(pipeline: Arc<Pipeline>, feeds: &FeedsConfig) -> Self {
        let pollers = feeds
            .urls
            .iter()
            .enumerate()
            .map(|(idx, url)| FeedPoller::new(idx, url.clone(), feeds.backdate_window()))
            .collect();

        Self::new(pipeline, pollers, feeds.poll_interval())
    }

    pub fn feed_count(&self) -> usize {
        self.pollers.len()
    }

    /// Runs until `shutdown` flips to `true` (or its sender is dropped)
    ///
    /// Shutdown is only observed between ticks, so a tick that has started
    /// always finishes, including its dedup writes. Returns once every feed
    /// task has stopped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::with_capacity(self.pollers.len());

        for poller in self.pollers {
            tracing::info!(
                feed = poller.index(),
                "Scheduling job for {} every {}s",
                poller.feed_url(),
                self.period.as_secs()
            );
            handles.push(tokio::spawn(run_feed(
                Arc::clone(&self.pipeline),
                poller,
                self.period,
                shutdown.clone(),
            )));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Feed task ended abnormally: {}", e);
            }
        }

        tracing::info!("All feed jobs stopped");
    }
}

async fn run_feed(
    pipeline: Arc<Pipeline>,
    mut poller: FeedPoller,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let feed = poller.index();
    // tokio panics on a zero period
    let mut timer = interval(period.max(Duration::from_millis(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }

            _ = timer.tick() => {}
        }

        match pipeline.run_tick(&mut poller).await {
            Ok(report) if report.candidates > 0 => {
                tracing::debug!(feed, "Tick report: {:?}", report);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(feed, "Run failed for {}: {}", poller.feed_url(), e);
            }
        }
    }

    tracing::info!(feed, "Stopped job for {}", poller.feed_url());
}
