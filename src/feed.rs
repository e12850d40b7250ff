//! Fan-out of rate updates to any number of listeners.

use chrono::{DateTime, Utc};
use futures::Stream;
use rust_decimal::Decimal;
use std::fmt::Display;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    Internet,
    Cached,
}

impl Display for RateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateOrigin::Internet => "internet",
                RateOrigin::Cached => "cached",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateUpdate {
    pub value: Decimal,
    pub origin: RateOrigin,
    pub observed_at: DateTime<Utc>,
}

/// Broadcast channel for rate updates. Clones publish into the same channel.
#[derive(Clone)]
pub struct RateFeed {
    sender: Sender<RateUpdate>,
}

impl RateFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, update: RateUpdate) {
        // no listeners is fine
        match self.sender.send(update) {
            Ok(listeners) => debug!(listeners, "Published rate update"),
            Err(_) => debug!("Rate update published with no listeners"),
        }
    }

    pub fn subscribe(&self) -> Receiver<RateUpdate> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Updates as an async stream. Lagging listeners skip what they missed.
    pub fn stream(&self) -> impl Stream<Item = RateUpdate> + use<> {
        futures::stream::unfold(self.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(update) => return Some((update, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Rate listener lagged behind");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}

impl Default for RateFeed {
    fn default() -> Self {
        Self::new()
    }
}
