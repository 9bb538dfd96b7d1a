//! Snapshot fan-out.
//!
//! Publish side of the subscriber contract: synthesized topology graphs
//! and stat snapshots are pushed to every current subscriber, with no
//! per-subscriber filtering. Slow subscribers lag and drop; zero
//! subscribers is not an error.

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::stats::StatsSnapshot;
use crate::synthesis::TopologyGraph;

/// Buffered updates per subscriber before lagging sets in
const CHANNEL_CAPACITY: usize = 64;

/// A snapshot pushed to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Update {
    TopologyUpdate(TopologyGraph),
    StatsUpdate(StatsSnapshot),
}

/// Fan-out of graph/stat snapshots to connected observers
#[derive(Debug, Clone)]
pub struct SubscriptionBroadcaster {
    tx: broadcast::Sender<Update>,
}

impl SubscriptionBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Register a new observer
    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish_topology(&self, graph: TopologyGraph) {
        self.publish(Update::TopologyUpdate(graph));
    }

    pub fn publish_stats(&self, snapshot: StatsSnapshot) {
        self.publish(Update::StatsUpdate(snapshot));
    }

    fn publish(&self, update: Update) {
        match self.tx.send(update) {
            Ok(delivered) => debug!("Published update to {} subscriber(s)", delivered),
            Err(_) => debug!("Published update with no subscribers"),
        }
    }
}

impl Default for SubscriptionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
