//! Traffic statistics.
//!
//! Full recomputation of traffic rollups from the controller's port
//! counters, and the periodic monitor task that publishes them while a
//! network session is running. No delta state is kept between polls;
//! the counters are monotonic on the controller side.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::broadcast::SubscriptionBroadcaster;
use crate::controller::{ControllerError, ControllerGateway, PortCounters};

/// One full statistics rollup, recomputed per poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Per-switch port counters, keyed by decimal dpid
    pub per_port: BTreeMap<String, Vec<PortCounters>>,
    pub total_packets: u64,
    pub total_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

/// Sum rx+tx packets and bytes across every port of every switch,
/// retaining the raw breakdown for detail views
pub fn aggregate(per_port: BTreeMap<String, Vec<PortCounters>>) -> StatsSnapshot {
    let mut total_packets = 0u64;
    let mut total_bytes = 0u64;

    for counters in per_port.values() {
        for port in counters {
            total_packets += port.rx_packets + port.tx_packets;
            total_bytes += port.rx_bytes + port.tx_bytes;
        }
    }

    StatsSnapshot {
        per_port,
        total_packets,
        total_bytes,
        timestamp: Utc::now(),
    }
}

/// Fetch port counters for every discovered switch and aggregate them.
///
/// Any controller failure aborts the whole collection; the caller skips
/// the tick and tries again on the next one.
pub async fn collect(controller: &dyn ControllerGateway) -> Result<StatsSnapshot, ControllerError> {
    let switches = controller.list_switches().await?;

    let mut per_port = BTreeMap::new();
    for switch in switches {
        let counters = controller.port_stats(switch.dpid).await?;
        per_port.insert(switch.dpid.to_string(), counters);
    }

    Ok(aggregate(per_port))
}

struct MonitorWorker {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Periodic statistics monitor.
///
/// Started when a network session transitions to running, stopped when
/// the session is stopped; no polling happens while no network is
/// active. The stop signal is honored between ticks, never mid-request.
pub struct StatsMonitor {
    controller: Arc<dyn ControllerGateway>,
    broadcaster: SubscriptionBroadcaster,
    poll_interval: Duration,
    worker: Mutex<Option<MonitorWorker>>,
}

impl StatsMonitor {
    pub fn new(
        controller: Arc<dyn ControllerGateway>,
        broadcaster: SubscriptionBroadcaster,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            broadcaster,
            poll_interval,
            worker: Mutex::new(None),
        }
    }

    /// Start the periodic poll loop. A second start while running is a
    /// no-op.
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            debug!("Stats monitor already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let controller = Arc::clone(&self.controller);
        let broadcaster = self.broadcaster.clone();
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match collect(controller.as_ref()).await {
                            Ok(snapshot) => broadcaster.publish_stats(snapshot),
                            Err(e) => warn!("Stats poll failed, skipping tick: {}", e),
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        info!("Started stats monitor ({:?} interval)", poll_interval);
        *worker = Some(MonitorWorker { stop_tx, task });
    }

    /// Stop the poll loop and wait for the in-flight tick, if any, to
    /// finish
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(w) = worker.take() {
            let _ = w.stop_tx.send(true);
            let _ = w.task.await;
            info!("Stopped stats monitor");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }
}
