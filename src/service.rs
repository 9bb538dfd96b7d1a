//! Engine facade.
//!
//! The operation surface the transport shim mounts on: topology
//! lifecycle requests, on-demand graph polls, connectivity probes, and
//! the health/detail views. Controller failures never escape as errors
//! from the polling paths; observers receive well-formed degraded
//! snapshots instead.

use log::warn;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::broadcast::{SubscriptionBroadcaster, Update};
use crate::controller::{ControllerError, ControllerGateway, Dpid, PortCounters};
use crate::lifecycle::{
    ConnectivityResult, LifecycleError, NetworkInfo, NetworkLifecycleManager, SessionInfo,
    SessionState, StopResult,
};
use crate::synthesis::{self, TopologyGraph};

/// Health check summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: String,
    pub controller_reachable: bool,
    pub network_active: bool,
}

/// Controller-side discovery counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerInfo {
    pub connected: bool,
    pub switch_count: usize,
    pub link_count: usize,
    pub host_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Facade wiring the lifecycle manager, controller gateway and
/// broadcaster together
pub struct Service {
    lifecycle: Arc<NetworkLifecycleManager>,
    controller: Arc<dyn ControllerGateway>,
    broadcaster: SubscriptionBroadcaster,
}

impl Service {
    pub fn new(
        lifecycle: Arc<NetworkLifecycleManager>,
        controller: Arc<dyn ControllerGateway>,
        broadcaster: SubscriptionBroadcaster,
    ) -> Self {
        Self {
            lifecycle,
            controller,
            broadcaster,
        }
    }

    /// Register an observer for pushed graph/stat snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.broadcaster.subscribe()
    }

    /// Create a topology from a client request. The kind string is
    /// validated here; size bounds are enforced by the builder.
    pub async fn create_topology(
        &self,
        kind: &str,
        size: u32,
    ) -> Result<SessionInfo, LifecycleError> {
        let kind = kind.parse()?;
        let session_info = self.lifecycle.create(kind, size).await?;

        // Push the freshly discovered graph to all observers
        self.current_graph().await;

        Ok(session_info)
    }

    /// Stop the active topology and push the cleared graph
    pub async fn stop_topology(&self) -> StopResult {
        let result = self.lifecycle.stop().await;
        self.broadcaster.publish_topology(TopologyGraph::empty());
        result
    }

    /// Poll the controller and synthesize the canonical graph.
    ///
    /// Never fails: an unreachable controller yields a degraded empty
    /// graph carrying the error indicator. The result is published to
    /// subscribers as well as returned.
    pub async fn current_graph(&self) -> TopologyGraph {
        let kind = self.lifecycle.active_kind().await;

        let graph = match self.controller.discovery_snapshot().await {
            Ok(snapshot) => synthesis::synthesize(&snapshot, kind),
            Err(e) => {
                warn!("Topology poll failed: {}", e);
                TopologyGraph::degraded(kind, e.to_string())
            }
        };

        self.broadcaster.publish_topology(graph.clone());
        graph
    }

    pub async fn run_ping_all(&self) -> Result<ConnectivityResult, LifecycleError> {
        self.lifecycle.ping_all().await
    }

    pub async fn run_ping(&self, src: &str, dst: &str) -> Result<ConnectivityResult, LifecycleError> {
        self.lifecycle.ping(src, dst).await
    }

    pub async fn network_info(&self) -> NetworkInfo {
        self.lifecycle.info().await
    }

    pub async fn health(&self) -> Health {
        Health {
            status: "healthy".to_string(),
            controller_reachable: self.controller.is_reachable().await,
            network_active: self.lifecycle.state().await == SessionState::Running,
        }
    }

    /// Discovery counts from the controller; degrades rather than fails
    pub async fn controller_info(&self) -> ControllerInfo {
        match self.controller.discovery_snapshot().await {
            Ok(snapshot) => ControllerInfo {
                connected: true,
                switch_count: snapshot.switches.len(),
                link_count: snapshot.links.len(),
                host_count: snapshot.hosts.len(),
                error: None,
            },
            Err(e) => ControllerInfo {
                connected: false,
                switch_count: 0,
                link_count: 0,
                host_count: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Port counters for one switch, for detail views
    pub async fn port_stats(&self, dpid: &str) -> Result<Vec<PortCounters>, ControllerError> {
        let dpid = parse_dpid_param(dpid)?;
        self.controller.port_stats(dpid).await
    }

    /// Raw flow table entries for one switch, for detail views
    pub async fn flow_stats(&self, dpid: &str) -> Result<Vec<serde_json::Value>, ControllerError> {
        let dpid = parse_dpid_param(dpid)?;
        self.controller.flow_stats(dpid).await
    }
}

fn parse_dpid_param(raw: &str) -> Result<Dpid, ControllerError> {
    Dpid::parse(raw)
        .ok_or_else(|| ControllerError::Decode(format!("malformed dpid parameter '{}'", raw)))
}
