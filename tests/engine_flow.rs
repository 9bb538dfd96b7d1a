//! End-to-end exercise of the engine against in-memory gateways:
//! create a topology, poll the graph, probe connectivity, replace the
//! topology, and stop.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sdnviz::broadcast::{SubscriptionBroadcaster, Update};
use sdnviz::controller::{
    ControllerError, ControllerGateway, Dpid, HostAttachment, HostRecord, LinkRecord,
    PortCounters, SwitchRecord,
};
use sdnviz::emulator::{EmulatorError, EmulatorGateway, EmulatorHandle, EmulatorSession};
use sdnviz::lifecycle::NetworkLifecycleManager;
use sdnviz::service::Service;
use sdnviz::stats::StatsMonitor;
use sdnviz::topology::{SizeBounds, TopologySpec};

/// Controller fake reporting a two-switch network with the usual
/// discovery artifacts: the inter-switch link appears in both
/// directions and one host is learned twice.
struct ScriptedController;

#[async_trait]
impl ControllerGateway for ScriptedController {
    async fn list_switches(&self) -> Result<Vec<SwitchRecord>, ControllerError> {
        Ok(vec![
            SwitchRecord { dpid: Dpid::new(1) },
            SwitchRecord { dpid: Dpid::new(2) },
        ])
    }

    async fn list_links(&self) -> Result<Vec<LinkRecord>, ControllerError> {
        Ok(vec![
            LinkRecord {
                src_dpid: Dpid::new(1),
                src_port: 2,
                dst_dpid: Dpid::new(2),
                dst_port: 1,
            },
            LinkRecord {
                src_dpid: Dpid::new(2),
                src_port: 1,
                dst_dpid: Dpid::new(1),
                dst_port: 2,
            },
        ])
    }

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, ControllerError> {
        let host = |mac: &str, ip: &str, dpid: u64| HostRecord {
            mac: mac.to_string(),
            ipv4: vec![ip.to_string()],
            attached: Some(HostAttachment {
                dpid: Dpid::new(dpid),
                port_no: 1,
            }),
        };
        Ok(vec![
            host("00:00:00:00:00:01", "10.0.0.1", 1),
            // Same host re-learned on the other switch
            host("00:00:00:00:00:01", "10.0.0.1", 2),
            host("00:00:00:00:00:02", "10.0.0.2", 2),
        ])
    }

    async fn port_stats(&self, _dpid: Dpid) -> Result<Vec<PortCounters>, ControllerError> {
        Ok(vec![PortCounters {
            port_no: 1,
            rx_packets: 5,
            tx_packets: 5,
            rx_bytes: 500,
            tx_bytes: 500,
        }])
    }

    async fn flow_stats(&self, _dpid: Dpid) -> Result<Vec<serde_json::Value>, ControllerError> {
        Ok(vec![])
    }
}

/// Emulator fake counting live sessions
struct CountingEmulator {
    active_sessions: Arc<AtomicUsize>,
}

struct CountingSession {
    active_sessions: Arc<AtomicUsize>,
    hosts: Vec<String>,
    alive: bool,
}

#[async_trait]
impl EmulatorSession for CountingSession {
    async fn ping_all(&mut self) -> Result<f64, EmulatorError> {
        Ok(0.0)
    }

    async fn ping(&mut self, src: &str, dst: &str) -> Result<f64, EmulatorError> {
        for id in [src, dst] {
            if !self.hosts.iter().any(|h| h == id) {
                return Err(EmulatorError::HostNotFound(id.to_string()));
            }
        }
        Ok(10.0)
    }

    async fn shutdown(&mut self) -> Result<(), EmulatorError> {
        if self.alive {
            self.alive = false;
            self.active_sessions.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl EmulatorGateway for CountingEmulator {
    async fn build_and_start(&self, spec: &TopologySpec) -> Result<EmulatorHandle, EmulatorError> {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            active_sessions: Arc::clone(&self.active_sessions),
            hosts: spec.host_ids(),
            alive: true,
        }))
    }
}

fn engine() -> (Service, Arc<AtomicUsize>) {
    let active_sessions = Arc::new(AtomicUsize::new(0));
    let controller: Arc<dyn ControllerGateway> = Arc::new(ScriptedController);
    let broadcaster = SubscriptionBroadcaster::new();
    let monitor = Arc::new(StatsMonitor::new(
        Arc::clone(&controller),
        broadcaster.clone(),
        Duration::from_millis(20),
    ));
    let lifecycle = Arc::new(NetworkLifecycleManager::new(
        Arc::new(CountingEmulator {
            active_sessions: Arc::clone(&active_sessions),
        }),
        monitor,
        SizeBounds { min: 2, max: 20 },
        Duration::ZERO,
    ));
    let service = Service::new(lifecycle, controller, broadcaster);
    (service, active_sessions)
}

#[tokio::test]
async fn test_full_lifecycle_flow() {
    let (service, active_sessions) = engine();
    let mut rx = service.subscribe();

    // Create: counts come from the built spec
    let created = service.create_topology("star", 4).await.unwrap();
    assert_eq!(created.switches, 1);
    assert_eq!(created.hosts, 4);
    assert_eq!(created.links, 4);
    assert_eq!(active_sessions.load(Ordering::SeqCst), 1);

    // A topology update was pushed right after create
    let pushed = loop {
        match rx.recv().await.unwrap() {
            Update::TopologyUpdate(graph) => break graph,
            Update::StatsUpdate(_) => continue,
        }
    };
    // Discovery artifacts collapsed: 2 switches, 2 unique hosts, 1
    // canonical trunk link + 2 host links
    assert_eq!(pushed.switch_count, 2);
    assert_eq!(pushed.host_count, 2);
    assert_eq!(pushed.link_count, 3);

    // On-demand poll matches the pushed snapshot shape
    let graph = service.current_graph().await;
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(graph.edges.len(), 3);
    assert!(graph.error.is_none());

    // The stats monitor publishes rollups while running
    let stats = loop {
        match rx.recv().await.unwrap() {
            Update::StatsUpdate(snapshot) => break snapshot,
            Update::TopologyUpdate(_) => continue,
        }
    };
    // Two switches, one port each, rx+tx on both figures
    assert_eq!(stats.total_packets, 20);
    assert_eq!(stats.total_bytes, 2000);

    // Probes work against the active session
    assert_eq!(service.run_ping_all().await.unwrap().loss_percent, 0.0);
    assert_eq!(
        service.run_ping("h1", "h4").await.unwrap().loss_percent,
        10.0
    );
    assert!(service.run_ping("h1", "h9").await.is_err());

    // Replace: still exactly one live emulator session
    let replaced = service.create_topology("linear", 3).await.unwrap();
    assert_eq!(replaced.switches, 3);
    assert_eq!(active_sessions.load(Ordering::SeqCst), 1);

    // Stop: session torn down, cleared graph pushed, second stop is a
    // no-op success
    let stopped = service.stop_topology().await;
    assert!(stopped.was_active);
    assert_eq!(active_sessions.load(Ordering::SeqCst), 0);

    let stopped_again = service.stop_topology().await;
    assert!(!stopped_again.was_active);

    let info = service.network_info().await;
    assert!(!info.active);
    assert!(info.hosts.is_empty());
}

#[tokio::test]
async fn test_probes_rejected_before_create() {
    let (service, _active_sessions) = engine();

    assert!(service.run_ping_all().await.is_err());
    assert!(service.run_ping("h1", "h2").await.is_err());
}

#[tokio::test]
async fn test_health_with_live_controller() {
    let (service, _active_sessions) = engine();

    let health = service.health().await;
    assert!(health.controller_reachable);
    assert!(!health.network_active);

    service.create_topology("mesh", 3).await.unwrap();
    let health = service.health().await;
    assert!(health.network_active);

    service.stop_topology().await;
}
