//! Graph synthesis.
//!
//! Reduces one raw discovery snapshot from the controller into the
//! canonical deduplicated topology graph consumed by observers. The
//! controller reports artifacts this pass must collapse: every physical
//! switch link shows up twice (once per direction) and the same host can
//! be learned on several ports.

use serde::Serialize;
use std::collections::HashSet;

use crate::controller::{Dpid, RawDiscoverySnapshot};
use crate::topology::TopologyKind;

/// Node classification in the canonical graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Switch,
    Host,
}

/// Edge classification in the canonical graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    #[serde(rename = "host-switch")]
    HostSwitch,
    #[serde(rename = "switch-switch")]
    SwitchSwitch,
}

/// A node in the canonical graph.
///
/// Switch ids derive from the dpid ("s1", "s2", ...); host ids are MAC
/// addresses, the only globally unique host key the discovery source
/// provides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpid: Option<Dpid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<String>,
}

/// A canonical edge: switch-switch links are undirected-unique
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u32>,
}

/// Canonical deduplicated topology graph plus summary counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub switch_count: usize,
    pub host_count: usize,
    pub link_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology_kind: Option<TopologyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TopologyGraph {
    /// Empty graph with no annotations (e.g. after a topology is
    /// stopped)
    pub fn empty() -> Self {
        TopologyGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            switch_count: 0,
            host_count: 0,
            link_count: 0,
            topology_kind: None,
            error: None,
        }
    }

    /// Well-formed but explicitly degraded snapshot, used when the
    /// controller cannot be polled. Observers get an update either way.
    pub fn degraded(kind: Option<TopologyKind>, error: impl Into<String>) -> Self {
        TopologyGraph {
            topology_kind: kind,
            error: Some(error.into()),
            ..TopologyGraph::empty()
        }
    }
}

fn switch_node_id(dpid: Dpid) -> String {
    format!("s{}", dpid)
}

/// Human-readable fallback label for a host without an IPv4 address:
/// the last 8 characters of its MAC
fn mac_suffix(mac: &str) -> String {
    match mac.char_indices().rev().nth(7) {
        Some((idx, _)) => mac[idx..].to_string(),
        None => mac.to_string(),
    }
}

/// Synthesize the canonical graph from one discovery snapshot.
///
/// Pure and deterministic: identical input yields an identical graph,
/// and a switch link fed in either direction collapses onto the same
/// canonical edge.
pub fn synthesize(snapshot: &RawDiscoverySnapshot, kind: Option<TopologyKind>) -> TopologyGraph {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    // Switch nodes, one per reported dpid
    let known_switches: HashSet<Dpid> = snapshot.switches.iter().map(|s| s.dpid).collect();
    for switch in &snapshot.switches {
        let id = switch_node_id(switch.dpid);
        nodes.push(GraphNode {
            name: id.clone(),
            id,
            kind: NodeKind::Switch,
            dpid: Some(switch.dpid),
            mac: None,
            ip: None,
            connected_to: None,
        });
    }
    let switch_count = known_switches.len();

    // Host nodes, deduplicated by MAC in snapshot order; the first
    // reported attachment wins
    let mut seen_macs: HashSet<&str> = HashSet::new();
    let mut host_count = 0usize;
    for host in &snapshot.hosts {
        if !seen_macs.insert(host.mac.as_str()) {
            continue;
        }
        host_count += 1;

        let ip = host.ipv4.first().cloned();
        let name = ip.clone().unwrap_or_else(|| mac_suffix(&host.mac));

        // Attachment edge only when the reported switch is known;
        // unattached hosts still appear as nodes
        let connected_to = host
            .attached
            .as_ref()
            .filter(|a| known_switches.contains(&a.dpid))
            .map(|a| switch_node_id(a.dpid));

        nodes.push(GraphNode {
            id: host.mac.clone(),
            name,
            kind: NodeKind::Host,
            dpid: None,
            mac: Some(host.mac.clone()),
            ip,
            connected_to: connected_to.clone(),
        });

        if let Some(target) = connected_to {
            edges.push(GraphEdge {
                source: host.mac.clone(),
                target,
                kind: EdgeKind::HostSwitch,
                src_port: None,
                dst_port: None,
            });
        }
    }

    // Switch-switch links: canonical key is the endpoint pair in sorted
    // order, so a link and its reverse report collapse to one edge
    let mut seen_links: HashSet<(Dpid, Dpid)> = HashSet::new();
    for link in &snapshot.links {
        let key = if link.src_dpid <= link.dst_dpid {
            (link.src_dpid, link.dst_dpid)
        } else {
            (link.dst_dpid, link.src_dpid)
        };
        if !seen_links.insert(key) {
            continue;
        }

        edges.push(GraphEdge {
            source: switch_node_id(link.src_dpid),
            target: switch_node_id(link.dst_dpid),
            kind: EdgeKind::SwitchSwitch,
            src_port: Some(link.src_port),
            dst_port: Some(link.dst_port),
        });
    }

    let link_count = edges.len();
    TopologyGraph {
        nodes,
        edges,
        switch_count,
        host_count,
        link_count,
        topology_kind: kind,
        error: None,
    }
}
