//! Controller-facing type definitions.
//!
//! Typed records for the controller's discovery and statistics
//! endpoints, and the opaque datapath identifier used everywhere outside
//! the response-decoding boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Datapath identifier uniquely naming a switch in the controller's
/// view.
///
/// The controller renders dpids as 16-digit hex strings; parsing happens
/// once at the gateway's decode boundary and the rest of the engine
/// treats the value as an opaque comparable identifier. Displays as the
/// decimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dpid(u64);

impl Dpid {
    pub fn new(raw: u64) -> Self {
        Dpid(raw)
    }

    /// Parse the controller's hex rendering, e.g. "0000000000000001"
    pub fn from_hex(s: &str) -> Option<Dpid> {
        u64::from_str_radix(s, 16).ok().map(Dpid)
    }

    /// Parse a client-supplied identifier: decimal digits as-is,
    /// anything else as hex
    pub fn parse(s: &str) -> Option<Dpid> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u64>().ok().map(Dpid)
        } else {
            Dpid::from_hex(s)
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A switch reported by the controller's discovery endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub dpid: Dpid,
}

/// A directed switch-to-switch link report.
///
/// The controller typically reports each physical link twice, once per
/// direction; canonicalization happens during graph synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub src_dpid: Dpid,
    pub src_port: u32,
    pub dst_dpid: Dpid,
    pub dst_port: u32,
}

/// Where a discovered host attaches to the switch fabric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttachment {
    pub dpid: Dpid,
    pub port_no: u32,
}

/// A host learned by the controller.
///
/// The same MAC may be reported multiple times (e.g. re-learned on a
/// different port); deduplication happens during graph synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub mac: String,
    pub ipv4: Vec<String>,
    pub attached: Option<HostAttachment>,
}

/// Port-level traffic counters as maintained by the controller.
///
/// Counters are monotonic on the controller side; this engine never
/// accumulates deltas of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCounters {
    pub port_no: u32,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One poll's worth of raw discovery data, consumed by graph synthesis
/// and discarded. Never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDiscoverySnapshot {
    pub switches: Vec<SwitchRecord>,
    pub links: Vec<LinkRecord>,
    pub hosts: Vec<HostRecord>,
}
