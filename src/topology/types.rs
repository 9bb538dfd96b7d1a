//! Topology type definitions.
//!
//! This file contains the declarative, emulator-agnostic description of
//! an emulated network: the topology kind requested by a client and the
//! concrete switch/host/link specification generated from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::builder::SpecError;

/// Kind of network topology to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// Star topology: one central switch, all hosts attached to it
    Star,
    /// Linear topology: switches in a chain, one host per switch
    Linear,
    /// Binary tree of switches, hosts attached to leaf switches
    Tree,
    /// Full mesh: every switch pair linked, one host per switch
    Mesh,
}

impl TopologyKind {
    /// All supported kinds, for error messages and request validation
    pub const ALL: [TopologyKind; 4] = [
        TopologyKind::Star,
        TopologyKind::Linear,
        TopologyKind::Tree,
        TopologyKind::Mesh,
    ];

    /// Get the string representation of the topology kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Star => "star",
            TopologyKind::Linear => "linear",
            TopologyKind::Tree => "tree",
            TopologyKind::Mesh => "mesh",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyKind {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "star" => Ok(TopologyKind::Star),
            "linear" => Ok(TopologyKind::Linear),
            "tree" => Ok(TopologyKind::Tree),
            "mesh" => Ok(TopologyKind::Mesh),
            other => Err(SpecError::InvalidKind(other.to_string())),
        }
    }
}

/// A switch in a topology specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSpec {
    /// Switch identifier, e.g. "s1"
    pub id: String,
}

/// A host in a topology specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    /// Host identifier, e.g. "h1"
    pub id: String,
    /// IPv4 address assigned to the host, e.g. "10.0.0.1"
    pub ip: String,
}

/// An undirected link between two named endpoints (hosts or switches)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
}

impl LinkSpec {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        LinkSpec {
            a: a.into(),
            b: b.into(),
        }
    }
}

/// Complete declarative specification of an emulated network.
///
/// Immutable once built; owned by the lifecycle manager for the duration
/// of one session and handed to the emulator gateway as the build input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    pub kind: TopologyKind,
    /// The size originally requested (before any clamping)
    pub size: u32,
    pub switches: Vec<SwitchSpec>,
    pub hosts: Vec<HostSpec>,
    pub links: Vec<LinkSpec>,
}

impl TopologySpec {
    /// Returns true if `id` names a host in this specification
    pub fn has_host(&self, id: &str) -> bool {
        self.hosts.iter().any(|h| h.id == id)
    }

    /// Host identifiers in declaration order
    pub fn host_ids(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.id.clone()).collect()
    }

    /// Switch identifiers in declaration order
    pub fn switch_ids(&self) -> Vec<String> {
        self.switches.iter().map(|s| s.id.clone()).collect()
    }
}
