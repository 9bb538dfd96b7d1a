//! Controller gateway module.
//!
//! Typed request/response access to the SDN controller's discovery and
//! statistics endpoints. Pure translation and error surfacing; the
//! gateway holds no topology state of its own.

pub mod rest;
pub mod types;

use async_trait::async_trait;

// Re-export key types for easier access
pub use rest::RestControllerGateway;
pub use types::{
    Dpid, HostAttachment, HostRecord, LinkRecord, PortCounters, RawDiscoverySnapshot, SwitchRecord,
};

/// Errors surfaced by a controller gateway.
///
/// Both variants are treated as transient by consumers: synthesis and
/// stats aggregation degrade to empty results instead of failing the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("controller unreachable: {0}")]
    Unreachable(String),

    #[error("unexpected controller response: {0}")]
    Decode(String),
}

/// Typed client for the controller's discovery and statistics API.
///
/// All calls are idempotent reads with a bounded timeout.
#[async_trait]
pub trait ControllerGateway: Send + Sync {
    /// Switches currently connected to the controller
    async fn list_switches(&self) -> Result<Vec<SwitchRecord>, ControllerError>;

    /// Directed switch-to-switch link reports (each physical link
    /// usually appears twice, once per direction)
    async fn list_links(&self) -> Result<Vec<LinkRecord>, ControllerError>;

    /// Hosts learned by the controller, duplicates included
    async fn list_hosts(&self) -> Result<Vec<HostRecord>, ControllerError>;

    /// Port-level traffic counters for one switch
    async fn port_stats(&self, dpid: Dpid) -> Result<Vec<PortCounters>, ControllerError>;

    /// Raw flow table entries for one switch (read-only detail view)
    async fn flow_stats(&self, dpid: Dpid) -> Result<Vec<serde_json::Value>, ControllerError>;

    /// Whether the controller answers discovery requests at all
    async fn is_reachable(&self) -> bool {
        self.list_switches().await.is_ok()
    }

    /// Fetch one complete discovery snapshot (switches, links, hosts)
    async fn discovery_snapshot(&self) -> Result<RawDiscoverySnapshot, ControllerError> {
        let switches = self.list_switches().await?;
        let links = self.list_links().await?;
        let hosts = self.list_hosts().await?;
        Ok(RawDiscoverySnapshot {
            switches,
            links,
            hosts,
        })
    }
}
