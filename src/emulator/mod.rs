//! Emulator gateway module.
//!
//! Typed command interface to the external network emulator. A session
//! is built from a [`TopologySpec`](crate::topology::TopologySpec),
//! probed for connectivity, and torn down; the handle owns the emulator
//! process/session for its whole lifetime.
//!
//! The process-backed implementation drives an emulator worker over a
//! line protocol:
//!
//! - the worker is spawned with the topology spec (JSON file) as its
//!   last argument and prints `READY` once the network is up;
//! - commands `pingall`, `ping <src> <dst>` and `exit` are written to
//!   its stdin, one per line;
//! - probe output is relayed verbatim, terminated by a `DONE` line; the
//!   packet-loss figure is taken from the emulator's `% dropped`
//!   results line;
//! - failures are reported as `ERROR <message>` lines.

pub mod process;

use async_trait::async_trait;

use crate::topology::TopologySpec;

pub use process::ProcessEmulatorGateway;

/// Errors surfaced by an emulator gateway
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("failed to build emulated network: {0}")]
    Build(String),

    #[error("failed to tear down emulated network: {0}")]
    Teardown(String),

    #[error("connectivity probe failed: {0}")]
    Probe(String),

    #[error("host not found: {0}")]
    HostNotFound(String),
}

/// A running emulated network.
///
/// Exclusively owned by the lifecycle manager; dropped (after
/// [`shutdown`](EmulatorSession::shutdown)) when the session returns to
/// idle.
#[async_trait]
pub trait EmulatorSession: Send {
    /// All-pairs reachability probe; returns aggregate packet-loss
    /// percentage
    async fn ping_all(&mut self) -> Result<f64, EmulatorError>;

    /// Point-to-point probe between two hosts; returns packet-loss
    /// percentage. Fails with [`EmulatorError::HostNotFound`] when an
    /// endpoint id is unknown to the emulator.
    async fn ping(&mut self, src: &str, dst: &str) -> Result<f64, EmulatorError>;

    /// Tear the session down. Idempotent: calling it on an
    /// already-stopped session succeeds trivially.
    async fn shutdown(&mut self) -> Result<(), EmulatorError>;
}

impl std::fmt::Debug for dyn EmulatorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn EmulatorSession")
    }
}

/// Opaque handle to a running emulated network
pub type EmulatorHandle = Box<dyn EmulatorSession>;

/// Builder of emulator sessions
#[async_trait]
pub trait EmulatorGateway: Send + Sync {
    /// Instantiate the given specification as a running emulated
    /// network. On failure the gateway cleans up any partial state
    /// before returning.
    async fn build_and_start(&self, spec: &TopologySpec) -> Result<EmulatorHandle, EmulatorError>;
}
