//! # SDNViz - Topology lifecycle and state-synthesis engine
//!
//! This library is the backend core of an SDN network visualizer. It
//! orchestrates an emulated network (switches, hosts, links) and polls a
//! separate SDN controller, exposing a unified, deduplicated topology
//! graph and live traffic statistics to observers.
//!
//! ## Overview
//!
//! Two external systems are driven through typed gateways and otherwise
//! treated as black boxes: the network **emulator**, which instantiates
//! virtual switches/hosts/links and executes connectivity probes, and
//! the **controller**, which exposes discovery (switches/links/hosts)
//! and statistics over a REST API. The engine turns abstract topology
//! requests into running emulated networks, reduces the controller's
//! raw discovery data (duplicate hosts, bidirectional link reports)
//! into a canonical graph, and pushes graph/stat snapshots to
//! subscribers on a fixed cadence.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Type-safe configuration structures and YAML parsing
//! - `topology`: Declarative topology model and closed-form builders
//! - `controller`: Typed gateway to the controller's discovery and
//!   statistics endpoints
//! - `emulator`: Typed gateway driving the emulator worker process
//! - `lifecycle`: Network session state machine with forced cleanup
//! - `synthesis`: Raw discovery snapshot to canonical graph reduction
//! - `stats`: Traffic rollups and the periodic stats monitor
//! - `broadcast`: Snapshot fan-out to subscribers
//! - `service`: Facade the transport shim mounts on
//!
//! ## Error Handling
//!
//! Typed `thiserror` enums live next to the modules that raise them;
//! the binary uses `color_eyre` at the top level. Controller failures
//! are treated as transient: polling paths degrade to well-formed empty
//! snapshots instead of erroring, while emulator failures force the
//! session back to idle before propagating.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sdnviz::broadcast::SubscriptionBroadcaster;
//! use sdnviz::config::Config;
//! use sdnviz::controller::{ControllerGateway, RestControllerGateway};
//! use sdnviz::emulator::ProcessEmulatorGateway;
//! use sdnviz::lifecycle::NetworkLifecycleManager;
//! use sdnviz::service::Service;
//! use sdnviz::stats::StatsMonitor;
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let config = Config::default();
//! let controller: Arc<dyn ControllerGateway> =
//!     Arc::new(RestControllerGateway::new(&config.controller)?);
//! let emulator = Arc::new(ProcessEmulatorGateway::new(config.emulator.clone())?);
//! let broadcaster = SubscriptionBroadcaster::new();
//! let monitor = Arc::new(StatsMonitor::new(
//!     Arc::clone(&controller),
//!     broadcaster.clone(),
//!     config.stats.update_interval,
//! ));
//! let lifecycle = Arc::new(NetworkLifecycleManager::new(
//!     emulator,
//!     monitor,
//!     config.topology.bounds(),
//!     config.topology.settle_wait,
//! ));
//! let service = Service::new(lifecycle, controller, broadcaster);
//!
//! service.create_topology("star", 4).await?;
//! let graph = service.current_graph().await;
//! println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod controller;
pub mod emulator;
pub mod lifecycle;
pub mod service;
pub mod stats;
pub mod synthesis;
pub mod topology;
