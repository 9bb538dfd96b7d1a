use clap::Parser;
use color_eyre::eyre::bail;
use color_eyre::Result;
use env_logger::Env;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use sdnviz::broadcast::{SubscriptionBroadcaster, Update};
use sdnviz::config::{self, Config};
use sdnviz::controller::{ControllerGateway, RestControllerGateway};
use sdnviz::emulator::ProcessEmulatorGateway;
use sdnviz::lifecycle::NetworkLifecycleManager;
use sdnviz::service::Service;
use sdnviz::stats::StatsMonitor;

/// Topology lifecycle and state-synthesis engine for emulated SDN networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the engine configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the controller base URL from the configuration
    #[arg(long)]
    controller_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting SDNViz engine");

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    if let Some(url) = args.controller_url {
        config.controller.base_url = url;
    }
    config.validate()?;

    // Wire the engine together
    let controller: Arc<dyn ControllerGateway> =
        Arc::new(RestControllerGateway::new(&config.controller)?);
    let emulator = Arc::new(ProcessEmulatorGateway::new(config.emulator.clone())?);
    let broadcaster = SubscriptionBroadcaster::new();
    let monitor = Arc::new(StatsMonitor::new(
        Arc::clone(&controller),
        broadcaster.clone(),
        config.stats.update_interval,
    ));
    let lifecycle = Arc::new(NetworkLifecycleManager::new(
        emulator,
        monitor,
        config.topology.bounds(),
        config.topology.settle_wait,
    ));
    let service = Service::new(lifecycle, Arc::clone(&controller), broadcaster);

    // Refuse to start without a reachable controller
    if !controller.is_reachable().await {
        error!(
            "Cannot connect to the controller at {}",
            config.controller.base_url
        );
        error!("Make sure the controller's REST API is up before starting the engine");
        bail!("controller unreachable at {}", config.controller.base_url);
    }

    info!("Controller: {}", config.controller.base_url);
    info!(
        "Topology bounds: {}-{} (default: {} of size {})",
        config.topology.min_size,
        config.topology.max_size,
        config.topology.default_kind,
        config.topology.default_size
    );
    info!("Stats interval: {:?}", config.stats.update_interval);

    spawn_update_logger(&service);

    info!("Engine ready; waiting for shutdown signal (Ctrl-C)");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    let result = service.stop_topology().await;
    if result.was_active {
        info!("Stopped active network session");
    }

    Ok(())
}

/// Log pushed updates so a bare engine run shows the publish cadence
fn spawn_update_logger(service: &Service) {
    let mut rx = service.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Update::TopologyUpdate(graph)) => debug!(
                    "Pushed topology update: {} nodes, {} edges",
                    graph.nodes.len(),
                    graph.edges.len()
                ),
                Ok(Update::StatsUpdate(snapshot)) => debug!(
                    "Pushed stats update: {} packets, {} bytes",
                    snapshot.total_packets, snapshot.total_bytes
                ),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Update logger lagged by {} messages", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(&["sdnviz", "--config", "engine.yaml"]);

        assert_eq!(args.config, Some(PathBuf::from("engine.yaml")));
        assert_eq!(args.controller_url, None);
    }

    #[test]
    fn test_controller_override() {
        let args = Args::parse_from(&[
            "sdnviz",
            "--controller-url",
            "http://192.168.1.10:8080",
        ]);

        assert!(args.config.is_none());
        assert_eq!(
            args.controller_url,
            Some("http://192.168.1.10:8080".to_string())
        );
    }
}
