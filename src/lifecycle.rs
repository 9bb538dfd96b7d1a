//! Network lifecycle management.
//!
//! Drives the emulated network through its state machine
//! (idle → building → running → stopping → idle) with one exclusively
//! owned session behind a mutex: a create racing a stop serializes, and
//! no failure path can leave the session stuck in building/stopping or
//! leak an emulator handle. The stats monitor is started and stopped
//! here, tied to the running state.

use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::emulator::{EmulatorError, EmulatorGateway, EmulatorHandle};
use crate::stats::StatsMonitor;
use crate::topology::{self, SizeBounds, SpecError, TopologyKind, TopologySpec};

/// Lifecycle states of the emulated network session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Building,
    Running,
    Stopping,
}

/// The single shared mutable session. At most one building/running
/// session exists at a time; the emulator handle is released on every
/// transition back to idle.
struct NetworkSession {
    state: SessionState,
    spec: Option<TopologySpec>,
    handle: Option<EmulatorHandle>,
}

/// Errors raised by lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Emulator(#[from] EmulatorError),

    #[error("no network is running")]
    NotRunning,

    #[error("host not found: {0}")]
    HostNotFound(String),
}

/// Counts of what a create call instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub kind: TopologyKind,
    pub size: u32,
    pub switches: usize,
    pub hosts: usize,
    pub links: usize,
}

/// Outcome of a stop call. Cleanup is unconditional: even when teardown
/// reports an error, the session has returned to idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopResult {
    pub was_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
}

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityResult {
    pub loss_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
}

/// Summary of the current session for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TopologyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    pub switches: Vec<String>,
    pub hosts: Vec<String>,
}

/// Manager of the emulated network's lifecycle
pub struct NetworkLifecycleManager {
    emulator: Arc<dyn EmulatorGateway>,
    monitor: Arc<StatsMonitor>,
    session: Mutex<NetworkSession>,
    bounds: SizeBounds,
    settle_wait: Duration,
}

impl NetworkLifecycleManager {
    pub fn new(
        emulator: Arc<dyn EmulatorGateway>,
        monitor: Arc<StatsMonitor>,
        bounds: SizeBounds,
        settle_wait: Duration,
    ) -> Self {
        Self {
            emulator,
            monitor,
            session: Mutex::new(NetworkSession {
                state: SessionState::Idle,
                spec: None,
                handle: None,
            }),
            bounds,
            settle_wait,
        }
    }

    /// Create a new emulated network, replacing any active session.
    ///
    /// The request is validated before the active session is touched, so
    /// an invalid request never destroys a running network. Any emulator
    /// failure forces cleanup back to idle before the error propagates.
    pub async fn create(&self, kind: TopologyKind, size: u32) -> Result<SessionInfo, LifecycleError> {
        let spec = topology::build(kind, size, &self.bounds)?;

        let mut session = self.session.lock().await;

        if session.state != SessionState::Idle {
            info!("Replacing active session before creating {} topology", kind);
            self.monitor.stop().await;
            if let Some(e) = force_teardown(&mut session).await {
                warn!("Teardown of previous session reported: {}", e);
            }
        }

        session.state = SessionState::Building;
        info!(
            "Creating {} topology (size {}): {} switches, {} hosts, {} links",
            kind,
            size,
            spec.switches.len(),
            spec.hosts.len(),
            spec.links.len()
        );

        let handle = match self.emulator.build_and_start(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Emulator build failed: {}", e);
                force_teardown(&mut session).await;
                return Err(e.into());
            }
        };
        session.handle = Some(handle);

        // Fixed grace period for the new switches to register with the
        // controller; synthesis stays eventually consistent either way
        info!(
            "Waiting {:?} for switches to register with the controller",
            self.settle_wait
        );
        tokio::time::sleep(self.settle_wait).await;

        let session_info = SessionInfo {
            kind,
            size,
            switches: spec.switches.len(),
            hosts: spec.hosts.len(),
            links: spec.links.len(),
        };
        session.spec = Some(spec);
        session.state = SessionState::Running;
        drop(session);

        self.monitor.start().await;
        info!("Session running: {:?}", session_info);

        Ok(session_info)
    }

    /// Stop the active session. Idempotent: succeeds trivially when
    /// idle, and always lands back on idle even when teardown errors.
    pub async fn stop(&self) -> StopResult {
        self.monitor.stop().await;

        let mut session = self.session.lock().await;
        if session.state == SessionState::Idle {
            return StopResult {
                was_active: false,
                teardown_error: None,
            };
        }

        let teardown_error = force_teardown(&mut session).await;
        if let Some(e) = &teardown_error {
            error!("Teardown reported: {}", e);
        }
        info!("Network stopped");

        StopResult {
            was_active: true,
            teardown_error: teardown_error.map(|e| e.to_string()),
        }
    }

    /// All-pairs connectivity probe; valid only while running
    pub async fn ping_all(&self) -> Result<ConnectivityResult, LifecycleError> {
        let mut session = self.session.lock().await;
        if session.state != SessionState::Running {
            return Err(LifecycleError::NotRunning);
        }

        let handle = session.handle.as_mut().ok_or(LifecycleError::NotRunning)?;
        let loss = handle.ping_all().await?;

        Ok(ConnectivityResult {
            loss_percent: loss,
            src: None,
            dst: None,
        })
    }

    /// Point-to-point probe between two hosts of the active session
    pub async fn ping(&self, src: &str, dst: &str) -> Result<ConnectivityResult, LifecycleError> {
        let mut session = self.session.lock().await;
        if session.state != SessionState::Running {
            return Err(LifecycleError::NotRunning);
        }

        // Check endpoints against the active spec before bothering the
        // emulator
        let spec = session.spec.as_ref().ok_or(LifecycleError::NotRunning)?;
        for id in [src, dst] {
            if !spec.has_host(id) {
                return Err(LifecycleError::HostNotFound(id.to_string()));
            }
        }

        let handle = session.handle.as_mut().ok_or(LifecycleError::NotRunning)?;
        match handle.ping(src, dst).await {
            Ok(loss) => Ok(ConnectivityResult {
                loss_percent: loss,
                src: Some(src.to_string()),
                dst: Some(dst.to_string()),
            }),
            Err(EmulatorError::HostNotFound(host)) => Err(LifecycleError::HostNotFound(host)),
            Err(e) => Err(e.into()),
        }
    }

    /// Current session state
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    /// Kind of the active topology, if any; used to annotate
    /// synthesized graphs
    pub async fn active_kind(&self) -> Option<TopologyKind> {
        self.session.lock().await.spec.as_ref().map(|s| s.kind)
    }

    /// Summary of the current session
    pub async fn info(&self) -> NetworkInfo {
        let session = self.session.lock().await;
        match (&session.spec, session.state) {
            (Some(spec), SessionState::Running) => NetworkInfo {
                active: true,
                kind: Some(spec.kind),
                size: Some(spec.size),
                switches: spec.switch_ids(),
                hosts: spec.host_ids(),
            },
            _ => NetworkInfo {
                active: false,
                kind: None,
                size: None,
                switches: Vec::new(),
                hosts: Vec::new(),
            },
        }
    }
}

/// Best-effort teardown that unconditionally returns the session to
/// idle, releasing the emulator handle. Returns the teardown error, if
/// any, for reporting.
async fn force_teardown(session: &mut NetworkSession) -> Option<EmulatorError> {
    session.state = SessionState::Stopping;

    let mut teardown_error = None;
    if let Some(mut handle) = session.handle.take() {
        if let Err(e) = handle.shutdown().await {
            teardown_error = Some(e);
        }
    }

    session.spec = None;
    session.state = SessionState::Idle;
    teardown_error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SubscriptionBroadcaster;
    use crate::controller::{
        ControllerError, ControllerGateway, Dpid, HostRecord, LinkRecord, PortCounters,
        SwitchRecord,
    };
    use crate::emulator::EmulatorSession;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Controller stub for the stats monitor; never consulted by these
    /// tests beyond keeping the monitor alive
    struct NullController;

    #[async_trait]
    impl ControllerGateway for NullController {
        async fn list_switches(&self) -> Result<Vec<SwitchRecord>, ControllerError> {
            Ok(vec![])
        }
        async fn list_links(&self) -> Result<Vec<LinkRecord>, ControllerError> {
            Ok(vec![])
        }
        async fn list_hosts(&self) -> Result<Vec<HostRecord>, ControllerError> {
            Ok(vec![])
        }
        async fn port_stats(&self, _dpid: Dpid) -> Result<Vec<PortCounters>, ControllerError> {
            Ok(vec![])
        }
        async fn flow_stats(&self, _dpid: Dpid) -> Result<Vec<serde_json::Value>, ControllerError> {
            Ok(vec![])
        }
    }

    /// Emulator fake tracking how many sessions are alive; lets the
    /// tests assert that create-always-replaces never leaks a handle
    struct FakeEmulator {
        active_sessions: Arc<AtomicUsize>,
        fail_build: bool,
    }

    struct FakeSession {
        active_sessions: Arc<AtomicUsize>,
        alive: bool,
    }

    #[async_trait]
    impl EmulatorSession for FakeSession {
        async fn ping_all(&mut self) -> Result<f64, EmulatorError> {
            Ok(0.0)
        }

        async fn ping(&mut self, _src: &str, _dst: &str) -> Result<f64, EmulatorError> {
            Ok(25.0)
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
    impl EmulatorGateway for FakeEmulator {
        async fn build_and_start(
            &self,
            _spec: &TopologySpec,
        ) -> Result<EmulatorHandle, EmulatorError> {
            if self.fail_build {
                return Err(EmulatorError::Build("switch creation failed".to_string()));
            }
            self.active_sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                active_sessions: Arc::clone(&self.active_sessions),
                alive: true,
            }))
        }
    }

    fn manager(fail_build: bool) -> (NetworkLifecycleManager, Arc<AtomicUsize>) {
        let active_sessions = Arc::new(AtomicUsize::new(0));
        let emulator = Arc::new(FakeEmulator {
            active_sessions: Arc::clone(&active_sessions),
            fail_build,
        });
        let monitor = Arc::new(StatsMonitor::new(
            Arc::new(NullController),
            SubscriptionBroadcaster::new(),
            Duration::from_secs(60),
        ));
        let mgr = NetworkLifecycleManager::new(
            emulator,
            monitor,
            SizeBounds { min: 2, max: 20 },
            Duration::ZERO,
        );
        (mgr, active_sessions)
    }

    #[tokio::test]
    async fn test_create_reports_counts_and_runs() {
        let (mgr, active) = manager(false);

        let session_info = mgr.create(TopologyKind::Star, 4).await.unwrap();
        assert_eq!(session_info.switches, 1);
        assert_eq!(session_info.hosts, 4);
        assert_eq!(session_info.links, 4);
        assert_eq!(mgr.state().await, SessionState::Running);
        assert_eq!(active.load(Ordering::SeqCst), 1);

        mgr.stop().await;
    }

    #[tokio::test]
    async fn test_create_replaces_without_leaking() {
        let (mgr, active) = manager(false);

        mgr.create(TopologyKind::Star, 4).await.unwrap();
        let second = mgr.create(TopologyKind::Linear, 3).await.unwrap();

        // Exactly one live session, reflecting only the second topology
        assert_eq!(active.load(Ordering::SeqCst), 1);
        assert_eq!(second.switches, 3);
        assert_eq!(mgr.active_kind().await, Some(TopologyKind::Linear));

        mgr.stop().await;
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_session_alone() {
        let (mgr, active) = manager(false);

        mgr.create(TopologyKind::Star, 4).await.unwrap();
        let err = mgr.create(TopologyKind::Star, 999).await.unwrap_err();

        assert!(matches!(err, LifecycleError::Spec(SpecError::InvalidSize { .. })));
        // The running session survives an invalid request
        assert_eq!(mgr.state().await, SessionState::Running);
        assert_eq!(active.load(Ordering::SeqCst), 1);

        mgr.stop().await;
    }

    #[tokio::test]
    async fn test_build_failure_forces_idle() {
        let (mgr, active) = manager(true);

        let err = mgr.create(TopologyKind::Mesh, 4).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Emulator(EmulatorError::Build(_))));
        assert_eq!(mgr.state().await, SessionState::Idle);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_without_session_is_trivial_success() {
        let (mgr, _active) = manager(false);

        let result = mgr.stop().await;
        assert!(!result.was_active);
        assert!(result.teardown_error.is_none());
        assert_eq!(mgr.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_tears_down_active_session() {
        let (mgr, active) = manager(false);

        mgr.create(TopologyKind::Star, 2).await.unwrap();
        let result = mgr.stop().await;

        assert!(result.was_active);
        assert_eq!(mgr.state().await, SessionState::Idle);
        assert_eq!(active.load(Ordering::SeqCst), 0);
        assert!(!mgr.info().await.active);
    }

    #[tokio::test]
    async fn test_probes_require_running_state() {
        let (mgr, _active) = manager(false);

        assert!(matches!(
            mgr.ping_all().await.unwrap_err(),
            LifecycleError::NotRunning
        ));
        assert!(matches!(
            mgr.ping("h1", "h2").await.unwrap_err(),
            LifecycleError::NotRunning
        ));
    }

    #[tokio::test]
    async fn test_ping_unknown_host_rejected() {
        let (mgr, _active) = manager(false);

        mgr.create(TopologyKind::Star, 2).await.unwrap();
        let err = mgr.ping("h7", "h1").await.unwrap_err();
        assert!(matches!(err, LifecycleError::HostNotFound(ref h) if h == "h7"));

        mgr.stop().await;
    }

    #[tokio::test]
    async fn test_ping_between_known_hosts() {
        let (mgr, _active) = manager(false);

        mgr.create(TopologyKind::Star, 2).await.unwrap();

        let all = mgr.ping_all().await.unwrap();
        assert_eq!(all.loss_percent, 0.0);

        let pair = mgr.ping("h1", "h2").await.unwrap();
        assert_eq!(pair.loss_percent, 25.0);
        assert_eq!(pair.src.as_deref(), Some("h1"));

        mgr.stop().await;
    }

    #[tokio::test]
    async fn test_info_reflects_active_session() {
        let (mgr, _active) = manager(false);

        mgr.create(TopologyKind::Linear, 3).await.unwrap();
        let network_info = mgr.info().await;

        assert!(network_info.active);
        assert_eq!(network_info.kind, Some(TopologyKind::Linear));
        assert_eq!(network_info.switches, vec!["s1", "s2", "s3"]);
        assert_eq!(network_info.hosts, vec!["h1", "h2", "h3"]);

        mgr.stop().await;
    }
}
