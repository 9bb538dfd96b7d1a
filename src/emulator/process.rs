//! Process-backed emulator gateway.
//!
//! Spawns the configured emulator worker as a child process, hands it
//! the topology spec as a JSON file, and drives connectivity probes over
//! the worker's stdin/stdout line protocol. Every interaction with the
//! worker is bounded by a configured timeout.

use async_trait::async_trait;
use color_eyre::eyre::ensure;
use log::{debug, info, warn};
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use super::{EmulatorError, EmulatorGateway, EmulatorHandle, EmulatorSession};
use crate::config::EmulatorConfig;
use crate::topology::TopologySpec;

/// Gateway that runs one emulator worker process per session
pub struct ProcessEmulatorGateway {
    config: EmulatorConfig,
    loss_pattern: Regex,
}

/// Distinguishes spec files of sessions created within one process
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

impl ProcessEmulatorGateway {
    pub fn new(config: EmulatorConfig) -> color_eyre::Result<Self> {
        ensure!(!config.command.is_empty(), "emulator command cannot be empty");

        // Matches the emulator's results line, e.g.
        // "*** Results: 40% dropped (12/20 received)"
        let loss_pattern = Regex::new(r"(\d+(?:\.\d+)?)%\s+dropped")?;
        Ok(Self {
            config,
            loss_pattern,
        })
    }
}

#[async_trait]
impl EmulatorGateway for ProcessEmulatorGateway {
    async fn build_and_start(&self, spec: &TopologySpec) -> Result<EmulatorHandle, EmulatorError> {
        tokio::fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(|e| {
                EmulatorError::Build(format!(
                    "cannot create scratch dir '{}': {}",
                    self.config.scratch_dir, e
                ))
            })?;

        let spec_path = PathBuf::from(&self.config.scratch_dir).join(format!(
            "topology_{}_{}.json",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let spec_json = serde_json::to_vec_pretty(spec)
            .map_err(|e| EmulatorError::Build(format!("cannot encode topology spec: {}", e)))?;
        tokio::fs::write(&spec_path, spec_json).await.map_err(|e| {
            EmulatorError::Build(format!("cannot write spec file {:?}: {}", spec_path, e))
        })?;

        info!(
            "Starting emulator worker for {} topology ({} switches, {} hosts)",
            spec.kind,
            spec.switches.len(),
            spec.hosts.len()
        );

        let mut child = Command::new(&self.config.command[0])
            .args(&self.config.command[1..])
            .arg(&spec_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EmulatorError::Build(format!(
                    "cannot spawn emulator worker '{}': {}",
                    self.config.command[0], e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EmulatorError::Build("worker stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EmulatorError::Build("worker stdout unavailable".to_string()))?;

        let mut session = ProcessEmulatorSession {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            spec_path,
            cleanup_command: self.config.cleanup_command.clone(),
            probe_timeout: self.config.probe_timeout,
            loss_pattern: self.loss_pattern.clone(),
            alive: true,
        };

        // Wait for the worker to report the network is up
        let ready = timeout(self.config.startup_timeout, session.await_ready()).await;
        match ready {
            Ok(Ok(())) => Ok(Box::new(session)),
            Ok(Err(e)) => {
                let _ = session.shutdown().await;
                Err(e)
            }
            Err(_) => {
                let _ = session.shutdown().await;
                Err(EmulatorError::Build(format!(
                    "emulator worker did not become ready within {:?}",
                    self.config.startup_timeout
                )))
            }
        }
    }
}

/// One running emulator worker process
struct ProcessEmulatorSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    spec_path: PathBuf,
    cleanup_command: Vec<String>,
    probe_timeout: Duration,
    loss_pattern: Regex,
    alive: bool,
}

impl ProcessEmulatorSession {
    async fn await_ready(&mut self) -> Result<(), EmulatorError> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    debug!("emulator: {}", line);
                    if line.trim() == "READY" {
                        return Ok(());
                    }
                    if let Some(msg) = line.trim().strip_prefix("ERROR ") {
                        return Err(EmulatorError::Build(msg.to_string()));
                    }
                }
                Ok(None) => {
                    return Err(EmulatorError::Build(
                        "emulator worker exited before reporting READY".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(EmulatorError::Build(format!("worker output error: {}", e)));
                }
            }
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<(), EmulatorError> {
        self.stdin
            .write_all(format!("{}\n", command).as_bytes())
            .await
            .map_err(|e| EmulatorError::Probe(format!("cannot write to worker: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EmulatorError::Probe(format!("cannot write to worker: {}", e)))
    }

    /// Run one probe command and read output until the terminating DONE
    /// line, extracting the packet-loss percentage on the way.
    async fn probe(&mut self, command: &str) -> Result<f64, EmulatorError> {
        if !self.alive {
            return Err(EmulatorError::Probe(
                "emulator session is not running".to_string(),
            ));
        }

        self.send_command(command).await?;

        let probe_timeout = self.probe_timeout;
        let outcome = timeout(probe_timeout, self.read_probe_result()).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(EmulatorError::Probe(format!(
                "probe '{}' timed out after {:?}",
                command, probe_timeout
            ))),
        }
    }

    async fn read_probe_result(&mut self) -> Result<f64, EmulatorError> {
        let mut loss: Option<f64> = None;

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| EmulatorError::Probe(format!("worker output error: {}", e)))?;

            let line = match line {
                Some(line) => line,
                None => {
                    self.alive = false;
                    return Err(EmulatorError::Probe(
                        "emulator worker exited mid-probe".to_string(),
                    ));
                }
            };

            debug!("emulator: {}", line);
            let trimmed = line.trim();

            if let Some(msg) = trimmed.strip_prefix("ERROR ") {
                if let Some(host) = msg.strip_prefix("unknown host:") {
                    return Err(EmulatorError::HostNotFound(host.trim().to_string()));
                }
                return Err(EmulatorError::Probe(msg.to_string()));
            }

            if trimmed == "DONE" {
                return loss.ok_or_else(|| {
                    EmulatorError::Probe("probe produced no results line".to_string())
                });
            }

            if let Some(value) = parse_loss(&self.loss_pattern, trimmed) {
                loss = Some(value);
            }
        }
    }

    async fn run_cleanup(&self) {
        if self.cleanup_command.is_empty() {
            return;
        }
        debug!("Running emulator cleanup: {:?}", self.cleanup_command);
        let result = Command::new(&self.cleanup_command[0])
            .args(&self.cleanup_command[1..])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = result {
            warn!("Emulator cleanup command failed: {}", e);
        }
    }
}

#[async_trait]
impl EmulatorSession for ProcessEmulatorSession {
    async fn ping_all(&mut self) -> Result<f64, EmulatorError> {
        self.probe("pingall").await
    }

    async fn ping(&mut self, src: &str, dst: &str) -> Result<f64, EmulatorError> {
        self.probe(&format!("ping {} {}", src, dst)).await
    }

    async fn shutdown(&mut self) -> Result<(), EmulatorError> {
        if !self.alive {
            return Ok(());
        }
        self.alive = false;

        // Ask the worker to exit cleanly, then force it
        let _ = self.stdin.write_all(b"exit\n").await;
        let _ = self.stdin.flush().await;

        let wait_outcome = timeout(Duration::from_secs(5), self.child.wait()).await;
        let kill_result = match wait_outcome {
            Ok(Ok(status)) => {
                debug!("Emulator worker exited with {}", status);
                Ok(())
            }
            _ => self
                .child
                .kill()
                .await
                .map_err(|e| EmulatorError::Teardown(format!("cannot kill worker: {}", e))),
        };

        self.run_cleanup().await;
        let _ = tokio::fs::remove_file(&self.spec_path).await;

        kill_result
    }
}

fn parse_loss(pattern: &Regex, line: &str) -> Option<f64> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
