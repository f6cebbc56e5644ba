//! Mining orchestrator with bounded concurrent probing

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::cacheability::classify;
use super::marker::{CacheBuster, Marker, MarkerStyle};
use super::mutator::mutate;
use super::reflection::ReflectionEvidence;
use super::results::{Finding, FindingSink};
use crate::app::Config;
use crate::error::{HttpError, MinerError};
use crate::http::{ProbeSender, Request};

/// Miner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Running,
    /// No new probes are dispatched until `reset()`
    Stopped,
}

/// Miner configuration
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Candidate headers in probe order
    pub headers: Vec<String>,
    /// Marker prefix
    pub marker_prefix: String,
    /// Marker suffix width
    pub marker_style: MarkerStyle,
    /// Cache-busting query parameter name
    pub cache_buster_param: String,
    /// Maximum probes in flight per run
    pub max_concurrent_probes: usize,
    /// Maximum runs mining at once
    pub max_concurrent_runs: usize,
    /// Delay before each probe dispatch in milliseconds
    pub probe_delay_ms: u64,
    /// Upper bound on a single probe, independent of the sender
    pub probe_timeout: Duration,
}

impl MinerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headers: config.miner.candidate_headers(),
            marker_prefix: config.miner.marker_prefix.clone(),
            marker_style: config.miner.marker_style,
            cache_buster_param: config.miner.cache_buster_param.clone(),
            max_concurrent_probes: config.miner.max_concurrent_probes.max(1),
            max_concurrent_runs: config.miner.max_concurrent_runs.max(1),
            probe_delay_ms: config.miner.probe_delay_ms,
            probe_timeout: Duration::from_secs(config.http.request_timeout.max(1)),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Miner statistics across all runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct MinerStats {
    pub runs_started: usize,
    pub runs_completed: usize,
    pub active_runs: usize,
    pub probes_sent: usize,
    pub transport_errors: usize,
    pub findings: usize,
}

/// Result of one mining run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Base request URL
    pub url: String,
    /// Marker used by every probe of the run
    pub marker: Option<Marker>,
    /// Probes handed to the sender
    pub probes_dispatched: usize,
    /// Probes that produced a finding
    pub findings: usize,
    /// Probes abandoned on transport errors
    pub transport_errors: usize,
    /// Stopped before every candidate was probed
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunSummary {
    fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            marker: None,
            probes_dispatched: 0,
            findings: 0,
            transport_errors: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }
}

/// Cloneable handle that stops every run of a miner
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<RwLock<MinerState>>,
}

impl StopHandle {
    pub fn stop(&self) {
        *self.state.write() = MinerState::Stopped;
    }
}

enum ProbeKind {
    Finding,
    Miss,
    TransportError,
}

/// Unkeyed header miner
///
/// Clones share state, statistics, pools and the finding sink.
#[derive(Clone)]
pub struct Miner {
    config: Arc<MinerConfig>,
    sender: Arc<dyn ProbeSender>,
    sink: Arc<dyn FindingSink>,
    state: Arc<RwLock<MinerState>>,
    stats: Arc<RwLock<MinerStats>>,
    run_slots: Arc<Semaphore>,
    buster: Arc<CacheBuster>,
}

impl Miner {
    /// Create a new miner
    pub fn new(
        config: MinerConfig,
        sender: Arc<dyn ProbeSender>,
        sink: Arc<dyn FindingSink>,
    ) -> Self {
        let run_slots = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        let buster = Arc::new(CacheBuster::new(&config.cache_buster_param));
        Self {
            config: Arc::new(config),
            sender,
            sink,
            state: Arc::new(RwLock::new(MinerState::Idle)),
            stats: Arc::new(RwLock::new(MinerStats::default())),
            run_slots,
            buster,
        }
    }

    /// Mine one base request
    ///
    /// Fails only when the base request cannot be probed at all; transport
    /// errors of single probes are counted in the summary.
    pub async fn mine(&self, base: &Request) -> Result<RunSummary, MinerError> {
        let target = base.validate()?;

        let _slot = self
            .run_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| MinerError::Shutdown)?;

        if self.is_stopped() {
            tracing::info!(url = %base.url, "Mining stopped, skipping run");
            return Ok(RunSummary {
                cancelled: true,
                ..RunSummary::empty(&base.url)
            });
        }

        self.begin_run();
        tracing::info!(url = %base.url, target = %target, "[-] Starting cache mining on: {}", base.url);
        let summary = self.run(base).await;
        self.end_run();

        tracing::info!(
            url = %summary.url,
            probes = summary.probes_dispatched,
            findings = summary.findings,
            errors = summary.transport_errors,
            cancelled = summary.cancelled,
            "Cache mining finished"
        );

        Ok(summary)
    }

    /// Mine several base requests through the run pool
    ///
    /// Results come back in input order.
    pub async fn mine_all(&self, bases: Vec<Request>) -> Vec<Result<RunSummary, MinerError>> {
        let handles: Vec<_> = bases
            .into_iter()
            .map(|base| {
                let miner = self.clone();
                tokio::spawn(async move { miner.mine(&base).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(run_outcome(handle.await));
        }
        results
    }

    async fn run(&self, base: &Request) -> RunSummary {
        let start = Instant::now();
        let marker = Marker::generate(&self.config.marker_prefix, self.config.marker_style);
        tracing::debug!(marker = %marker, "Generated run marker");

        let mut summary = RunSummary {
            marker: Some(marker.clone()),
            ..RunSummary::empty(&base.url)
        };

        let probe_slots = Arc::new(Semaphore::new(self.config.max_concurrent_probes.max(1)));
        let mut handles = Vec::with_capacity(self.config.headers.len());

        for header in &self.config.headers {
            if self.is_stopped() {
                summary.cancelled = true;
                break;
            }

            if self.config.probe_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.probe_delay_ms)).await;
            }

            let permit = match probe_slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            // Stop may have arrived while waiting for a slot
            if self.is_stopped() {
                summary.cancelled = true;
                break;
            }

            let probe = mutate(base, header, &marker, &self.buster.next_term());

            let sender = self.sender.clone();
            let sink = self.sink.clone();
            let stats = self.stats.clone();
            let header = header.clone();
            let marker = marker.clone();
            let timeout = self.config.probe_timeout;

            stats.write().probes_sent += 1;
            summary.probes_dispatched += 1;

            handles.push(tokio::spawn(async move {
                let kind = match probe_header(sender.as_ref(), &header, &marker, probe, timeout).await {
                    Ok(Some(finding)) => {
                        tracing::info!(
                            header = %header,
                            cacheable = finding.is_cacheable(),
                            "[!] Found Unkeyed Input: {}",
                            header
                        );
                        sink.emit(finding);
                        stats.write().findings += 1;
                        ProbeKind::Finding
                    }
                    Ok(None) => ProbeKind::Miss,
                    Err(e) => {
                        tracing::warn!(header = %header, "Error mining {}: {}", header, e);
                        stats.write().transport_errors += 1;
                        ProbeKind::TransportError
                    }
                };
                drop(permit);
                kind
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(ProbeKind::Finding) => summary.findings += 1,
                Ok(ProbeKind::Miss) => {}
                Ok(ProbeKind::TransportError) => summary.transport_errors += 1,
                Err(e) => {
                    tracing::warn!("Probe task failed: {}", e);
                    summary.transport_errors += 1;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        summary
    }

    fn begin_run(&self) {
        {
            let mut state = self.state.write();
            if *state == MinerState::Idle {
                *state = MinerState::Running;
            }
        }
        let mut stats = self.stats.write();
        stats.runs_started += 1;
        stats.active_runs += 1;
    }

    fn end_run(&self) {
        let remaining = {
            let mut stats = self.stats.write();
            stats.runs_completed += 1;
            stats.active_runs = stats.active_runs.saturating_sub(1);
            stats.active_runs
        };
        let mut state = self.state.write();
        if remaining == 0 && *state == MinerState::Running {
            *state = MinerState::Idle;
        }
    }

    /// Stop dispatching probes; in-flight probes still complete
    pub fn stop(&self) {
        *self.state.write() = MinerState::Stopped;
    }

    /// Allow new runs after a stop
    pub fn reset(&self) {
        let active = self.stats.read().active_runs;
        let mut state = self.state.write();
        if *state == MinerState::Stopped {
            *state = if active > 0 {
                MinerState::Running
            } else {
                MinerState::Idle
            };
        }
    }

    /// Handle for stopping from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: self.state.clone(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.state.read() == MinerState::Stopped
    }

    /// Get current state
    pub fn state(&self) -> MinerState {
        *self.state.read()
    }

    /// Get current stats
    pub fn stats(&self) -> MinerStats {
        self.stats.read().clone()
    }

    /// Candidate headers this miner probes
    pub fn headers(&self) -> &[String] {
        &self.config.headers
    }
}

/// Flatten a joined run task; a panicked or aborted task becomes `TaskFailed`
fn run_outcome(
    joined: Result<Result<RunSummary, MinerError>, tokio::task::JoinError>,
) -> Result<RunSummary, MinerError> {
    match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Mining task failed: {}", e);
            Err(MinerError::TaskFailed(e.to_string()))
        }
    }
}

/// Send one probe and turn a reflecting response into a finding
async fn probe_header(
    sender: &dyn ProbeSender,
    header: &str,
    marker: &Marker,
    probe: Request,
    timeout: Duration,
) -> Result<Option<Finding>, HttpError> {
    tracing::debug!(header = %header, url = %probe.url, "Sending probe");

    let response = match tokio::time::timeout(timeout, sender.send(&probe)).await {
        Ok(result) => result?,
        Err(_) => return Err(HttpError::Timeout(timeout.as_millis() as u64)),
    };

    let body = response.body_text();
    let evidence = match ReflectionEvidence::find(&body, marker) {
        Some(evidence) => evidence,
        None => {
            tracing::debug!(header = %header, status = response.status, "Marker not reflected");
            return Ok(None);
        }
    };

    let cacheability = classify(&response.headers);
    Ok(Some(Finding::new(header, marker, cacheability, evidence, probe, response)))
}
