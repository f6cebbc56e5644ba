//! Mining findings and the sinks that collect them

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::cacheability::Cacheability;
use super::marker::Marker;
use super::reflection::ReflectionEvidence;
use crate::http::{Request, Response};

/// Status text recorded for every finding
pub const STATUS_REFLECTED: &str = "Reflected";

/// A candidate header whose marker came back in the response body
///
/// Only created for reflecting probes. Never modified after creation;
/// sinks hand out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Unique ID
    pub id: String,

    /// Candidate header that was injected
    pub header: String,

    /// Marker of the run that produced this finding
    pub marker: Marker,

    /// Always true for a recorded finding
    pub reflected: bool,

    /// Textual reflection status
    pub status: String,

    /// Cache heuristic verdict
    pub cacheability: Cacheability,

    /// Where the marker appeared
    pub evidence: ReflectionEvidence,

    /// Probe request as sent
    pub request: Request,

    /// Response to the probe
    pub response: Response,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        header: &str,
        marker: &Marker,
        cacheability: Cacheability,
        evidence: ReflectionEvidence,
        request: Request,
        response: Response,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            header: header.to_string(),
            marker: marker.clone(),
            reflected: true,
            status: STATUS_REFLECTED.to_string(),
            cacheability,
            evidence,
            request,
            response,
            timestamp: Utc::now(),
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheability.cacheable
    }

    /// Label plus the deciding header
    pub fn rationale(&self) -> String {
        self.cacheability.rationale()
    }
}

/// Receives findings as probes produce them
///
/// Called from concurrent probe tasks; implementations serialize writes.
pub trait FindingSink: Send + Sync {
    fn emit(&self, finding: Finding);
}

/// Lock-guarded, append-only finding list
///
/// Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct FindingStore {
    findings: Arc<RwLock<Vec<Finding>>>,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding, returning its index
    pub fn append(&self, finding: Finding) -> usize {
        let mut findings = self.findings.write();
        findings.push(finding);
        findings.len() - 1
    }

    /// Get a copy of the finding at `index`
    pub fn get(&self, index: usize) -> Option<Finding> {
        self.findings.read().get(index).cloned()
    }

    /// Remove exactly the finding at `index`; later entries shift down by one
    pub fn remove(&self, index: usize) -> Option<Finding> {
        let mut findings = self.findings.write();
        if index < findings.len() {
            Some(findings.remove(index))
        } else {
            None
        }
    }

    /// Remove every finding
    pub fn clear(&self) {
        self.findings.write().clear();
    }

    /// Copy of all findings, in insertion order
    pub fn snapshot(&self) -> Vec<Finding> {
        self.findings.read().clone()
    }

    pub fn len(&self) -> usize {
        self.findings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.read().is_empty()
    }
}

impl FindingSink for FindingStore {
    fn emit(&self, finding: Finding) {
        self.append(finding);
    }
}

/// Single-consumer channel sink
///
/// Findings are delivered in emission order to whoever holds the receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Finding>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Finding>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FindingSink for ChannelSink {
    fn emit(&self, finding: Finding) {
        if self.tx.send(finding).is_err() {
            tracing::warn!("Finding receiver dropped, discarding finding");
        }
    }
}
