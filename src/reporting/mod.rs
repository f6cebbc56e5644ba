//! Report Generation Module
//!
//! Summarizes mining results in two formats:
//! - Text (aligned table for terminals)
//! - JSON (machine-readable)
//!
//! Reports are rendered to strings; the caller decides where they go.

pub mod formats;

use crate::miner::{Finding, RunSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Base request URLs that were mined
    pub targets: Vec<String>,
    /// Mining start time
    pub start_time: DateTime<Utc>,
    /// Mining end time
    pub end_time: DateTime<Utc>,
    /// Tool version
    pub tool_version: String,
    /// Report generation time
    pub generated_at: DateTime<Utc>,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            title: "Unkeyed Header Mining Report".to_string(),
            targets: Vec::new(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Total number of findings
    pub total_findings: usize,
    /// Findings with a cache signal
    pub cacheable_findings: usize,
    /// Findings by injected header
    pub by_header: BTreeMap<String, usize>,
    /// Number of unique hosts with findings
    pub unique_hosts: usize,
    /// Runs that were started
    pub runs: usize,
    /// Runs stopped before probing every candidate
    pub cancelled_runs: usize,
    /// Probes handed to the sender
    pub probes_sent: usize,
    /// Probes lost to transport errors
    pub transport_errors: usize,
    /// Mining duration in seconds
    pub duration_secs: u64,
}

impl ReportSummary {
    /// Calculate summary from findings and run summaries
    pub fn from_results(findings: &[Finding], runs: &[RunSummary], metadata: &ReportMetadata) -> Self {
        let mut by_header: BTreeMap<String, usize> = BTreeMap::new();
        let mut hosts: HashSet<String> = HashSet::new();

        for finding in findings {
            *by_header.entry(finding.header.clone()).or_insert(0) += 1;

            if let Ok(url) = url::Url::parse(&finding.request.url) {
                if let Some(host) = url.host_str() {
                    hosts.insert(host.to_string());
                }
            }
        }

        let duration = metadata.end_time.signed_duration_since(metadata.start_time);

        Self {
            total_findings: findings.len(),
            cacheable_findings: findings.iter().filter(|f| f.is_cacheable()).count(),
            by_header,
            unique_hosts: hosts.len(),
            runs: runs.len(),
            cancelled_runs: runs.iter().filter(|r| r.cancelled).count(),
            probes_sent: runs.iter().map(|r| r.probes_dispatched).sum(),
            transport_errors: runs.iter().map(|r| r.transport_errors).sum(),
            duration_secs: duration.num_seconds().max(0) as u64,
        }
    }
}

/// Complete mining report
#[derive(Debug, Clone, Serialize)]
pub struct MiningReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// Per-run outcomes
    pub runs: Vec<RunSummary>,
    /// All findings, in discovery order
    pub findings: Vec<Finding>,
}

impl MiningReport {
    /// Create a new report
    pub fn new(findings: Vec<Finding>, runs: Vec<RunSummary>, metadata: ReportMetadata) -> Self {
        let summary = ReportSummary::from_results(&findings, &runs, &metadata);
        Self {
            metadata,
            summary,
            runs,
            findings,
        }
    }

    /// Export to text table
    pub fn to_text(&self) -> String {
        formats::text::generate(self)
    }

    /// Export to JSON format
    pub fn to_json(&self) -> Result<String> {
        formats::json::generate(self)
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}
