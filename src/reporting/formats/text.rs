//! Text Report Generator
//!
//! Aligned table of findings followed by a short run summary.

use std::fmt::Write;

use crate::reporting::MiningReport;

const COLUMNS: [&str; 5] = ["Header", "Status", "Cacheable?", "Signal", "Probe URL"];

/// Generate text report
pub fn generate(report: &MiningReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", report.metadata.title);
    let _ = writeln!(out, "{}", "=".repeat(report.metadata.title.len()));
    for target in &report.metadata.targets {
        let _ = writeln!(out, "Target: {}", target);
    }
    let _ = writeln!(out);

    if report.findings.is_empty() {
        let _ = writeln!(out, "No unkeyed headers found.");
    } else {
        let rows: Vec<[String; 5]> = report
            .findings
            .iter()
            .map(|f| {
                [
                    f.header.clone(),
                    f.status.clone(),
                    f.cacheability.label().to_string(),
                    f.cacheability
                        .signal
                        .as_ref()
                        .map(|s| s.description())
                        .unwrap_or_else(|| "-".to_string()),
                    f.request.url.clone(),
                ]
            })
            .collect();

        let mut widths = COLUMNS.map(|c| c.len());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_row(&mut out, &COLUMNS.map(String::from), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
        for row in &rows {
            write_row(&mut out, row, &widths);
        }
    }

    let summary = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Findings: {} ({} cacheable) | Runs: {} ({} cancelled) | Probes: {} | Errors: {} | Duration: {}s",
        summary.total_findings,
        summary.cacheable_findings,
        summary.runs,
        summary.cancelled_runs,
        summary.probes_sent,
        summary.transport_errors,
        summary.duration_secs
    );

    out
}

fn write_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}
