//! JSON Report Generator
//!
//! Generates machine-readable JSON mining reports.

use anyhow::Result;

use crate::reporting::MiningReport;

/// Generate JSON report
pub fn generate(report: &MiningReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::sample_finding;
    use crate::reporting::ReportMetadata;

    #[test]
    fn test_generate_json_report() {
        let report = MiningReport::new(
            vec![sample_finding("X-Forwarded-Host")],
            Vec::new(),
            ReportMetadata::default(),
        );

        let json = generate(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total_findings"], 1);
        let finding = &value["findings"][0];
        assert_eq!(finding["header"], "X-Forwarded-Host");
        assert_eq!(finding["marker"], "canary12345");
        assert_eq!(finding["status"], "Reflected");
        assert_eq!(finding["cacheability"]["cacheable"], true);
        assert_eq!(finding["cacheability"]["signal"]["rule"], "age");
    }
}
