//! Marker reflection detection

use serde::{Deserialize, Serialize};

use super::marker::Marker;

/// Bytes of context kept on each side of the first hit
const SNIPPET_CONTEXT: usize = 40;

/// Exact, case-sensitive substring match of the marker in the body
pub fn is_reflected(body: &str, marker: &Marker) -> bool {
    !marker.as_str().is_empty() && body.contains(marker.as_str())
}

/// Where the marker shows up in a body, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionEvidence {
    /// Number of non-overlapping occurrences
    pub occurrences: usize,
    /// Byte offset of the first occurrence
    pub first_offset: usize,
    /// Text around the first occurrence
    pub snippet: String,
}

impl ReflectionEvidence {
    /// Collect evidence, or `None` when the marker is not reflected
    pub fn find(body: &str, marker: &Marker) -> Option<Self> {
        if !is_reflected(body, marker) {
            return None;
        }
        let needle = marker.as_str();
        let first_offset = body.find(needle)?;

        let mut start = first_offset.saturating_sub(SNIPPET_CONTEXT);
        while !body.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (first_offset + needle.len() + SNIPPET_CONTEXT).min(body.len());
        while !body.is_char_boundary(end) {
            end += 1;
        }

        let snippet = body[start..end]
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        Some(Self {
            occurrences: body.matches(needle).count(),
            first_offset,
            snippet,
        })
    }
}
