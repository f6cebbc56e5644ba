//! Probe request construction

use super::marker::{bust_url, Marker};
use crate::http::Request;

/// Derive a probe from the base request
///
/// The copy gets a fresh id, `buster_term` appended to its query and
/// `header` set to the marker. Method, body and every other header are
/// carried over unchanged; `base` itself is never touched.
pub fn mutate(base: &Request, header: &str, marker: &Marker, buster_term: &str) -> Request {
    let mut probe = base.clone();
    probe.id = uuid::Uuid::new_v4().to_string();
    probe.url = bust_url(&base.url, buster_term);
    probe.set_header(header, marker.as_str());
    probe
}
