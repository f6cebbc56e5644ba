//! Unkeyed header mining
//!
//! For each base request the miner sends one probe per candidate header.
//! Each probe carries the run's marker in that header and a fresh cache
//! buster in the query. Probes whose marker comes back in the body become
//! findings, annotated with a cacheability verdict.

#![allow(dead_code)]

mod cacheability;
mod engine;
mod marker;
mod mutator;
mod reflection;
mod results;

pub use engine::{Miner, MinerConfig, RunSummary, StopHandle};
pub use marker::MarkerStyle;
pub use results::{ChannelSink, Finding, FindingStore};

#[cfg(test)]
pub(crate) use results::tests::sample_finding;

/// Headers commonly forwarded by proxies and CDNs but left out of cache keys
pub const DEFAULT_CANDIDATE_HEADERS: &[&str] = &[
    "X-Forwarded-Host",
    "X-Host",
    "X-Forwarded-Server",
    "X-Forwarded-Scheme",
    "X-Original-URL",
    "X-Rewrite-URL",
    "X-Forwarded-Proto",
    "X-Forwarded-For",
    "X-Real-IP",
    "Fastly-Client-IP",
    "True-Client-IP",
    "X-Custom-IP-Authorization",
    "X-Frame-Options",
    "Origin",
    "Referer",
];
