//! HTTP module
//!
//! Request/response model shared by the importer and the miner, plus the
//! probe sender that puts mutated requests on the wire.

mod client;
mod request;
mod response;

pub use client::{HttpClient, ProbeSender};
pub use request::Request;
pub use response::Response;
