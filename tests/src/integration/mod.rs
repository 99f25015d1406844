//! Cross-crate flows through a running gateway.

pub mod harness;
mod http_flows;

pub use harness::TestServer;
