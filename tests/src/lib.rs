//! # RPC Gateway Test Suite
//!
//! End-to-end tests that bind a real TCP listener and talk to the gateway
//! over HTTP.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # Spawn a gateway on an ephemeral port
//!     └── http_flows.rs  # Request → bus → handler → reply flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gateway-tests
//! ```

#![allow(dead_code)]

pub mod integration;
