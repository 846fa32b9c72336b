// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! ## Module Structure
//!
//! - `fixtures`: Endpoints, nodes and subscription requests
//! - `builders`: Request message builders
//! - `assertions`: Assertions over output messages
//! - `mocks`: In-memory OPC UA transport
//! - `harness`: Runtime wired to the mock transport

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-exports for convenience
pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes test logging once per test binary.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,edge_opcua=debug,edge_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
