// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Edge Integration Tests
//!
//! Test doubles and end-to-end suites for the edge OPC UA layer. Every suite
//! drives a real [`edge_opcua::EdgeRuntime`] against an in-memory transport
//! and observes the dispatch output.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p edge-tests
//! cargo test -p edge-tests --test integration_dispatch
//! cargo test -p edge-tests --test integration_value_access
//! cargo test -p edge-tests --test integration_subscription
//! ```
//!
//! ## Test Categories
//!
//! ### Dispatch (`integration_dispatch.rs`)
//! - Routing by alias and to the group service
//! - Request id correlation on responses and errors
//! - Method calls
//!
//! ### Value Access (`integration_value_access.rs`)
//! - Synchronous and asynchronous reads, attribute support per shape
//! - Writes and transport failures
//! - Metadata bootstrap
//!
//! ### Subscriptions (`integration_subscription.rs`)
//! - Create, modify, delete and republish
//! - Monitored item and delete result checks
//! - Conformance checks and lifecycle events
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use edge_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let mut rt = TestRuntime::new();
//!     rt.transport.set_value(NodeFixtures::temperature(), 21.5);
//!
//!     let msg = RequestMessageBuilder::alias("temperature").build();
//!     rt.execute(&msg).await;
//!     rt.next().await.assert_value(&Value::Float64(21.5));
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
