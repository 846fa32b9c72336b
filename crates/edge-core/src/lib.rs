// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # edge-core
//!
//! Shared model and plumbing of the edge OPC UA request/response layer.
//!
//! - **Types**: `EndpointId`, `RequestId`, `NodeId`, `NodeRef`, `Value`
//! - **Message**: `Request`, `SubRequest`, `Response`, `Message`, `OpResult`
//! - **Status**: the `StatusCode` taxonomy every operation completes with
//! - **Bus**: `DispatchOutput`, the stream of responses, reports and errors
//! - **Reporter**: `ErrorReporter`, the sink for every failure path
//! - **Config / Logging**: runtime configuration and tracing setup
//!
//! ## Example
//!
//! ```rust
//! use edge_core::bus::DispatchOutput;
//! use edge_core::reporter::ErrorReporter;
//! use edge_core::status::StatusCode;
//! use edge_core::types::{EndpointId, RequestId};
//!
//! let output = DispatchOutput::new(1024);
//! let mut subscriber = output.subscribe();
//! let reporter = ErrorReporter::new(output.clone());
//!
//! reporter.report(&EndpointId::new("ep"), None, StatusCode::Error, None, RequestId::next());
//! assert!(subscriber.try_recv().unwrap().is_some());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod status;
pub mod types;
pub mod message;

// =============================================================================
// Output Modules
// =============================================================================

pub mod bus;
pub mod reporter;

// =============================================================================
// Runtime Support
// =============================================================================

pub mod config;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use bus::{DispatchOutput, OutputStats, OutputSubscriber};
pub use config::{EdgeConfig, LogFormat, SubscriptionDefaults};
pub use error::{BusError, ConfigError, EdgeError, EdgeResult, NodeIdError};
pub use message::{
    CommandKind, ErrorReport, Message, MessageKind, OpResult, Payload, Request, Response,
    SubOperation, SubRequest,
};
pub use reporter::ErrorReporter;
pub use status::{StatusCode, StatusSeverity};
pub use types::{EndpointId, NodeAttribute, NodeId, NodeIdentifier, NodeRef, RequestId, Value};
