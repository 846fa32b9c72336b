// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request/response and subscription layer over an OPC UA transport.
//!
//! Request messages go through the [`CommandDispatcher`] to a value-access
//! service, the [`SubscriptionManager`] or the [`MethodCaller`]. Every outcome
//! (general responses, streamed subscription reports and error reports) is
//! published on one dispatch output, tagged with the id of the request it
//! belongs to.
//!
//! The OPC UA stack itself is a collaborator behind [`OpcUaTransport`]; this
//! crate never opens or closes sessions.
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Transport     - Service call failures of the transport
//! ├── Session       - No session for an endpoint
//! ├── Operation     - Bad read/write/call results
//! ├── Subscription  - Subscription lifecycle failures
//! └── Configuration - Invalid requests or runtime configuration
//! ```
//!
//! Errors never escape the dispatcher: each is converted to a
//! [`edge_core::StatusCode`] and reported with the originating request id.
//!
//! # Example
//!
//! ```rust,ignore
//! use edge_core::{CommandKind, EdgeConfig, Message, NodeRef, Request};
//! use edge_opcua::{EdgeRuntime, NodeShape};
//!
//! let runtime = EdgeRuntime::builder(EdgeConfig::default())
//!     .sessions(sessions)
//!     .service("temperature", NodeShape::Scalar, NodeId::numeric(2, 1001), "plc-1")
//!     .build()?;
//!
//! let request = Request::new(NodeRef::alias_only("temperature"));
//! let id = request.request_id();
//! let mut output = runtime.subscribe_output();
//!
//! runtime
//!     .dispatcher()
//!     .execute(&Message::send_request(CommandKind::Read, "plc-1".into(), request))
//!     .await;
//! let response = output.recv_for(id).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod dispatch;
pub mod error;
pub mod method;
pub mod runtime;
pub mod service;
pub mod subscription;
pub mod types;

// Re-export commonly used types
pub use error::{
    ConfigurationError, ErrorCode, ErrorSeverity, OpcUaError, OpcUaResult, OperationError,
    SessionError, SubscriptionError, TransportError,
};

pub use types::{
    AttributeId, DataChangeBatch, DataChangeItem, DataValue, DeleteResults, MethodCallResult,
    MonitoredItemCreate, MonitoredItemModify, MonitoredItemResult, MonitoringMode,
    RevisedSubscription, SubscriptionParameters, UaStatus,
};

pub use client::{
    NotificationListener, OpcUaTransport, SessionLookup, SessionRegistry, SessionStats,
    SubscriptionListener,
};

pub use service::{
    ArrayKind, GroupService, NodeMetadata, NodeShape, ServiceContext, ServiceRegistry,
    ValueAccess, ValueAccessService, WELL_KNOWN_GROUP,
};

pub use subscription::{
    ItemIssue, SubscriptionHandle, SubscriptionManager, SubscriptionManagerStats,
    SubscriptionRegistry,
};

pub use dispatch::{CommandDispatcher, DispatcherStats};
pub use method::MethodCaller;
pub use runtime::{EdgeRuntime, EdgeRuntimeBuilder};
