// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value-access services.
//!
//! A service owns one node and serves read, read-sync and write requests for
//! it. Services are registered by alias; batched requests go to the group
//! service registered under [`WELL_KNOWN_GROUP`].
//!
//! # Outcome contract
//!
//! | Operation    | Returns                          | Delivers                         |
//! |--------------|----------------------------------|----------------------------------|
//! | `read_sync`  | value inline, after the read     | `GeneralResponse`                |
//! | `read_async` | `OK` once the target is accepted | `GeneralResponse` or `Error`     |
//! | `write`      | `OK` once the target is accepted | `GeneralResponse` or `Error`     |
//!
//! An `Err` from a service means the request could not be started; the
//! dispatcher turns it into `INTERNAL_ERROR`.

mod group;
mod metadata;
mod registry;
mod shape;
mod value;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::{
    CommandKind, DispatchOutput, EndpointId, ErrorReporter, Message, NodeRef, OpResult, Request,
    RequestId, Response, StatusCode, Value,
};

use crate::client::SessionLookup;
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};

pub use group::GroupService;
pub use metadata::NodeMetadata;
pub use registry::ServiceRegistry;
pub use shape::{ArrayKind, NodeShape};
pub use value::ValueAccess;

/// Alias of the service that serves batched requests.
pub const WELL_KNOWN_GROUP: &str = "group";

// =============================================================================
// ValueAccessService Trait
// =============================================================================

/// Read and write access to one node.
#[async_trait]
pub trait ValueAccessService: Send + Sync {
    /// Alias the service is registered under.
    fn alias(&self) -> &str;

    /// Reads and resolves with the value inline.
    async fn read_sync(&self, message: &Message) -> OpcUaResult<OpResult>;

    /// Accepts a read; the value is delivered on the dispatch output.
    async fn read_async(&self, message: &Message) -> OpcUaResult<OpResult>;

    /// Accepts a write; the outcome is delivered on the dispatch output.
    async fn write(&self, message: &Message) -> OpcUaResult<OpResult>;

    /// Collects the static metadata of the node and caches it.
    async fn bootstrap_metadata(&self) -> OpcUaResult<NodeMetadata> {
        Ok(NodeMetadata::default())
    }

    /// Returns the cached metadata, if bootstrapped.
    fn metadata(&self) -> Option<NodeMetadata> {
        None
    }
}

// =============================================================================
// ServiceContext
// =============================================================================

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    sessions: Arc<dyn SessionLookup>,
    output: DispatchOutput,
    reporter: ErrorReporter,
}

impl ServiceContext {
    /// Creates a context.
    pub fn new(sessions: Arc<dyn SessionLookup>, reporter: ErrorReporter) -> Self {
        Self {
            sessions,
            output: reporter.output().clone(),
            reporter,
        }
    }

    /// Session lookup.
    pub fn sessions(&self) -> &Arc<dyn SessionLookup> {
        &self.sessions
    }

    /// Dispatch output.
    pub fn output(&self) -> &DispatchOutput {
        &self.output
    }

    /// Error reporter.
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Publishes a general response for one request.
    pub fn respond(
        &self,
        command: CommandKind,
        endpoint: &EndpointId,
        request: &Request,
        value: Value,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let mut response = Response::new(request.node().clone(), value, request.request_id());
        if let Some(timestamp) = timestamp {
            response = response.with_timestamp(timestamp);
        }
        self.output
            .publish(Message::general_response(command, endpoint.clone(), vec![response]));
    }

    /// Reports a failure for a node.
    pub fn fail(
        &self,
        endpoint: &EndpointId,
        node: &NodeRef,
        status: StatusCode,
        detail: Option<String>,
        request_id: RequestId,
    ) {
        self.reporter
            .report(endpoint, Some(node), status, detail, request_id);
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("output", &self.output)
            .finish()
    }
}

/// Returns the single request of a message.
pub(crate) fn single_request(message: &Message) -> OpcUaResult<&Request> {
    message.request().ok_or_else(|| {
        OpcUaError::configuration(ConfigurationError::invalid_request(format!(
            "{} message carries no request",
            message.kind()
        )))
    })
}

/// Command a response to `message` is published under.
pub(crate) fn response_command(message: &Message, fallback: CommandKind) -> CommandKind {
    message.command().unwrap_or(fallback)
}
