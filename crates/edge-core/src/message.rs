// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Message model shared by callers, services and the dispatch output.
//!
//! Every value here is immutable once built. A [`Request`] gets its
//! [`RequestId`] at construction and every [`Response`] or error derived from
//! it carries the same id, which is the only correlation key callers should
//! rely on.
//!
//! # Message Shapes
//!
//! ```text
//! Message
//! ├── kind      SendRequest | SendRequests | GeneralResponse | Report | Error
//! ├── command   Read | ReadSync | Write | Subscribe | Method
//! ├── endpoint  EndpointId
//! └── payload   Request | Requests | Responses | Error(ErrorReport)
//! ```
//!
//! # Example
//!
//! ```
//! use edge_core::message::{CommandKind, Message, Request};
//! use edge_core::types::{EndpointId, NodeId, NodeRef};
//!
//! let request = Request::new(NodeRef::new(NodeId::numeric(2, 1001)).with_alias("Boiler/Temp"));
//! let id = request.request_id();
//! let message = Message::send_request(CommandKind::Read, EndpointId::new("ep"), request);
//! assert_eq!(message.request_id(), Some(id));
//! ```

use std::fmt;
use std::slice;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SubscriptionDefaults;
use crate::status::StatusCode;
use crate::types::{EndpointId, NodeId, NodeRef, RequestId, Value};

// =============================================================================
// Kinds
// =============================================================================

/// Kind of a message on the request or output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A single request.
    SendRequest,
    /// A batch of requests served by the group service.
    SendRequests,
    /// Direct answer to a request.
    GeneralResponse,
    /// Streamed subscription value.
    Report,
    /// Failure report.
    Error,
}

impl MessageKind {
    /// Returns the kind name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendRequest => "send_request",
            Self::SendRequests => "send_requests",
            Self::GeneralResponse => "general_response",
            Self::Report => "report",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation requested by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Asynchronous read.
    Read,
    /// Read that resolves with the value inline.
    ReadSync,
    /// Write.
    Write,
    /// Subscription control.
    Subscribe,
    /// Method invocation.
    Method,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::ReadSync => "read_sync",
            Self::Write => "write",
            Self::Subscribe => "subscribe",
            Self::Method => "method",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// SubRequest
// =============================================================================

/// Subscription control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOperation {
    /// Create a subscription with one monitored item.
    Create,
    /// Change subscription and monitored item parameters.
    Modify,
    /// Delete the subscription and its monitored items.
    Delete,
    /// Ask the server to retransmit a notification.
    Republish,
}

impl fmt::Display for SubOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Republish => "republish",
        };
        write!(f, "{}", name)
    }
}

/// Subscription parameters carried by a subscribe request.
///
/// Intervals are in milliseconds. `Republish` ignores every field but the
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRequest {
    operation: SubOperation,
    publishing_interval: f64,
    sampling_interval: f64,
    lifetime_count: u32,
    max_keep_alive_count: u32,
    max_notifications_per_publish: u32,
    queue_size: u32,
    priority: u8,
    publishing_enabled: bool,
    conformance: bool,
}

impl SubRequest {
    /// Starts a builder with default parameters.
    pub fn builder(operation: SubOperation) -> SubRequestBuilder {
        SubRequestBuilder::new(operation)
    }

    /// Returns the operation.
    pub fn operation(&self) -> SubOperation {
        self.operation
    }

    /// Requested publishing interval in milliseconds.
    pub fn publishing_interval(&self) -> f64 {
        self.publishing_interval
    }

    /// Requested sampling interval in milliseconds.
    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    /// Requested lifetime count.
    pub fn lifetime_count(&self) -> u32 {
        self.lifetime_count
    }

    /// Requested max keep-alive count.
    pub fn max_keep_alive_count(&self) -> u32 {
        self.max_keep_alive_count
    }

    /// Max notifications per publish; 0 means unlimited.
    pub fn max_notifications_per_publish(&self) -> u32 {
        self.max_notifications_per_publish
    }

    /// Requested monitored item queue size.
    pub fn queue_size(&self) -> u32 {
        self.queue_size
    }

    /// Relative priority.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Whether publishing is enabled.
    pub fn publishing_enabled(&self) -> bool {
        self.publishing_enabled
    }

    /// Whether revised parameters are checked against the request.
    pub fn conformance(&self) -> bool {
        self.conformance
    }
}

/// Builder for [`SubRequest`].
#[derive(Debug, Clone)]
pub struct SubRequestBuilder {
    inner: SubRequest,
}

impl SubRequestBuilder {
    fn new(operation: SubOperation) -> Self {
        let defaults = SubscriptionDefaults::default();
        Self {
            inner: SubRequest {
                operation,
                publishing_interval: 0.0,
                sampling_interval: 0.0,
                lifetime_count: 0,
                max_keep_alive_count: 0,
                max_notifications_per_publish: 0,
                queue_size: 0,
                priority: 0,
                publishing_enabled: true,
                conformance: false,
            },
        }
        .defaults(&defaults)
    }

    /// Applies configured defaults.
    pub fn defaults(mut self, defaults: &SubscriptionDefaults) -> Self {
        self.inner.publishing_interval = defaults.publishing_interval.as_secs_f64() * 1000.0;
        self.inner.sampling_interval = defaults.sampling_interval.as_secs_f64() * 1000.0;
        self.inner.lifetime_count = defaults.lifetime_count;
        self.inner.max_keep_alive_count = defaults.max_keep_alive_count;
        self.inner.max_notifications_per_publish = defaults.max_notifications_per_publish;
        self.inner.queue_size = defaults.queue_size;
        self.inner.priority = defaults.priority;
        self
    }

    /// Sets the publishing interval in milliseconds.
    pub fn publishing_interval(mut self, millis: f64) -> Self {
        self.inner.publishing_interval = millis;
        self
    }

    /// Sets the sampling interval in milliseconds.
    pub fn sampling_interval(mut self, millis: f64) -> Self {
        self.inner.sampling_interval = millis;
        self
    }

    /// Sets the lifetime count.
    pub fn lifetime_count(mut self, count: u32) -> Self {
        self.inner.lifetime_count = count;
        self
    }

    /// Sets the max keep-alive count.
    pub fn max_keep_alive_count(mut self, count: u32) -> Self {
        self.inner.max_keep_alive_count = count;
        self
    }

    /// Sets the max notifications per publish.
    pub fn max_notifications_per_publish(mut self, count: u32) -> Self {
        self.inner.max_notifications_per_publish = count;
        self
    }

    /// Sets the queue size.
    pub fn queue_size(mut self, size: u32) -> Self {
        self.inner.queue_size = size;
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: u8) -> Self {
        self.inner.priority = priority;
        self
    }

    /// Enables or disables publishing.
    pub fn publishing_enabled(mut self, enabled: bool) -> Self {
        self.inner.publishing_enabled = enabled;
        self
    }

    /// Enables conformance checking of revised parameters.
    pub fn conformance(mut self, enabled: bool) -> Self {
        self.inner.conformance = enabled;
        self
    }

    /// Builds the request.
    pub fn build(self) -> SubRequest {
        self.inner
    }
}

// =============================================================================
// Request
// =============================================================================

/// A single operation against one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    node: NodeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    request_id: RequestId,
    #[serde(default)]
    diagnostic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_request: Option<SubRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method_id: Option<NodeId>,
}

impl Request {
    /// Creates a request for a node with a freshly allocated id.
    pub fn new(node: NodeRef) -> Self {
        Self::builder(node).build()
    }

    /// Starts a request builder.
    pub fn builder(node: NodeRef) -> RequestBuilder {
        RequestBuilder {
            node,
            value: None,
            request_id: None,
            diagnostic: false,
            sub_request: None,
            method_id: None,
        }
    }

    /// Target node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Payload value (write value or method argument).
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Correlation id.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Whether diagnostic information was requested.
    pub fn diagnostic(&self) -> bool {
        self.diagnostic
    }

    /// Subscription parameters, for subscribe commands.
    pub fn sub_request(&self) -> Option<&SubRequest> {
        self.sub_request.as_ref()
    }

    /// Method node id, for method calls.
    pub fn method_id(&self) -> Option<&NodeId> {
        self.method_id.as_ref()
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    node: NodeRef,
    value: Option<Value>,
    request_id: Option<RequestId>,
    diagnostic: bool,
    sub_request: Option<SubRequest>,
    method_id: Option<NodeId>,
}

impl RequestBuilder {
    /// Sets the payload value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Overrides the allocated request id.
    pub fn request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Requests diagnostic information.
    pub fn diagnostic(mut self, enabled: bool) -> Self {
        self.diagnostic = enabled;
        self
    }

    /// Attaches subscription parameters.
    pub fn sub_request(mut self, sub: SubRequest) -> Self {
        self.sub_request = Some(sub);
        self
    }

    /// Sets the method to call on the target node.
    pub fn method(mut self, method_id: NodeId) -> Self {
        self.method_id = Some(method_id);
        self
    }

    /// Builds the request.
    pub fn build(self) -> Request {
        Request {
            node: self.node,
            value: self.value,
            request_id: self.request_id.unwrap_or_else(RequestId::next),
            diagnostic: self.diagnostic,
            sub_request: self.sub_request,
            method_id: self.method_id,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// Answer to a request or one streamed subscription value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    node: NodeRef,
    request_id: RequestId,
    value: Value,
    status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl Response {
    /// Creates a successful response carrying a value.
    pub fn new(node: NodeRef, value: Value, request_id: RequestId) -> Self {
        Self {
            node,
            request_id,
            value,
            status: StatusCode::Ok,
            timestamp: None,
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the source or publish timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Target node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Correlation id copied from the request.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returned value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Operation status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Timestamp, if any.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

// =============================================================================
// ErrorReport
// =============================================================================

/// Payload of an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Failure status.
    pub status: StatusCode,
    /// Free-form detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Request the failure belongs to.
    pub request_id: RequestId,
    /// Node the failure belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
}

impl ErrorReport {
    /// Creates a report without node or detail.
    pub fn new(status: StatusCode, request_id: RequestId) -> Self {
        Self {
            status,
            detail: None,
            request_id,
            node: None,
        }
    }

    /// Sets the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the node.
    pub fn with_node(mut self, node: NodeRef) -> Self {
        self.node = Some(node);
        self
    }
}

// =============================================================================
// Message
// =============================================================================

/// Message body. A message carries requests or responses, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Payload {
    /// One request.
    Request(Request),
    /// Batched requests.
    Requests(Vec<Request>),
    /// Responses or reports.
    Responses(Vec<Response>),
    /// Failure report.
    Error(ErrorReport),
}

/// Envelope routed by the dispatcher and published on the dispatch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<CommandKind>,
    endpoint: EndpointId,
    payload: Payload,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(
        kind: MessageKind,
        command: Option<CommandKind>,
        endpoint: EndpointId,
        payload: Payload,
    ) -> Self {
        Self {
            kind,
            command,
            endpoint,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Creates a single-request message.
    pub fn send_request(command: CommandKind, endpoint: EndpointId, request: Request) -> Self {
        Self::new(
            MessageKind::SendRequest,
            Some(command),
            endpoint,
            Payload::Request(request),
        )
    }

    /// Creates a batched-request message.
    pub fn send_requests(command: CommandKind, endpoint: EndpointId, requests: Vec<Request>) -> Self {
        Self::new(
            MessageKind::SendRequests,
            Some(command),
            endpoint,
            Payload::Requests(requests),
        )
    }

    /// Creates a general response.
    pub fn general_response(
        command: CommandKind,
        endpoint: EndpointId,
        responses: Vec<Response>,
    ) -> Self {
        Self::new(
            MessageKind::GeneralResponse,
            Some(command),
            endpoint,
            Payload::Responses(responses),
        )
    }

    /// Creates a streamed subscription report.
    pub fn report(endpoint: EndpointId, responses: Vec<Response>) -> Self {
        Self::new(
            MessageKind::Report,
            Some(CommandKind::Subscribe),
            endpoint,
            Payload::Responses(responses),
        )
    }

    /// Creates an error message.
    pub fn error(endpoint: EndpointId, report: ErrorReport) -> Self {
        Self::new(MessageKind::Error, None, endpoint, Payload::Error(report))
    }

    /// Message kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Command, absent on error messages.
    pub fn command(&self) -> Option<CommandKind> {
        self.command
    }

    /// Endpoint the message belongs to.
    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    /// Message body.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Carried requests; empty for responses and errors.
    pub fn requests(&self) -> &[Request] {
        match &self.payload {
            Payload::Request(request) => slice::from_ref(request),
            Payload::Requests(requests) => requests,
            _ => &[],
        }
    }

    /// First carried request.
    pub fn request(&self) -> Option<&Request> {
        self.requests().first()
    }

    /// Carried responses; empty for requests and errors.
    pub fn responses(&self) -> &[Response] {
        match &self.payload {
            Payload::Responses(responses) => responses,
            _ => &[],
        }
    }

    /// Error report, for error messages.
    pub fn error_report(&self) -> Option<&ErrorReport> {
        match &self.payload {
            Payload::Error(report) => Some(report),
            _ => None,
        }
    }

    /// Correlation id of the first request, response or error.
    pub fn request_id(&self) -> Option<RequestId> {
        match &self.payload {
            Payload::Request(request) => Some(request.request_id()),
            Payload::Requests(requests) => requests.first().map(Request::request_id),
            Payload::Responses(responses) => responses.first().map(Response::request_id),
            Payload::Error(report) => Some(report.request_id),
        }
    }

    /// Returns `true` if any part of the message belongs to `id`.
    pub fn concerns(&self, id: RequestId) -> bool {
        match &self.payload {
            Payload::Request(request) => request.request_id() == id,
            Payload::Requests(requests) => requests.iter().any(|r| r.request_id() == id),
            Payload::Responses(responses) => responses.iter().any(|r| r.request_id() == id),
            Payload::Error(report) => report.request_id == id,
        }
    }
}

// =============================================================================
// OpResult
// =============================================================================

/// Completion of a dispatched operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpResult {
    status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl OpResult {
    /// Successful completion without a value.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Successful completion with a value.
    pub fn ok_with(value: Value) -> Self {
        Self {
            status: StatusCode::Ok,
            value: Some(value),
        }
    }

    /// Completion with the given status and no value.
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            value: None,
        }
    }

    /// Returns the status.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` if the status is OK.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Returned value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Consumes the result and returns the value.
    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

impl From<StatusCode> for OpResult {
    fn from(status: StatusCode) -> Self {
        Self::status(status)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    fn node() -> NodeRef {
        NodeRef::new(NodeId::numeric(2, 10)).with_alias("Line1/Speed")
    }

    #[test]
    fn test_request_ids_assigned_once() {
        let a = Request::new(node());
        let b = Request::new(node());
        assert_ne!(a.request_id(), b.request_id());

        let cloned = a.clone();
        assert_eq!(cloned.request_id(), a.request_id());
    }

    #[test]
    fn test_request_builder() {
        let request = Request::builder(node())
            .value(12.5f64)
            .request_id(RequestId::from_raw(900))
            .diagnostic(true)
            .build();

        assert_eq!(request.request_id(), RequestId::from_raw(900));
        assert_eq!(request.value(), Some(&Value::Float64(12.5)));
        assert!(request.diagnostic());
        assert!(request.sub_request().is_none());
    }

    #[test]
    fn test_sub_request_builder() {
        let sub = SubRequest::builder(SubOperation::Create)
            .publishing_interval(1000.0)
            .sampling_interval(500.0)
            .queue_size(1)
            .conformance(true)
            .build();

        assert_eq!(sub.operation(), SubOperation::Create);
        assert_eq!(sub.publishing_interval(), 1000.0);
        assert_eq!(sub.sampling_interval(), 500.0);
        assert_eq!(sub.queue_size(), 1);
        assert!(sub.conformance());
        assert!(sub.publishing_enabled());
        assert!(sub.lifetime_count() >= sub.max_keep_alive_count() * 3);
    }

    #[test]
    fn test_message_accessors() {
        let request = Request::new(node());
        let id = request.request_id();
        let message = Message::send_request(CommandKind::Read, EndpointId::new("ep"), request);

        assert_eq!(message.kind(), MessageKind::SendRequest);
        assert_eq!(message.command(), Some(CommandKind::Read));
        assert_eq!(message.requests().len(), 1);
        assert!(message.responses().is_empty());
        assert_eq!(message.request_id(), Some(id));
        assert!(message.concerns(id));
    }

    #[test]
    fn test_error_message_carries_request_id() {
        let id = RequestId::from_raw(77);
        let report = ErrorReport::new(StatusCode::ParamInvalid, id)
            .with_node(node())
            .with_detail("unsupported attribute");
        let message = Message::error(EndpointId::new("ep"), report);

        assert_eq!(message.kind(), MessageKind::Error);
        assert_eq!(message.command(), None);
        assert_eq!(message.request_id(), Some(id));
        assert_eq!(message.error_report().map(|r| r.status), Some(StatusCode::ParamInvalid));
    }

    #[test]
    fn test_batched_requests() {
        let requests = vec![Request::new(node()), Request::new(node())];
        let second = requests[1].request_id();
        let message =
            Message::send_requests(CommandKind::ReadSync, EndpointId::new("ep"), requests);

        assert_eq!(message.requests().len(), 2);
        assert!(message.concerns(second));
    }

    #[test]
    fn test_op_result() {
        assert!(OpResult::ok().is_ok());
        assert_eq!(OpResult::ok_with(Value::Int32(3)).value(), Some(&Value::Int32(3)));

        let failed: OpResult = StatusCode::InternalError.into();
        assert!(!failed.is_ok());
        assert_eq!(failed.status_code(), StatusCode::InternalError);
    }
}
