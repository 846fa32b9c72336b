// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Builders for request messages.

use edge_core::{
    CommandKind, EndpointId, Message, NodeAttribute, NodeId, NodeRef, Request, RequestId,
    SubRequest, Value,
};

use super::fixtures::ENDPOINT;

// =============================================================================
// RequestMessageBuilder
// =============================================================================

/// Builds a single-request message.
///
/// Defaults to a read of the value attribute on the harness endpoint.
#[derive(Debug, Clone)]
pub struct RequestMessageBuilder {
    command: CommandKind,
    endpoint: EndpointId,
    node: NodeRef,
    value: Option<Value>,
    method: Option<NodeId>,
    sub_request: Option<SubRequest>,
    request_id: Option<RequestId>,
}

impl RequestMessageBuilder {
    /// Starts a message addressed by alias.
    pub fn alias(alias: &str) -> Self {
        Self::with_node(NodeRef::alias_only(alias))
    }

    /// Starts a message addressed by node id.
    pub fn node(node_id: NodeId) -> Self {
        Self::with_node(NodeRef::new(node_id))
    }

    fn with_node(node: NodeRef) -> Self {
        Self {
            command: CommandKind::Read,
            endpoint: EndpointId::new(ENDPOINT),
            node,
            value: None,
            method: None,
            sub_request: None,
            request_id: None,
        }
    }

    /// Sets the command.
    pub fn command(mut self, command: CommandKind) -> Self {
        self.command = command;
        self
    }

    /// Sets the endpoint.
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = EndpointId::new(endpoint);
        self
    }

    /// Sets the attribute.
    pub fn attribute(mut self, attribute: NodeAttribute) -> Self {
        self.node = self.node.with_attribute(attribute);
        self
    }

    /// Adds an alias to a node-addressed message.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.node = self.node.with_alias(alias);
        self
    }

    /// Sets the value to write or the method argument.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the method id.
    pub fn method(mut self, method_id: NodeId) -> Self {
        self.command = CommandKind::Method;
        self.method = Some(method_id);
        self
    }

    /// Makes this a subscribe message.
    pub fn subscribe(mut self, sub: SubRequest) -> Self {
        self.command = CommandKind::Subscribe;
        self.sub_request = Some(sub);
        self
    }

    /// Fixes the request id.
    pub fn request_id(mut self, id: u64) -> Self {
        self.request_id = Some(RequestId::from_raw(id));
        self
    }

    /// Builds the request only.
    pub fn build_request(self) -> Request {
        let mut builder = Request::builder(self.node);
        if let Some(value) = self.value {
            builder = builder.value(value);
        }
        if let Some(method) = self.method {
            builder = builder.method(method);
        }
        if let Some(sub) = self.sub_request {
            builder = builder.sub_request(sub);
        }
        if let Some(id) = self.request_id {
            builder = builder.request_id(id);
        }
        builder.build()
    }

    /// Builds the message.
    pub fn build(self) -> Message {
        let command = self.command;
        let endpoint = self.endpoint.clone();
        Message::send_request(command, endpoint, self.build_request())
    }
}

// =============================================================================
// Batch Messages
// =============================================================================

/// Builds a batched message over node ids.
pub fn batch_read(command: CommandKind, node_ids: &[NodeId]) -> Message {
    let requests = node_ids
        .iter()
        .map(|id| Request::new(NodeRef::new(id.clone())))
        .collect();
    Message::send_requests(command, EndpointId::new(ENDPOINT), requests)
}

/// Builds a batched write over node ids and values.
pub fn batch_write(writes: Vec<(NodeId, Value)>) -> Message {
    let requests = writes
        .into_iter()
        .map(|(id, value)| Request::builder(NodeRef::new(id)).value(value).build())
        .collect();
    Message::send_requests(CommandKind::Write, EndpointId::new(ENDPOINT), requests)
}

/// Builds a subscribe message for a node on the harness endpoint.
pub fn subscribe(node_id: NodeId, sub: SubRequest) -> Message {
    RequestMessageBuilder::node(node_id).subscribe(sub).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::MessageKind;

    #[test]
    fn test_builder_defaults() {
        let msg = RequestMessageBuilder::alias("temperature").request_id(7).build();
        assert_eq!(msg.kind(), MessageKind::SendRequest);
        assert_eq!(msg.command(), Some(CommandKind::Read));
        assert_eq!(msg.endpoint().as_str(), ENDPOINT);
        assert_eq!(msg.request_id(), Some(RequestId::from_raw(7)));
    }

    #[test]
    fn test_batch_carries_every_request() {
        let msg = batch_read(
            CommandKind::ReadSync,
            &[NodeId::numeric(2, 1), NodeId::numeric(2, 2)],
        );
        assert_eq!(msg.kind(), MessageKind::SendRequests);
        assert_eq!(msg.requests().len(), 2);
    }
}
