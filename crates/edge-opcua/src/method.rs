// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method invocation.

use edge_core::{CommandKind, Message, NodeId, OpResult, StatusCode, Value};

use crate::error::{OpcUaError, OperationError};
use crate::service::{single_request, ServiceContext};

/// Calls server methods and publishes their first output argument.
#[derive(Debug, Clone)]
pub struct MethodCaller {
    context: ServiceContext,
}

impl MethodCaller {
    /// Creates a method caller.
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Calls `method_id` on `object_id` with one input argument.
    ///
    /// Returns as soon as the call is scheduled. The outcome arrives on the
    /// dispatch output: a general response with the first output argument, or
    /// an error report. A method without outputs publishes nothing.
    pub fn execute_async(
        &self,
        message: &Message,
        object_id: Option<NodeId>,
        method_id: Option<NodeId>,
        argument: Option<Value>,
    ) -> OpResult {
        let request = match single_request(message) {
            Ok(request) => request,
            Err(e) => {
                e.log("method call");
                return OpResult::status(e.status_code());
            }
        };
        let endpoint = message.endpoint().clone();

        let (object_id, method_id) = match (object_id, method_id) {
            (Some(object_id), Some(method_id)) => (object_id, method_id),
            (object_id, _) => {
                let missing = if object_id.is_none() { "object" } else { "method" };
                self.context.fail(
                    &endpoint,
                    request.node(),
                    StatusCode::ParamInvalid,
                    Some(format!("method call has no {} node id", missing)),
                    request.request_id(),
                );
                return OpResult::status(StatusCode::ParamInvalid);
            }
        };

        let transport = match self.context.sessions().session(&endpoint) {
            Ok(transport) => transport,
            Err(e) => {
                e.log("method call");
                let status = e.status_code();
                self.context.fail(
                    &endpoint,
                    request.node(),
                    status,
                    Some(e.to_string()),
                    request.request_id(),
                );
                return OpResult::status(status);
            }
        };

        let context = self.context.clone();
        let request = request.clone();
        let inputs: Vec<Value> = argument.into_iter().collect();

        tokio::spawn(async move {
            let outcome = transport
                .call_method(&object_id, &method_id, inputs)
                .await
                .and_then(|result| {
                    if result.status.is_good() {
                        Ok(result.outputs)
                    } else {
                        Err(OpcUaError::operation(OperationError::MethodFailed {
                            object_id: object_id.to_string(),
                            method_id: method_id.to_string(),
                            status: result.status,
                        }))
                    }
                });

            match outcome {
                Ok(outputs) => match outputs.into_iter().next() {
                    Some(first) => {
                        context.respond(CommandKind::Method, &endpoint, &request, first, None)
                    }
                    None => tracing::debug!(
                        endpoint = %endpoint,
                        method_id = %method_id,
                        "Method returned no outputs"
                    ),
                },
                Err(e) => {
                    e.log("method call");
                    context.fail(
                        &endpoint,
                        request.node(),
                        StatusCode::Error,
                        Some(e.to_string()),
                        request.request_id(),
                    );
                }
            }
        });

        OpResult::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SessionRegistry;
    use edge_core::{DispatchOutput, EndpointId, ErrorReporter, MessageKind, NodeRef, Request};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_node_id_is_param_invalid() {
        let output = DispatchOutput::new(8);
        let reporter = ErrorReporter::new(output.clone());
        let caller = MethodCaller::new(ServiceContext::new(
            Arc::new(SessionRegistry::new()),
            reporter,
        ));
        let mut rx = output.subscribe();

        let request = Request::builder(NodeRef::alias_only("pump"))
            .method(NodeId::numeric(2, 7))
            .build();
        let id = request.request_id();
        let message = Message::send_request(CommandKind::Method, EndpointId::new("ep"), request);

        let result = caller.execute_async(&message, None, Some(NodeId::numeric(2, 7)), None);
        assert_eq!(result.status_code(), StatusCode::ParamInvalid);

        let error = rx.drain().remove(0);
        assert_eq!(error.kind(), MessageKind::Error);
        assert_eq!(error.request_id(), Some(id));
    }
}
