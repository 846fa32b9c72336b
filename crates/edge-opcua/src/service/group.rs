// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batched reads and writes.
//!
//! The group service answers `SendRequests` messages with one general
//! response holding a response per request, in request order.

use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{
    CommandKind, EndpointId, Message, NodeId, OpResult, Request, Response, StatusCode, Value,
};

use super::{response_command, ServiceContext, ValueAccessService, WELL_KNOWN_GROUP};
use crate::client::OpcUaTransport;
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::types::{DataValue, UaStatus};

/// Service registered under [`WELL_KNOWN_GROUP`].
#[derive(Debug, Clone)]
pub struct GroupService {
    context: ServiceContext,
}

impl GroupService {
    /// Creates the group service.
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    fn node_ids(message: &Message) -> OpcUaResult<Vec<NodeId>> {
        let requests = message.requests();
        if requests.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_request(
                "batch carries no requests",
            )));
        }
        requests
            .iter()
            .map(|r| {
                r.node().node_id.clone().ok_or_else(|| {
                    OpcUaError::configuration(ConfigurationError::invalid_request(format!(
                        "request {} has no node id",
                        r.request_id()
                    )))
                })
            })
            .collect()
    }

    fn transport(&self, endpoint: &EndpointId) -> OpcUaResult<Arc<dyn OpcUaTransport>> {
        self.context.sessions().session(endpoint)
    }
}

fn read_responses(requests: &[Request], values: Vec<DataValue>) -> Vec<Response> {
    requests
        .iter()
        .zip(values.into_iter().map(Some).chain(std::iter::repeat(None)))
        .map(|(request, data)| match data {
            Some(data) if data.is_usable() => {
                let mut response =
                    Response::new(request.node().clone(), data.value, request.request_id());
                if let Some(ts) = data.source_timestamp {
                    response = response.with_timestamp(ts);
                }
                response
            }
            _ => Response::new(request.node().clone(), Value::Null, request.request_id())
                .with_status(StatusCode::Error),
        })
        .collect()
}

fn write_responses(requests: &[Request], statuses: &[UaStatus]) -> Vec<Response> {
    requests
        .iter()
        .enumerate()
        .map(|(i, request)| match statuses.get(i) {
            Some(status) if status.is_good() => Response::new(
                request.node().clone(),
                status.code().into(),
                request.request_id(),
            ),
            Some(status) => Response::new(
                request.node().clone(),
                status.code().into(),
                request.request_id(),
            )
            .with_status(StatusCode::Error),
            None => Response::new(request.node().clone(), Value::Null, request.request_id())
                .with_status(StatusCode::Error),
        })
        .collect()
}

#[async_trait]
impl ValueAccessService for GroupService {
    fn alias(&self) -> &str {
        WELL_KNOWN_GROUP
    }

    async fn read_sync(&self, message: &Message) -> OpcUaResult<OpResult> {
        let node_ids = Self::node_ids(message)?;
        let transport = self.transport(message.endpoint())?;
        let values = transport.read_values(&node_ids).await?;

        let responses = read_responses(message.requests(), values);
        let inline = Value::Array(responses.iter().map(|r| r.value().clone()).collect());
        self.context.output().publish(Message::general_response(
            response_command(message, CommandKind::ReadSync),
            message.endpoint().clone(),
            responses,
        ));
        Ok(OpResult::ok_with(inline))
    }

    async fn read_async(&self, message: &Message) -> OpcUaResult<OpResult> {
        let node_ids = Self::node_ids(message)?;
        let transport = self.transport(message.endpoint())?;
        let context = self.context.clone();
        let endpoint = message.endpoint().clone();
        let command = response_command(message, CommandKind::Read);
        let requests = message.requests().to_vec();

        tokio::spawn(async move {
            match transport.read_values(&node_ids).await {
                Ok(values) => {
                    let responses = read_responses(&requests, values);
                    context
                        .output()
                        .publish(Message::general_response(command, endpoint, responses));
                }
                Err(e) => {
                    e.log("group read");
                    for request in &requests {
                        context.fail(
                            &endpoint,
                            request.node(),
                            StatusCode::Error,
                            Some(e.to_string()),
                            request.request_id(),
                        );
                    }
                }
            }
        });

        Ok(OpResult::ok())
    }

    async fn write(&self, message: &Message) -> OpcUaResult<OpResult> {
        let node_ids = Self::node_ids(message)?;
        let mut writes = Vec::with_capacity(node_ids.len());
        for (node_id, request) in node_ids.into_iter().zip(message.requests()) {
            match request.value() {
                Some(value) => writes.push((node_id, value.clone())),
                None => {
                    return Err(OpcUaError::configuration(ConfigurationError::invalid_request(
                        format!("request {} carries no value", request.request_id()),
                    )));
                }
            }
        }

        let transport = self.transport(message.endpoint())?;
        let context = self.context.clone();
        let endpoint = message.endpoint().clone();
        let command = response_command(message, CommandKind::Write);
        let requests = message.requests().to_vec();

        tokio::spawn(async move {
            match transport.write_values(&writes).await {
                Ok(statuses) => {
                    let failed = statuses.iter().filter(|s| !s.is_good()).count();
                    if failed > 0 || statuses.len() != requests.len() {
                        tracing::warn!(
                            endpoint = %endpoint,
                            requested = requests.len(),
                            returned = statuses.len(),
                            failed,
                            "Batched write partially failed"
                        );
                    }
                    let responses = write_responses(&requests, &statuses);
                    context
                        .output()
                        .publish(Message::general_response(command, endpoint, responses));
                }
                Err(e) => {
                    e.log("group write");
                    for request in &requests {
                        context.fail(
                            &endpoint,
                            request.node(),
                            StatusCode::Error,
                            Some(e.to_string()),
                            request.request_id(),
                        );
                    }
                }
            }
        });

        Ok(OpResult::ok())
    }
}
