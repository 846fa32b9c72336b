// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value access for one node of any shape.

use async_trait::async_trait;
use edge_core::{CommandKind, EndpointId, Message, NodeAttribute, NodeId, OpResult, StatusCode};
use parking_lot::RwLock;

use super::metadata::{access_mode, axis_range, range_bounds, units_name, usable};
use super::{
    response_command, single_request, ArrayKind, NodeMetadata, NodeShape, ServiceContext,
    ValueAccessService,
};
use crate::client::OpcUaTransport;
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult, OperationError};
use crate::types::{AttributeId, DataValue};

/// Serves one node, dispatching on its [`NodeShape`].
pub struct ValueAccess {
    alias: String,
    shape: NodeShape,
    node_id: NodeId,
    endpoint: EndpointId,
    context: ServiceContext,
    metadata: RwLock<Option<NodeMetadata>>,
}

impl ValueAccess {
    /// Creates a service for `node_id` on `endpoint`.
    pub fn new(
        alias: impl Into<String>,
        shape: NodeShape,
        node_id: NodeId,
        endpoint: impl Into<EndpointId>,
        context: ServiceContext,
    ) -> Self {
        Self {
            alias: alias.into(),
            shape,
            node_id,
            endpoint: endpoint.into(),
            context,
            metadata: RwLock::new(None),
        }
    }

    /// Shape of the served node.
    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    /// Served node.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Endpoint used for metadata bootstrap.
    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    fn target_node(&self, message: &Message) -> NodeId {
        message
            .request()
            .and_then(|r| r.node().node_id.clone())
            .unwrap_or_else(|| self.node_id.clone())
    }

    fn unsupported(&self, attribute: NodeAttribute) -> OpcUaError {
        OpcUaError::operation(OperationError::not_supported(
            attribute.to_string(),
            self.shape.to_string(),
        ))
    }

    async fn property(
        &self,
        transport: &dyn OpcUaTransport,
        attribute: NodeAttribute,
    ) -> OpcUaResult<DataValue> {
        if !self.shape.supports(attribute) {
            return Err(self.unsupported(attribute));
        }
        read_target(transport, &self.node_id, attribute).await
    }
}

/// Error for a read that returned no usable value.
fn unusable(node_id: &NodeId, data: &DataValue) -> OpcUaError {
    if data.status.is_good() {
        OpcUaError::operation(OperationError::empty_value(node_id.to_string()))
    } else {
        OpcUaError::bad_status(node_id.to_string(), data.status)
    }
}

async fn read_target(
    transport: &dyn OpcUaTransport,
    node_id: &NodeId,
    attribute: NodeAttribute,
) -> OpcUaResult<DataValue> {
    match attribute.property_name() {
        Some(browse_name) => transport.read_property(node_id, browse_name).await,
        None => transport.read_attribute(node_id, AttributeId::Value).await,
    }
}

#[async_trait]
impl ValueAccessService for ValueAccess {
    fn alias(&self) -> &str {
        &self.alias
    }

    async fn read_sync(&self, message: &Message) -> OpcUaResult<OpResult> {
        let request = single_request(message)?;
        let attribute = request.node().attribute;
        if !self.shape.supports(attribute) {
            return Err(self.unsupported(attribute));
        }

        let transport = self.context.sessions().session(message.endpoint())?;
        let node_id = self.target_node(message);
        let data = read_target(transport.as_ref(), &node_id, attribute).await?;
        if !data.is_usable() {
            return Err(unusable(&node_id, &data));
        }

        self.context.respond(
            response_command(message, CommandKind::ReadSync),
            message.endpoint(),
            request,
            data.value.clone(),
            data.source_timestamp,
        );
        Ok(OpResult::ok_with(data.value))
    }

    async fn read_async(&self, message: &Message) -> OpcUaResult<OpResult> {
        let request = single_request(message)?;
        let attribute = request.node().attribute;
        if !self.shape.supports(attribute) {
            return Err(self.unsupported(attribute));
        }

        let transport = self.context.sessions().session(message.endpoint())?;
        let node_id = self.target_node(message);
        let context = self.context.clone();
        let endpoint = message.endpoint().clone();
        let command = response_command(message, CommandKind::Read);
        let request = request.clone();

        tokio::spawn(async move {
            match read_target(transport.as_ref(), &node_id, attribute).await {
                Ok(data) if data.is_usable() => {
                    context.respond(command, &endpoint, &request, data.value, data.source_timestamp)
                }
                Ok(data) => {
                    let e = unusable(&node_id, &data);
                    e.log("read_async");
                    context.fail(
                        &endpoint,
                        request.node(),
                        e.status_code(),
                        Some(e.to_string()),
                        request.request_id(),
                    );
                }
                Err(e) => {
                    e.log("read_async");
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

        Ok(OpResult::ok())
    }

    async fn write(&self, message: &Message) -> OpcUaResult<OpResult> {
        let request = single_request(message)?;
        if !self.shape.is_writable() {
            tracing::debug!(alias = %self.alias, shape = %self.shape, "Write ignored");
            return Ok(OpResult::ok());
        }

        let value = match (request.node().attribute, request.value()) {
            (NodeAttribute::Value, Some(value)) => value.clone(),
            (_, None) => {
                return Err(OpcUaError::configuration(ConfigurationError::invalid_request(
                    "write request carries no value",
                )));
            }
            (attribute, Some(_)) => {
                return Err(OpcUaError::operation(OperationError::not_supported(
                    "write",
                    attribute.to_string(),
                )));
            }
        };

        let transport = self.context.sessions().session(message.endpoint())?;
        let node_id = self.target_node(message);
        let context = self.context.clone();
        let endpoint = message.endpoint().clone();
        let command = response_command(message, CommandKind::Write);
        let request = request.clone();

        tokio::spawn(async move {
            match transport.write_value(&node_id, value).await {
                Ok(status) if status.is_good() => {
                    context.respond(command, &endpoint, &request, status.code().into(), None)
                }
                Ok(status) => {
                    let e = OpcUaError::bad_status(node_id.to_string(), status);
                    e.log("write");
                    context.fail(
                        &endpoint,
                        request.node(),
                        e.status_code(),
                        Some(e.to_string()),
                        request.request_id(),
                    );
                }
                Err(e) => {
                    e.log("write");
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

        Ok(OpResult::ok())
    }

    async fn bootstrap_metadata(&self) -> OpcUaResult<NodeMetadata> {
        let transport = self.context.sessions().session(&self.endpoint)?;
        let t = transport.as_ref();
        let node = &self.node_id;

        let (
            data_type,
            access,
            description,
            definition,
            precision,
            units,
            range,
            x_axis,
            scale,
        ) = tokio::join!(
            t.read_attribute(node, AttributeId::DataType),
            t.read_attribute(node, AttributeId::AccessLevel),
            t.read_attribute(node, AttributeId::Description),
            self.property(t, NodeAttribute::Definition),
            self.property(t, NodeAttribute::ValuePrecision),
            self.property(t, NodeAttribute::EngineeringUnits),
            self.property(t, NodeAttribute::EuRange),
            self.property(t, NodeAttribute::XAxisDefinition),
            self.property(t, NodeAttribute::AxisScaleType),
        );

        let mut metadata = NodeMetadata {
            data_type: usable("data_type", data_type).map(|v| v.to_string()),
            access: usable("access", access)
                .and_then(|v| v.as_i64())
                .map(|level| access_mode(level).to_string()),
            description: usable("description", description).map(|v| v.to_string()),
            definition: usable("definition", definition).map(|v| v.to_string()),
            precision: usable("precision", precision).map(|v| v.to_string()),
            units: usable("units", units).map(|v| units_name(&v)),
            scale: usable("scale", scale).map(|v| v.to_string()),
            ..Default::default()
        };

        let range = usable("range", range);
        // Only XY bounds combine the X axis range with the value range.
        let x_axis = match self.shape {
            NodeShape::ArrayItem(ArrayKind::Xy) => usable("x_axis", x_axis),
            _ => None,
        };
        if let Some((low, high)) = range.as_ref().and_then(range_bounds) {
            match x_axis.as_ref().and_then(axis_range) {
                Some((x_low, x_high)) => {
                    metadata.min = Some(format!("X:{} Y:{}", x_low, low));
                    metadata.max = Some(format!("X:{} Y:{}", x_high, high));
                }
                None => {
                    metadata.min = Some(low.to_string());
                    metadata.max = Some(high.to_string());
                }
            }
        }

        tracing::info!(
            alias = %self.alias,
            shape = %self.shape,
            fields = metadata.collected(),
            "Metadata bootstrapped"
        );
        *self.metadata.write() = Some(metadata.clone());
        Ok(metadata)
    }

    fn metadata(&self) -> Option<NodeMetadata> {
        self.metadata.read().clone()
    }
}

impl std::fmt::Debug for ValueAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueAccess")
            .field("alias", &self.alias)
            .field("shape", &self.shape)
            .field("node_id", &self.node_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
