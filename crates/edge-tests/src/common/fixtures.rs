// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pre-built endpoints, nodes and subscription requests.

use edge_core::{EndpointId, NodeId, SubOperation, SubRequest};
use edge_opcua::{ArrayKind, NodeShape};

/// Endpoint served by the harness mock.
pub const ENDPOINT: &str = "plc-1";

/// Endpoint without a session.
pub const OFFLINE_ENDPOINT: &str = "plc-offline";

// =============================================================================
// Nodes
// =============================================================================

/// Fixture node ids and the services registered for them.
pub struct NodeFixtures;

impl NodeFixtures {
    /// Scalar temperature node.
    pub fn temperature() -> NodeId {
        NodeId::numeric(2, 1001)
    }

    /// Scalar pressure node.
    pub fn pressure() -> NodeId {
        NodeId::numeric(2, 1002)
    }

    /// Plain array node.
    pub fn spectrum() -> NodeId {
        NodeId::string(2, "Spectrum")
    }

    /// XY array node.
    pub fn curve() -> NodeId {
        NodeId::string(2, "Curve")
    }

    /// Object owning the fixture method.
    pub fn pump() -> NodeId {
        NodeId::string(2, "Pump")
    }

    /// Fixture method.
    pub fn start_method() -> NodeId {
        NodeId::string(2, "Pump.Start")
    }

    /// Alias, shape and node of every service the harness registers.
    pub fn services() -> Vec<(&'static str, NodeShape, NodeId)> {
        vec![
            ("temperature", NodeShape::Scalar, Self::temperature()),
            ("pressure", NodeShape::Scalar, Self::pressure()),
            ("spectrum", NodeShape::ArrayItem(ArrayKind::Plain), Self::spectrum()),
            ("curve", NodeShape::ArrayItem(ArrayKind::Xy), Self::curve()),
        ]
    }
}

/// Harness endpoint id.
pub fn endpoint() -> EndpointId {
    EndpointId::new(ENDPOINT)
}

// =============================================================================
// Subscription Requests
// =============================================================================

/// Fixture subscription requests.
pub struct SubFixtures;

impl SubFixtures {
    /// Create with 1000 ms publishing, queue 1 and 500 ms sampling.
    pub fn create() -> SubRequest {
        SubRequest::builder(SubOperation::Create)
            .publishing_interval(1000.0)
            .sampling_interval(500.0)
            .queue_size(1)
            .build()
    }

    /// Create with explicit parameters and conformance checks.
    pub fn conformance(lifetime_count: u32, max_keep_alive_count: u32) -> SubRequest {
        SubRequest::builder(SubOperation::Create)
            .publishing_interval(1000.0)
            .sampling_interval(500.0)
            .queue_size(1)
            .lifetime_count(lifetime_count)
            .max_keep_alive_count(max_keep_alive_count)
            .conformance(true)
            .build()
    }

    /// Modify to a new sampling interval.
    pub fn modify(sampling_interval: f64) -> SubRequest {
        SubRequest::builder(SubOperation::Modify)
            .publishing_interval(1000.0)
            .sampling_interval(sampling_interval)
            .queue_size(1)
            .build()
    }

    /// Delete.
    pub fn delete() -> SubRequest {
        SubRequest::builder(SubOperation::Delete).build()
    }

    /// Republish.
    pub fn republish() -> SubRequest {
        SubRequest::builder(SubOperation::Republish).build()
    }
}
