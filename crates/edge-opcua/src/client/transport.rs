// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! The transport is the connected protocol client of one endpoint. Connection,
//! security and encoding live behind it; this crate only issues service calls
//! and registers listeners.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::{NodeId, Value};

use crate::error::OpcUaResult;
use crate::types::{
    AttributeId, DataChangeBatch, DataValue, DeleteResults, MethodCallResult, MonitoredItemCreate,
    MonitoredItemModify, MonitoredItemResult, RevisedSubscription, SubscriptionParameters,
    UaStatus,
};

// =============================================================================
// Listeners
// =============================================================================

/// Subscription lifecycle events raised by the transport.
///
/// Every method defaults to a no-op.
pub trait SubscriptionListener: Send + Sync {
    /// A keep-alive arrived for a subscription.
    fn on_keep_alive(&self, _subscription_id: u32, _publish_time: DateTime<Utc>) {}

    /// The status of a subscription changed.
    fn on_status_changed(&self, _subscription_id: u32, _status: UaStatus) {}

    /// A publish request failed.
    fn on_publish_failure(&self, _reason: &str) {}

    /// Notifications were lost for a subscription.
    fn on_data_lost(&self, _subscription_id: u32) {}

    /// A subscription could not be transferred to a new session.
    fn on_transfer_failed(&self, _subscription_id: u32, _status: UaStatus) {}
}

/// Receives data-change notifications of one subscription.
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// Called once per notification, in transport order.
    async fn on_data_change(&self, batch: DataChangeBatch);
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Abstract transport trait for OPC UA communication.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; handles are shared between the
/// dispatcher, services and the subscription manager.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Reads one attribute of a node.
    async fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId)
        -> OpcUaResult<DataValue>;

    /// Reads the value of a property child of a node by browse name.
    async fn read_property(&self, node_id: &NodeId, browse_name: &str) -> OpcUaResult<DataValue>;

    /// Reads the values of several nodes in a single request.
    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<DataValue>>;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Writes one node value.
    async fn write_value(&self, node_id: &NodeId, value: Value) -> OpcUaResult<UaStatus>;

    /// Writes several node values in a single request.
    async fn write_values(&self, writes: &[(NodeId, Value)]) -> OpcUaResult<Vec<UaStatus>>;

    // =========================================================================
    // Method Calls
    // =========================================================================

    /// Calls a method on an object node.
    async fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: Vec<Value>,
    ) -> OpcUaResult<MethodCallResult>;

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Creates a subscription.
    async fn create_subscription(
        &self,
        params: &SubscriptionParameters,
    ) -> OpcUaResult<RevisedSubscription>;

    /// Modifies an existing subscription.
    async fn modify_subscription(
        &self,
        subscription_id: u32,
        params: &SubscriptionParameters,
    ) -> OpcUaResult<RevisedSubscription>;

    /// Deletes subscriptions, returning one status per id.
    async fn delete_subscriptions(&self, subscription_ids: &[u32]) -> OpcUaResult<DeleteResults>;

    /// Enables or disables publishing for subscriptions.
    async fn set_publishing_mode(
        &self,
        enabled: bool,
        subscription_ids: &[u32],
    ) -> OpcUaResult<Vec<UaStatus>>;

    /// Asks the server to retransmit a notification.
    async fn republish(&self, subscription_id: u32, sequence_number: u32) -> OpcUaResult<()>;

    // =========================================================================
    // Monitored Items
    // =========================================================================

    /// Creates monitored items in a subscription.
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemCreate],
    ) -> OpcUaResult<Vec<MonitoredItemResult>>;

    /// Modifies monitored items in a subscription.
    async fn modify_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemModify],
    ) -> OpcUaResult<Vec<MonitoredItemResult>>;

    /// Deletes monitored items from a subscription.
    async fn delete_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: &[u32],
    ) -> OpcUaResult<Vec<UaStatus>>;

    // =========================================================================
    // Listener Registration
    // =========================================================================

    /// Registers a lifecycle listener for every subscription of this session.
    fn add_subscription_listener(&self, listener: Arc<dyn SubscriptionListener>);

    /// Registers the data-change listener of one subscription.
    fn add_notification_listener(&self, subscription_id: u32, listener: Arc<dyn NotificationListener>);

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the transport display name for logging.
    fn display_name(&self) -> String {
        "opcua-transport".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingListener {
        lost: AtomicU32,
    }

    impl SubscriptionListener for CountingListener {
        fn on_data_lost(&self, _subscription_id: u32) {
            self.lost.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_subscription_listener_defaults() {
        let listener = CountingListener::default();
        listener.on_keep_alive(1, Utc::now());
        listener.on_status_changed(1, UaStatus::GOOD);
        listener.on_publish_failure("timeout");
        listener.on_transfer_failed(1, UaStatus::BAD_TIMEOUT);
        listener.on_data_lost(1);
        assert_eq!(listener.lost.load(Ordering::SeqCst), 1);
    }
}
