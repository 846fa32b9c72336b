// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock OPC UA transport.
//!
//! [`MockTransport`] answers every service call from in-memory tables,
//! counts calls per service and records what the layer asked for. Listeners
//! registered by the subscription manager are captured so tests can drive
//! notifications and lifecycle events by hand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::{NodeId, Value};
use edge_opcua::{
    AttributeId, DataChangeBatch, DataChangeItem, DataValue, DeleteResults, MethodCallResult,
    MonitoredItemCreate, MonitoredItemModify, MonitoredItemResult, NotificationListener,
    OpcUaError, OpcUaResult, OpcUaTransport, RevisedSubscription, SubscriptionListener,
    SubscriptionParameters, UaStatus,
};
use parking_lot::Mutex;

/// Lifetime count revised when the request leaves it to the server.
pub const SERVER_LIFETIME_COUNT: u32 = 60;

/// Keep-alive count revised when the request leaves it to the server.
pub const SERVER_KEEP_ALIVE_COUNT: u32 = 10;

// =============================================================================
// MockTransport
// =============================================================================

/// An in-memory [`OpcUaTransport`].
pub struct MockTransport {
    /// Display name.
    name: String,

    /// Node values returned by value reads.
    values: Mutex<HashMap<NodeId, DataValue>>,

    /// Non-value attributes returned by attribute reads.
    attributes: Mutex<HashMap<(NodeId, AttributeId), DataValue>>,

    /// Property children returned by property reads, by browse name.
    properties: Mutex<HashMap<(NodeId, String), DataValue>>,

    /// Status returned for every write.
    write_status: Mutex<UaStatus>,

    /// Result returned for every method call.
    method_result: Mutex<MethodCallResult>,

    /// Scripted monitored item results; `None` accepts every item.
    monitored_item_results: Mutex<Option<Vec<MonitoredItemResult>>>,

    /// Scripted delete results; `None` returns GOOD per id.
    delete_results: Mutex<Option<DeleteResults>>,
    item_delete_results: Mutex<Option<Vec<UaStatus>>>,

    /// Scripted publishing mode results; `None` returns GOOD per id.
    publishing_results: Mutex<Option<Vec<UaStatus>>>,

    /// Next subscription id handed out.
    next_subscription_id: AtomicU32,

    /// Next monitored item id handed out.
    next_item_id: AtomicU32,

    /// Whether reads fail at the service level.
    fail_reads: AtomicBool,

    /// Whether writes fail at the service level.
    fail_writes: AtomicBool,

    /// Whether subscription services fail at the service level.
    fail_subscriptions: AtomicBool,

    /// Calls per service name.
    calls: Mutex<HashMap<&'static str, u64>>,

    /// Parameters of every create call.
    created: Mutex<Vec<SubscriptionParameters>>,

    /// Parameters of every modify call.
    modified: Mutex<Vec<(u32, SubscriptionParameters)>>,

    /// Monitored items of every create call.
    created_items: Mutex<Vec<(u32, MonitoredItemCreate)>>,

    /// Monitored items of every modify call.
    modified_items: Mutex<Vec<(u32, MonitoredItemModify)>>,

    /// Subscription ids of every delete call.
    deleted: Mutex<Vec<u32>>,

    /// Subscription id and sequence number of every republish call.
    republished: Mutex<Vec<(u32, u32)>>,

    /// Object id, method id and inputs of every method call.
    method_calls: Mutex<Vec<(NodeId, NodeId, Vec<Value>)>>,

    /// Captured lifecycle listeners.
    subscription_listeners: Mutex<Vec<Arc<dyn SubscriptionListener>>>,

    /// Captured data-change listeners per subscription.
    notification_listeners: Mutex<HashMap<u32, Vec<Arc<dyn NotificationListener>>>>,
}

impl MockTransport {
    /// Creates a mock that answers every call successfully.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
            write_status: Mutex::new(UaStatus::GOOD),
            method_result: Mutex::new(MethodCallResult::default()),
            monitored_item_results: Mutex::new(None),
            delete_results: Mutex::new(None),
            item_delete_results: Mutex::new(None),
            publishing_results: Mutex::new(None),
            next_subscription_id: AtomicU32::new(1),
            next_item_id: AtomicU32::new(100),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_subscriptions: AtomicBool::new(false),
            calls: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            modified: Mutex::new(Vec::new()),
            created_items: Mutex::new(Vec::new()),
            modified_items: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            republished: Mutex::new(Vec::new()),
            method_calls: Mutex::new(Vec::new()),
            subscription_listeners: Mutex::new(Vec::new()),
            notification_listeners: Mutex::new(HashMap::new()),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Sets the value of a node.
    pub fn set_value(&self, node_id: NodeId, value: impl Into<Value>) {
        self.values.lock().insert(node_id, DataValue::good(value));
    }

    /// Sets the full data value of a node.
    pub fn set_data_value(&self, node_id: NodeId, value: DataValue) {
        self.values.lock().insert(node_id, value);
    }

    /// Sets a non-value attribute of a node.
    pub fn set_attribute(&self, node_id: NodeId, attribute: AttributeId, value: impl Into<Value>) {
        self.attributes
            .lock()
            .insert((node_id, attribute), DataValue::good(value));
    }

    /// Sets a property child of a node.
    pub fn set_property(&self, node_id: NodeId, browse_name: &str, value: impl Into<Value>) {
        self.properties
            .lock()
            .insert((node_id, browse_name.to_string()), DataValue::good(value));
    }

    /// Sets the status returned for writes.
    pub fn set_write_status(&self, status: UaStatus) {
        *self.write_status.lock() = status;
    }

    /// Sets the result returned for method calls.
    pub fn set_method_result(&self, result: MethodCallResult) {
        *self.method_result.lock() = result;
    }

    /// Scripts the monitored item results of every create call.
    pub fn script_monitored_items(&self, results: Vec<MonitoredItemResult>) {
        *self.monitored_item_results.lock() = Some(results);
    }

    /// Scripts the response of every delete call.
    pub fn script_delete(&self, results: DeleteResults) {
        *self.delete_results.lock() = Some(results);
    }

    /// Scripts the response of every monitored item delete call.
    pub fn script_item_delete(&self, results: Vec<UaStatus>) {
        *self.item_delete_results.lock() = Some(results);
    }

    /// Scripts the response of every publishing mode call.
    pub fn script_publishing_mode(&self, results: Vec<UaStatus>) {
        *self.publishing_results.lock() = Some(results);
    }

    /// Makes reads fail at the service level.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes writes fail at the service level.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subscription services fail at the service level.
    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Calls made to one service.
    pub fn call_count(&self, service: &str) -> u64 {
        self.calls.lock().get(service).copied().unwrap_or(0)
    }

    /// Calls made to every service.
    pub fn total_calls(&self) -> u64 {
        self.calls.lock().values().sum()
    }

    /// Parameters of every create call, oldest first.
    pub fn created(&self) -> Vec<SubscriptionParameters> {
        self.created.lock().clone()
    }

    /// Parameters of every modify call, oldest first.
    pub fn modified(&self) -> Vec<(u32, SubscriptionParameters)> {
        self.modified.lock().clone()
    }

    /// Monitored items of every create call.
    pub fn created_items(&self) -> Vec<(u32, MonitoredItemCreate)> {
        self.created_items.lock().clone()
    }

    /// Monitored items of every modify call.
    pub fn modified_items(&self) -> Vec<(u32, MonitoredItemModify)> {
        self.modified_items.lock().clone()
    }

    /// Subscription ids of every delete call.
    pub fn deleted(&self) -> Vec<u32> {
        self.deleted.lock().clone()
    }

    /// Republish requests.
    pub fn republished(&self) -> Vec<(u32, u32)> {
        self.republished.lock().clone()
    }

    /// Method calls.
    pub fn method_calls(&self) -> Vec<(NodeId, NodeId, Vec<Value>)> {
        self.method_calls.lock().clone()
    }

    /// Number of lifecycle listeners registered.
    pub fn subscription_listener_count(&self) -> usize {
        self.subscription_listeners.lock().len()
    }

    /// Number of data-change listeners registered for a subscription.
    pub fn notification_listener_count(&self, subscription_id: u32) -> usize {
        self.notification_listeners
            .lock()
            .get(&subscription_id)
            .map_or(0, Vec::len)
    }

    // =========================================================================
    // Event Injection
    // =========================================================================

    /// Delivers one data-change batch with one item per value.
    pub async fn fire_data_change(&self, subscription_id: u32, values: Vec<Value>) {
        self.fire_data_change_at(subscription_id, Utc::now(), values).await;
    }

    /// Delivers one data-change batch stamped with `publish_time`.
    pub async fn fire_data_change_at(
        &self,
        subscription_id: u32,
        publish_time: DateTime<Utc>,
        values: Vec<Value>,
    ) {
        let listeners = self
            .notification_listeners
            .lock()
            .get(&subscription_id)
            .cloned()
            .unwrap_or_default();

        let batch = DataChangeBatch {
            subscription_id,
            publish_time,
            items: values
                .into_iter()
                .map(|value| DataChangeItem {
                    client_handle: 1,
                    monitored_item_id: 0,
                    value: DataValue::good(value),
                })
                .collect(),
        };

        for listener in listeners {
            listener.on_data_change(batch.clone()).await;
        }
    }

    /// Signals lost notifications for a subscription.
    pub fn fire_data_lost(&self, subscription_id: u32) {
        for listener in self.lifecycle_listeners() {
            listener.on_data_lost(subscription_id);
        }
    }

    /// Signals a failed publish request.
    pub fn fire_publish_failure(&self, reason: &str) {
        for listener in self.lifecycle_listeners() {
            listener.on_publish_failure(reason);
        }
    }

    /// Signals a keep-alive.
    pub fn fire_keep_alive(&self, subscription_id: u32) {
        for listener in self.lifecycle_listeners() {
            listener.on_keep_alive(subscription_id, Utc::now());
        }
    }

    fn lifecycle_listeners(&self) -> Vec<Arc<dyn SubscriptionListener>> {
        self.subscription_listeners.lock().clone()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn record(&self, service: &'static str) {
        *self.calls.lock().entry(service).or_insert(0) += 1;
    }

    fn injected(service: &str) -> OpcUaError {
        OpcUaError::service_failed(service, "injected failure")
    }

    fn check_reads(&self, service: &'static str) -> OpcUaResult<()> {
        self.record(service);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected(service));
        }
        Ok(())
    }

    fn check_writes(&self, service: &'static str) -> OpcUaResult<()> {
        self.record(service);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(service));
        }
        Ok(())
    }

    fn check_subscriptions(&self, service: &'static str) -> OpcUaResult<()> {
        self.record(service);
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(Self::injected(service));
        }
        Ok(())
    }

    fn value_of(&self, node_id: &NodeId) -> DataValue {
        self.values
            .lock()
            .get(node_id)
            .cloned()
            .unwrap_or_else(|| DataValue::bad(UaStatus::BAD_NODE_ID_UNKNOWN))
    }

    fn revise(&self, subscription_id: u32, params: &SubscriptionParameters) -> RevisedSubscription {
        RevisedSubscription {
            subscription_id,
            publishing_interval: params.publishing_interval,
            lifetime_count: params.lifetime_count.unwrap_or(SERVER_LIFETIME_COUNT),
            max_keep_alive_count: params.max_keep_alive_count.unwrap_or(SERVER_KEEP_ALIVE_COUNT),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new("mock-transport")
    }
}

#[async_trait]
impl OpcUaTransport for MockTransport {
    async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
    ) -> OpcUaResult<DataValue> {
        self.check_reads("read_attribute")?;
        if attribute == AttributeId::Value {
            return Ok(self.value_of(node_id));
        }
        Ok(self
            .attributes
            .lock()
            .get(&(node_id.clone(), attribute))
            .cloned()
            .unwrap_or_else(|| DataValue::bad(UaStatus::BAD_ATTRIBUTE_ID_INVALID)))
    }

    async fn read_property(&self, node_id: &NodeId, browse_name: &str) -> OpcUaResult<DataValue> {
        self.check_reads("read_property")?;
        Ok(self
            .properties
            .lock()
            .get(&(node_id.clone(), browse_name.to_string()))
            .cloned()
            .unwrap_or_else(|| DataValue::bad(UaStatus::BAD_NODE_ID_UNKNOWN)))
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<DataValue>> {
        self.check_reads("read_values")?;
        Ok(node_ids.iter().map(|id| self.value_of(id)).collect())
    }

    async fn write_value(&self, node_id: &NodeId, value: Value) -> OpcUaResult<UaStatus> {
        self.check_writes("write_value")?;
        let status = *self.write_status.lock();
        if status.is_good() {
            self.values.lock().insert(node_id.clone(), DataValue::good(value));
        }
        Ok(status)
    }

    async fn write_values(&self, writes: &[(NodeId, Value)]) -> OpcUaResult<Vec<UaStatus>> {
        self.check_writes("write_values")?;
        let status = *self.write_status.lock();
        let mut values = self.values.lock();
        Ok(writes
            .iter()
            .map(|(node_id, value)| {
                if status.is_good() {
                    values.insert(node_id.clone(), DataValue::good(value.clone()));
                }
                status
            })
            .collect())
    }

    async fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: Vec<Value>,
    ) -> OpcUaResult<MethodCallResult> {
        self.record("call_method");
        self.method_calls
            .lock()
            .push((object_id.clone(), method_id.clone(), inputs));
        Ok(self.method_result.lock().clone())
    }

    async fn create_subscription(
        &self,
        params: &SubscriptionParameters,
    ) -> OpcUaResult<RevisedSubscription> {
        self.check_subscriptions("create_subscription")?;
        let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        self.created.lock().push(params.clone());
        Ok(self.revise(subscription_id, params))
    }

    async fn modify_subscription(
        &self,
        subscription_id: u32,
        params: &SubscriptionParameters,
    ) -> OpcUaResult<RevisedSubscription> {
        self.check_subscriptions("modify_subscription")?;
        self.modified.lock().push((subscription_id, params.clone()));
        Ok(self.revise(subscription_id, params))
    }

    async fn delete_subscriptions(&self, subscription_ids: &[u32]) -> OpcUaResult<DeleteResults> {
        self.check_subscriptions("delete_subscriptions")?;
        self.deleted.lock().extend_from_slice(subscription_ids);
        Ok(self.delete_results.lock().clone().unwrap_or_else(|| DeleteResults {
            service_result: UaStatus::GOOD,
            results: vec![UaStatus::GOOD; subscription_ids.len()],
        }))
    }

    async fn set_publishing_mode(
        &self,
        _enabled: bool,
        subscription_ids: &[u32],
    ) -> OpcUaResult<Vec<UaStatus>> {
        self.check_subscriptions("set_publishing_mode")?;
        Ok(self
            .publishing_results
            .lock()
            .clone()
            .unwrap_or_else(|| vec![UaStatus::GOOD; subscription_ids.len()]))
    }

    async fn republish(&self, subscription_id: u32, sequence_number: u32) -> OpcUaResult<()> {
        self.check_subscriptions("republish")?;
        self.republished.lock().push((subscription_id, sequence_number));
        Ok(())
    }

    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemCreate],
    ) -> OpcUaResult<Vec<MonitoredItemResult>> {
        self.check_subscriptions("create_monitored_items")?;
        self.created_items
            .lock()
            .extend(items.iter().map(|item| (subscription_id, item.clone())));

        if let Some(results) = self.monitored_item_results.lock().clone() {
            return Ok(results);
        }
        Ok(items
            .iter()
            .map(|item| {
                MonitoredItemResult::accepted(
                    self.next_item_id.fetch_add(1, Ordering::SeqCst),
                    item.sampling_interval,
                    item.queue_size,
                )
            })
            .collect())
    }

    async fn modify_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemModify],
    ) -> OpcUaResult<Vec<MonitoredItemResult>> {
        self.check_subscriptions("modify_monitored_items")?;
        self.modified_items
            .lock()
            .extend(items.iter().map(|item| (subscription_id, item.clone())));
        Ok(items
            .iter()
            .map(|item| {
                MonitoredItemResult::accepted(
                    item.monitored_item_id,
                    item.sampling_interval,
                    item.queue_size,
                )
            })
            .collect())
    }

    async fn delete_monitored_items(
        &self,
        _subscription_id: u32,
        monitored_item_ids: &[u32],
    ) -> OpcUaResult<Vec<UaStatus>> {
        self.check_subscriptions("delete_monitored_items")?;
        Ok(self
            .item_delete_results
            .lock()
            .clone()
            .unwrap_or_else(|| vec![UaStatus::GOOD; monitored_item_ids.len()]))
    }

    fn add_subscription_listener(&self, listener: Arc<dyn SubscriptionListener>) {
        self.subscription_listeners.lock().push(listener);
    }

    fn add_notification_listener(
        &self,
        subscription_id: u32,
        listener: Arc<dyn NotificationListener>,
    ) {
        self.notification_listeners
            .lock()
            .entry(subscription_id)
            .or_default()
            .push(listener);
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("calls", &self.total_calls())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
