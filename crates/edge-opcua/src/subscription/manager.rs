// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription lifecycle per endpoint.
//!
//! ```text
//!                 Create                    Modify / Republish
//!   ┌──────────────┐ ──────────▶ ┌──────────┐ ◀──────┐
//!   │NoSubscription│             │  Active  │ ───────┘
//!   └──────────────┘ ◀────────── └──────────┘
//!                      Delete        │ ▲
//!                                    └─┘ Create (replaces)
//! ```
//!
//! Every failure is reported through the [`ErrorReporter`] with the id of the
//! request that caused it, and also returned to the caller.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use edge_core::{
    EndpointId, ErrorReporter, Message, OpResult, Request, StatusCode, SubOperation, SubRequest,
};

use super::handle::SubscriptionHandle;
use super::listener::{DataChangeForwarder, LifecycleForwarder};
use super::registry::SubscriptionRegistry;
use super::validation::{check_delete_results, check_monitored_items};
use crate::client::{OpcUaTransport, SessionLookup};
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult, SubscriptionError};
use crate::service::single_request;
use crate::types::{
    AttributeId, MonitoredItemCreate, MonitoredItemModify, MonitoringMode, SubscriptionParameters,
};

/// Client handle of the single monitored item of a subscription.
const CLIENT_HANDLE: u32 = 1;

// =============================================================================
// SubscriptionManager
// =============================================================================

/// Owns the subscription of every endpoint.
pub struct SubscriptionManager {
    sessions: Arc<dyn SessionLookup>,
    registry: Arc<SubscriptionRegistry>,
    reporter: ErrorReporter,
    lifecycle_endpoints: DashSet<EndpointId>,
    republish_sequence: AtomicU32,
    stats: Arc<SubscriptionManagerStats>,
}

impl SubscriptionManager {
    /// Creates a manager with no subscriptions.
    pub fn new(sessions: Arc<dyn SessionLookup>, reporter: ErrorReporter) -> Self {
        Self {
            sessions,
            registry: Arc::new(SubscriptionRegistry::new()),
            reporter,
            lifecycle_endpoints: DashSet::new(),
            republish_sequence: AtomicU32::new(1),
            stats: Arc::new(SubscriptionManagerStats::new()),
        }
    }

    /// Executes the subscribe request carried by `message`.
    pub async fn handle(&self, message: &Message) -> OpResult {
        let request = match single_request(message) {
            Ok(request) => request,
            Err(e) => {
                e.log("subscription");
                self.stats.record_error();
                return OpResult::status(e.status_code());
            }
        };
        let endpoint = message.endpoint();

        let outcome = match request.sub_request() {
            None => Err(OpcUaError::subscription(SubscriptionError::MissingParameters)),
            Some(sub) => match sub.operation() {
                SubOperation::Create => self.create(endpoint, request, sub).await,
                SubOperation::Modify => self.modify(endpoint, request, sub).await,
                SubOperation::Delete => self.delete(endpoint, request).await,
                SubOperation::Republish => self.republish(endpoint).await,
            },
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                e.log("subscription");
                let status = e.status_code();
                self.fail(endpoint, request, status, e.to_string());
                OpResult::status(status)
            }
        }
    }

    /// Deletes every live subscription and empties the registry.
    ///
    /// Returns the number of subscriptions torn down.
    pub async fn shutdown(&self) -> usize {
        let handles = self.registry.drain();
        let count = handles.len();

        for (endpoint, handle) in handles {
            let transport = match self.sessions.session(&endpoint) {
                Ok(transport) => transport,
                Err(e) => {
                    e.log("subscription shutdown");
                    continue;
                }
            };
            match transport.delete_subscriptions(&[handle.subscription_id()]).await {
                Ok(_) => {
                    self.stats.record_deleted();
                    tracing::debug!(
                        endpoint = %endpoint,
                        subscription_id = handle.subscription_id(),
                        "Subscription deleted on shutdown"
                    );
                }
                Err(e) => e.log("subscription shutdown"),
            }
        }

        tracing::info!(subscriptions = count, "Subscription manager stopped");
        count
    }

    /// Current subscription of an endpoint.
    pub fn handle_for(&self, endpoint: &EndpointId) -> Option<Arc<SubscriptionHandle>> {
        self.registry.get(endpoint)
    }

    /// Number of endpoints with a live subscription.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &SubscriptionManagerStats {
        &self.stats
    }

    // =========================================================================
    // Operations
    // =========================================================================

    async fn create(
        &self,
        endpoint: &EndpointId,
        request: &Request,
        sub: &SubRequest,
    ) -> OpcUaResult<OpResult> {
        let node_id = request.node().node_id.clone().ok_or_else(|| {
            OpcUaError::configuration(ConfigurationError::invalid_request(
                "subscribe request has no node id",
            ))
        })?;
        let transport = self.sessions.session(endpoint)?;

        let parameters = if sub.conformance() {
            SubscriptionParameters::explicit(sub)
        } else {
            SubscriptionParameters::with_interval(sub.publishing_interval())
        };

        let started = Instant::now();
        let revised = transport
            .create_subscription(&parameters)
            .await
            .map_err(|e| {
                OpcUaError::subscription(SubscriptionError::creation_failed(e.to_string()))
            })?;
        let subscription_id = revised.subscription_id;

        tracing::info!(
            endpoint = %endpoint,
            subscription_id,
            publishing_interval = revised.publishing_interval,
            lifetime_count = revised.lifetime_count,
            max_keep_alive_count = revised.max_keep_alive_count,
            "Subscription created"
        );

        self.ensure_lifecycle_listener(endpoint, transport.as_ref());
        transport.add_notification_listener(
            subscription_id,
            Arc::new(DataChangeForwarder::new(
                endpoint.clone(),
                request.node().clone(),
                request.request_id(),
                sub.clone(),
                revised,
                self.registry.clone(),
                self.reporter.clone(),
                self.stats.clone(),
            )),
        );

        let handle = SubscriptionHandle::new(
            revised,
            sub.clone(),
            request.request_id(),
            request.node().clone(),
        );
        if let Some(previous) = self.registry.replace(endpoint.clone(), handle) {
            self.discard(endpoint, transport.as_ref(), &previous).await;
        }
        self.stats.record_created(started.elapsed());

        let item = MonitoredItemCreate {
            node_id,
            attribute: AttributeId::Value,
            client_handle: CLIENT_HANDLE,
            sampling_interval: sub.sampling_interval(),
            queue_size: sub.queue_size(),
            discard_oldest: true,
            mode: MonitoringMode::Reporting,
        };

        match transport
            .create_monitored_items(subscription_id, std::slice::from_ref(&item))
            .await
        {
            Ok(results) => {
                for issue in check_monitored_items(sub.sampling_interval(), sub.queue_size(), &results)
                {
                    self.fail(endpoint, request, issue.status, issue.detail);
                }

                let mut ids: Vec<u32> = results
                    .iter()
                    .filter(|r| r.status.is_good() && r.monitored_item_id != 0)
                    .map(|r| r.monitored_item_id)
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                tracing::debug!(
                    endpoint = %endpoint,
                    subscription_id,
                    items = ids.len(),
                    "Monitored items created"
                );
                self.registry
                    .update_if(endpoint, subscription_id, |h| h.with_monitored_items(ids));
            }
            Err(e) => {
                e.log("create monitored items");
                self.fail(endpoint, request, StatusCode::Error, e.to_string());
            }
        }

        Ok(OpResult::ok())
    }

    async fn modify(
        &self,
        endpoint: &EndpointId,
        request: &Request,
        sub: &SubRequest,
    ) -> OpcUaResult<OpResult> {
        let handle = self.active(endpoint)?;
        let transport = self.sessions.session(endpoint)?;
        let subscription_id = handle.subscription_id();

        let revised = transport
            .modify_subscription(subscription_id, &SubscriptionParameters::explicit(sub))
            .await?;

        let modifies: Vec<MonitoredItemModify> = handle
            .monitored_item_ids()
            .iter()
            .map(|&monitored_item_id| MonitoredItemModify {
                monitored_item_id,
                client_handle: CLIENT_HANDLE,
                sampling_interval: sub.sampling_interval(),
                queue_size: sub.queue_size(),
                discard_oldest: true,
            })
            .collect();
        if !modifies.is_empty() {
            match transport.modify_monitored_items(subscription_id, &modifies).await {
                Ok(results) => {
                    let rejected = results.iter().filter(|r| !r.status.is_good()).count();
                    if rejected > 0 {
                        tracing::warn!(
                            endpoint = %endpoint,
                            subscription_id,
                            rejected,
                            "Monitored item modification rejected"
                        );
                    }
                }
                Err(e) => {
                    e.log("modify monitored items");
                    self.fail(endpoint, request, StatusCode::Error, e.to_string());
                }
            }
        }

        match transport
            .set_publishing_mode(sub.publishing_enabled(), &[subscription_id])
            .await
        {
            Ok(results) if results.is_empty() => {
                let e = SubscriptionError::EmptyPublishingResult { subscription_id };
                self.fail(endpoint, request, e.status_code(), e.to_string());
            }
            Ok(_) => {}
            Err(e) => e.log("set publishing mode"),
        }

        self.registry
            .update_if(endpoint, subscription_id, |h| h.modified(sub.clone(), revised));
        self.stats.record_modified();

        tracing::info!(
            endpoint = %endpoint,
            subscription_id,
            publishing_interval = revised.publishing_interval,
            sampling_interval = sub.sampling_interval(),
            "Subscription modified"
        );
        Ok(OpResult::ok())
    }

    async fn delete(&self, endpoint: &EndpointId, request: &Request) -> OpcUaResult<OpResult> {
        let handle = self.active(endpoint)?;
        let transport = self.sessions.session(endpoint)?;
        let subscription_id = handle.subscription_id();

        if !handle.monitored_item_ids().is_empty() {
            match transport
                .delete_monitored_items(subscription_id, handle.monitored_item_ids())
                .await
            {
                Ok(statuses) => {
                    let requested = handle.monitored_item_ids().len();
                    if statuses.len() != requested {
                        tracing::warn!(
                            endpoint = %endpoint,
                            subscription_id,
                            requested,
                            returned = statuses.len(),
                            "Monitored item deletion returned a mismatched result count"
                        );
                        self.stats.record_item_delete_mismatch();
                    }
                    let failed = statuses.iter().filter(|s| !s.is_good()).count();
                    if failed > 0 {
                        tracing::warn!(
                            endpoint = %endpoint,
                            subscription_id,
                            failed,
                            "Monitored item deletion failed"
                        );
                    }
                }
                Err(e) => e.log("delete monitored items"),
            }
        }

        let response = transport.delete_subscriptions(&[subscription_id]).await?;
        self.registry.remove_if(endpoint, subscription_id);
        self.stats.record_deleted();
        tracing::info!(endpoint = %endpoint, subscription_id, "Subscription deleted");

        let mut result = OpResult::ok();
        for (status, server_status) in check_delete_results(1, &response) {
            self.fail(
                endpoint,
                request,
                status,
                format!("{} ({})", status.description(), server_status),
            );
            if result.is_ok() {
                result = OpResult::status(status);
            }
        }
        Ok(result)
    }

    async fn republish(&self, endpoint: &EndpointId) -> OpcUaResult<OpResult> {
        let handle = self.active(endpoint)?;
        let transport = self.sessions.session(endpoint)?;
        let sequence = self.republish_sequence.fetch_add(1, Ordering::Relaxed);

        match transport.republish(handle.subscription_id(), sequence).await {
            Ok(()) => tracing::debug!(
                endpoint = %endpoint,
                subscription_id = handle.subscription_id(),
                sequence,
                "Republish requested"
            ),
            Err(e) => e.log("republish"),
        }
        self.stats.record_republished();
        Ok(OpResult::ok())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn active(&self, endpoint: &EndpointId) -> OpcUaResult<Arc<SubscriptionHandle>> {
        self.registry.get(endpoint).ok_or_else(|| {
            OpcUaError::subscription(SubscriptionError::no_active(endpoint.as_str()))
        })
    }

    fn ensure_lifecycle_listener(&self, endpoint: &EndpointId, transport: &dyn OpcUaTransport) {
        if self.lifecycle_endpoints.insert(endpoint.clone()) {
            transport.add_subscription_listener(Arc::new(LifecycleForwarder::new(
                endpoint.clone(),
                self.registry.clone(),
                self.reporter.clone(),
                self.stats.clone(),
            )));
        }
    }

    /// Deletes a replaced subscription. Failures are only logged.
    async fn discard(
        &self,
        endpoint: &EndpointId,
        transport: &dyn OpcUaTransport,
        previous: &SubscriptionHandle,
    ) {
        match transport.delete_subscriptions(&[previous.subscription_id()]).await {
            Ok(_) => tracing::info!(
                endpoint = %endpoint,
                subscription_id = previous.subscription_id(),
                "Replaced subscription deleted"
            ),
            Err(e) => e.log("delete replaced subscription"),
        }
    }

    fn fail(&self, endpoint: &EndpointId, request: &Request, status: StatusCode, detail: String) {
        self.stats.record_error();
        self.reporter.report(
            endpoint,
            Some(request.node()),
            status,
            Some(detail),
            request.request_id(),
        );
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("subscriptions", &self.registry.len())
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Statistics for the subscription manager.
#[derive(Debug)]
pub struct SubscriptionManagerStats {
    /// Total subscriptions created.
    created: AtomicU64,

    /// Total subscriptions modified.
    modified: AtomicU64,

    /// Total subscriptions deleted.
    deleted: AtomicU64,

    /// Total republish requests.
    republished: AtomicU64,

    /// Total notification values forwarded.
    notifications: AtomicU64,

    /// Total reported failures.
    errors: AtomicU64,

    /// Monitored item deletions whose result count did not match.
    item_delete_mismatches: AtomicU64,

    /// Total time spent creating subscriptions (microseconds).
    total_creation_time_us: AtomicU64,
}

impl SubscriptionManagerStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            modified: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
            republished: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            item_delete_mismatches: AtomicU64::new(0),
            total_creation_time_us: AtomicU64::new(0),
        }
    }

    /// Records a subscription creation.
    pub fn record_created(&self, duration: Duration) {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.total_creation_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a modification.
    pub fn record_modified(&self) {
        self.modified.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a deletion.
    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a republish request.
    pub fn record_republished(&self) {
        self.republished.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a forwarded notification value.
    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reported failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a monitored item deletion with a mismatched result count.
    pub fn record_item_delete_mismatch(&self) {
        self.item_delete_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total subscriptions created.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Returns total subscriptions modified.
    pub fn modified(&self) -> u64 {
        self.modified.load(Ordering::Relaxed)
    }

    /// Returns total subscriptions deleted.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    /// Returns total republish requests.
    pub fn republished(&self) -> u64 {
        self.republished.load(Ordering::Relaxed)
    }

    /// Returns total notification values forwarded.
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Returns total reported failures.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns monitored item deletions with a mismatched result count.
    pub fn item_delete_mismatches(&self) -> u64 {
        self.item_delete_mismatches.load(Ordering::Relaxed)
    }

    /// Returns average subscription creation time.
    pub fn average_creation_time(&self) -> Duration {
        let count = self.created();
        if count == 0 {
            return Duration::ZERO;
        }
        let total_us = self.total_creation_time_us.load(Ordering::Relaxed);
        Duration::from_micros(total_us / count)
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.created.store(0, Ordering::Relaxed);
        self.modified.store(0, Ordering::Relaxed);
        self.deleted.store(0, Ordering::Relaxed);
        self.republished.store(0, Ordering::Relaxed);
        self.notifications.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.item_delete_mismatches.store(0, Ordering::Relaxed);
        self.total_creation_time_us.store(0, Ordering::Relaxed);
    }
}

impl Default for SubscriptionManagerStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
