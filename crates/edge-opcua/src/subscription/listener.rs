// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport callbacks turned into output messages.
//!
//! [`DataChangeForwarder`] is registered per subscription and publishes the
//! values of each batch in notification order. [`LifecycleForwarder`] is
//! registered once per endpoint and reports publish failures and data loss
//! against whatever subscription the endpoint currently owns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::{
    CommandKind, DispatchOutput, EndpointId, ErrorReporter, Message, NodeRef, RequestId,
    Response, StatusCode, SubRequest,
};

use super::manager::SubscriptionManagerStats;
use super::registry::SubscriptionRegistry;
use super::validation::check_notification;
use crate::client::{NotificationListener, SubscriptionListener};
use crate::types::{DataChangeBatch, RevisedSubscription, UaStatus};

// =============================================================================
// DataChangeForwarder
// =============================================================================

/// Publishes data-change batches of one subscription.
pub(crate) struct DataChangeForwarder {
    endpoint: EndpointId,
    node: NodeRef,
    request_id: RequestId,
    created_with: (SubRequest, RevisedSubscription),
    registry: Arc<SubscriptionRegistry>,
    output: DispatchOutput,
    reporter: ErrorReporter,
    stats: Arc<SubscriptionManagerStats>,
    delivered: AtomicBool,
}

impl DataChangeForwarder {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        endpoint: EndpointId,
        node: NodeRef,
        request_id: RequestId,
        sub_request: SubRequest,
        revised: RevisedSubscription,
        registry: Arc<SubscriptionRegistry>,
        reporter: ErrorReporter,
        stats: Arc<SubscriptionManagerStats>,
    ) -> Self {
        Self {
            endpoint,
            node,
            request_id,
            created_with: (sub_request, revised),
            output: reporter.output().clone(),
            registry,
            reporter,
            stats,
            delivered: AtomicBool::new(false),
        }
    }

    /// Parameters currently in force for `subscription_id`.
    ///
    /// A modification replaces them in the registry; before that, or once the
    /// handle is gone, the creation parameters apply.
    fn parameters(&self, subscription_id: u32) -> (SubRequest, RevisedSubscription) {
        self.registry
            .get(&self.endpoint)
            .filter(|handle| handle.subscription_id() == subscription_id)
            .map(|handle| (handle.sub_request().clone(), *handle.revised()))
            .unwrap_or_else(|| self.created_with.clone())
    }

    fn check_conformance(&self, batch: &DataChangeBatch) {
        let (requested, revised) = self.parameters(batch.subscription_id);
        if !requested.conformance() {
            return;
        }
        if let Some(status) = check_notification(
            &requested,
            &revised,
            batch.items.len(),
            batch.publish_time,
            Utc::now(),
        ) {
            self.stats.record_error();
            self.reporter.report(
                &self.endpoint,
                Some(&self.node),
                status,
                Some(status.description().to_string()),
                self.request_id,
            );
        }
    }
}

#[async_trait]
impl NotificationListener for DataChangeForwarder {
    async fn on_data_change(&self, batch: DataChangeBatch) {
        self.check_conformance(&batch);

        let publish_time = batch.publish_time;
        for item in batch.items {
            let value = item.value.value;

            if !self.delivered.swap(true, Ordering::AcqRel) {
                self.output.publish(Message::general_response(
                    CommandKind::Subscribe,
                    self.endpoint.clone(),
                    vec![Response::new(self.node.clone(), value.clone(), self.request_id)],
                ));
            }

            let response = Response::new(self.node.clone(), value, self.request_id)
                .with_timestamp(publish_time);
            self.output
                .publish(Message::report(self.endpoint.clone(), vec![response]));
            self.stats.record_notification();
        }
    }
}

impl std::fmt::Debug for DataChangeForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChangeForwarder")
            .field("endpoint", &self.endpoint)
            .field("node", &self.node)
            .field("request_id", &self.request_id)
            .field("delivered", &self.delivered.load(Ordering::Relaxed))
            .finish()
    }
}

// =============================================================================
// LifecycleForwarder
// =============================================================================

/// Reports subscription lifecycle events of one endpoint.
pub(crate) struct LifecycleForwarder {
    endpoint: EndpointId,
    registry: Arc<SubscriptionRegistry>,
    reporter: ErrorReporter,
    stats: Arc<SubscriptionManagerStats>,
}

impl LifecycleForwarder {
    pub(crate) fn new(
        endpoint: EndpointId,
        registry: Arc<SubscriptionRegistry>,
        reporter: ErrorReporter,
        stats: Arc<SubscriptionManagerStats>,
    ) -> Self {
        Self {
            endpoint,
            registry,
            reporter,
            stats,
        }
    }

    fn report(&self, subscription_id: Option<u32>, status: StatusCode, detail: String) {
        let handle = self
            .registry
            .get(&self.endpoint)
            .filter(|h| subscription_id.map_or(true, |id| h.subscription_id() == id));
        let Some(handle) = handle else {
            tracing::warn!(
                endpoint = %self.endpoint,
                subscription_id = ?subscription_id,
                status = %status,
                detail = %detail,
                "Lifecycle event for unknown subscription"
            );
            return;
        };

        self.stats.record_error();
        self.reporter.report(
            &self.endpoint,
            Some(handle.node()),
            status,
            Some(detail),
            handle.request_id(),
        );
    }
}

impl SubscriptionListener for LifecycleForwarder {
    fn on_keep_alive(&self, subscription_id: u32, publish_time: DateTime<Utc>) {
        tracing::trace!(
            endpoint = %self.endpoint,
            subscription_id,
            publish_time = %publish_time,
            "Subscription keep-alive"
        );
    }

    fn on_status_changed(&self, subscription_id: u32, status: UaStatus) {
        tracing::info!(
            endpoint = %self.endpoint,
            subscription_id,
            status = %status,
            "Subscription status changed"
        );
    }

    fn on_publish_failure(&self, reason: &str) {
        self.report(None, StatusCode::Error, format!("publish failed: {}", reason));
    }

    fn on_data_lost(&self, subscription_id: u32) {
        self.report(
            Some(subscription_id),
            StatusCode::SubDataLoss,
            StatusCode::SubDataLoss.description().to_string(),
        );
    }

    fn on_transfer_failed(&self, subscription_id: u32, status: UaStatus) {
        tracing::warn!(
            endpoint = %self.endpoint,
            subscription_id,
            status = %status,
            "Subscription transfer failed"
        );
    }
}

impl std::fmt::Debug for LifecycleForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleForwarder")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::handle::SubscriptionHandle;
    use crate::types::{DataChangeItem, DataValue};
    use edge_core::{MessageKind, NodeId, SubOperation};

    fn revised(sub: &SubRequest) -> RevisedSubscription {
        RevisedSubscription {
            subscription_id: 9,
            publishing_interval: sub.publishing_interval(),
            lifetime_count: sub.lifetime_count(),
            max_keep_alive_count: sub.max_keep_alive_count(),
        }
    }

    fn batch(values: &[i32]) -> DataChangeBatch {
        DataChangeBatch {
            subscription_id: 9,
            publish_time: Utc::now(),
            items: values
                .iter()
                .map(|&v| DataChangeItem {
                    client_handle: 1,
                    monitored_item_id: 1,
                    value: DataValue::good(v),
                })
                .collect(),
        }
    }

    fn forwarder(sub: SubRequest) -> (DataChangeForwarder, DispatchOutput) {
        let output = DispatchOutput::new(64);
        let reporter = ErrorReporter::new(output.clone());
        let rev = revised(&sub);
        let forwarder = DataChangeForwarder::new(
            EndpointId::new("ep"),
            NodeRef::new(NodeId::numeric(2, 1)),
            RequestId::from_raw(42),
            sub,
            rev,
            Arc::new(SubscriptionRegistry::new()),
            reporter,
            Arc::new(SubscriptionManagerStats::new()),
        );
        (forwarder, output)
    }

    #[tokio::test]
    async fn test_first_value_sends_general_response() {
        let sub = SubRequest::builder(SubOperation::Create).build();
        let (forwarder, output) = forwarder(sub);
        let mut rx = output.subscribe();

        forwarder.on_data_change(batch(&[1])).await;
        forwarder.on_data_change(batch(&[2])).await;

        let kinds: Vec<_> = rx.drain().iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![MessageKind::GeneralResponse, MessageKind::Report, MessageKind::Report]
        );
    }

    #[tokio::test]
    async fn test_reports_carry_request_id_in_order() {
        let sub = SubRequest::builder(SubOperation::Create).build();
        let (forwarder, output) = forwarder(sub);
        let mut rx = output.subscribe();

        forwarder.on_data_change(batch(&[1, 2, 3])).await;

        let reports: Vec<_> = rx
            .drain()
            .into_iter()
            .filter(|m| m.kind() == MessageKind::Report)
            .collect();
        assert_eq!(reports.len(), 3);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.request_id(), Some(RequestId::from_raw(42)));
            assert_eq!(report.responses()[0].value().as_i64(), Some(i as i64 + 1));
            assert!(report.responses()[0].timestamp().is_some());
        }
    }

    #[tokio::test]
    async fn test_conformance_violation_reported_once_per_batch() {
        let sub = SubRequest::builder(SubOperation::Create)
            .lifetime_count(20)
            .max_keep_alive_count(10)
            .conformance(true)
            .build();
        let (forwarder, output) = forwarder(sub);
        let mut rx = output.subscribe();

        forwarder.on_data_change(batch(&[1, 2])).await;

        let errors: Vec<_> = rx
            .drain()
            .into_iter()
            .filter(|m| m.kind() == MessageKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error_report().map(|r| r.status),
            Some(StatusCode::SubLifetimeDifference)
        );
    }

    #[test]
    fn test_data_lost_reports_against_current_handle() {
        let output = DispatchOutput::new(16);
        let reporter = ErrorReporter::new(output.clone());
        let registry = Arc::new(SubscriptionRegistry::new());
        let ep = EndpointId::new("ep");
        let sub = SubRequest::builder(SubOperation::Create).build();
        registry.replace(
            ep.clone(),
            SubscriptionHandle::new(
                revised(&sub),
                sub,
                RequestId::from_raw(5),
                NodeRef::new(NodeId::numeric(2, 1)),
            ),
        );
        let lifecycle = LifecycleForwarder::new(
            ep,
            registry,
            reporter.clone(),
            Arc::new(SubscriptionManagerStats::new()),
        );
        let mut rx = output.subscribe();

        lifecycle.on_data_lost(8);
        assert!(rx.drain().is_empty());

        lifecycle.on_data_lost(9);
        let messages = rx.drain();
        assert_eq!(messages.len(), 1);
        let report = messages[0].error_report().unwrap();
        assert_eq!(report.status, StatusCode::SubDataLoss);
        assert_eq!(report.request_id, RequestId::from_raw(5));
    }
}
