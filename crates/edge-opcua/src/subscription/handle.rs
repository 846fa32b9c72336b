// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Live subscription state of one endpoint.

use chrono::{DateTime, Utc};
use edge_core::{NodeRef, RequestId, SubRequest};

use crate::types::RevisedSubscription;

/// Snapshot of the subscription an endpoint currently owns.
///
/// Handles are immutable; modification stores a new snapshot under the same
/// subscription id.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionHandle {
    revised: RevisedSubscription,
    sub_request: SubRequest,
    monitored_item_ids: Vec<u32>,
    request_id: RequestId,
    node: NodeRef,
    created_at: DateTime<Utc>,
}

impl SubscriptionHandle {
    /// Creates a handle for a freshly created subscription.
    pub fn new(
        revised: RevisedSubscription,
        sub_request: SubRequest,
        request_id: RequestId,
        node: NodeRef,
    ) -> Self {
        Self {
            revised,
            sub_request,
            monitored_item_ids: Vec::new(),
            request_id,
            node,
            created_at: Utc::now(),
        }
    }

    /// Transport subscription id.
    pub fn subscription_id(&self) -> u32 {
        self.revised.subscription_id
    }

    /// Parameters revised by the server.
    pub fn revised(&self) -> &RevisedSubscription {
        &self.revised
    }

    /// Last applied subscription request.
    pub fn sub_request(&self) -> &SubRequest {
        &self.sub_request
    }

    /// Server ids of the monitored items.
    pub fn monitored_item_ids(&self) -> &[u32] {
        &self.monitored_item_ids
    }

    /// Request that created the subscription.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Node the subscription monitors.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a copy holding `ids` as monitored items.
    pub fn with_monitored_items(&self, ids: Vec<u32>) -> Self {
        Self {
            monitored_item_ids: ids,
            ..self.clone()
        }
    }

    /// Returns a copy carrying a modification. The subscription id is kept.
    pub fn modified(&self, sub_request: SubRequest, revised: RevisedSubscription) -> Self {
        Self {
            revised: RevisedSubscription {
                subscription_id: self.revised.subscription_id,
                ..revised
            },
            sub_request,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{NodeId, SubOperation};

    fn revised(id: u32, interval: f64) -> RevisedSubscription {
        RevisedSubscription {
            subscription_id: id,
            publishing_interval: interval,
            lifetime_count: 60,
            max_keep_alive_count: 10,
        }
    }

    #[test]
    fn test_modified_keeps_subscription_id() {
        let handle = SubscriptionHandle::new(
            revised(7, 1000.0),
            SubRequest::builder(SubOperation::Create).build(),
            RequestId::from_raw(1),
            NodeRef::new(NodeId::numeric(2, 1)),
        )
        .with_monitored_items(vec![11]);

        let modify = SubRequest::builder(SubOperation::Modify)
            .publishing_interval(500.0)
            .build();
        let next = handle.modified(modify.clone(), revised(99, 500.0));

        assert_eq!(next.subscription_id(), 7);
        assert_eq!(next.revised().publishing_interval, 500.0);
        assert_eq!(next.sub_request(), &modify);
        assert_eq!(next.monitored_item_ids(), &[11]);
        assert_eq!(next.request_id(), RequestId::from_raw(1));
    }
}
