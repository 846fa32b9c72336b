// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint to subscription map.
//!
//! At most one handle exists per endpoint. Writers replace atomically;
//! updates and removals compare the subscription id first, so an operation
//! on an older subscription never touches a newer one.

use std::sync::Arc;

use dashmap::DashMap;
use edge_core::EndpointId;

use super::handle::SubscriptionHandle;

/// Concurrent endpoint to handle map.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    handles: DashMap<EndpointId, Arc<SubscriptionHandle>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle`, returning the one it replaced.
    pub fn replace(
        &self,
        endpoint: EndpointId,
        handle: SubscriptionHandle,
    ) -> Option<Arc<SubscriptionHandle>> {
        self.handles.insert(endpoint, Arc::new(handle))
    }

    /// Current handle of an endpoint.
    pub fn get(&self, endpoint: &EndpointId) -> Option<Arc<SubscriptionHandle>> {
        self.handles.get(endpoint).map(|r| r.value().clone())
    }

    /// Replaces the handle with `update(handle)` if it still belongs to
    /// `subscription_id`. Returns `true` if updated.
    pub fn update_if<F>(&self, endpoint: &EndpointId, subscription_id: u32, update: F) -> bool
    where
        F: FnOnce(&SubscriptionHandle) -> SubscriptionHandle,
    {
        match self.handles.get_mut(endpoint) {
            Some(mut entry) if entry.subscription_id() == subscription_id => {
                let next = update(entry.value());
                *entry.value_mut() = Arc::new(next);
                true
            }
            _ => false,
        }
    }

    /// Removes the handle if it still belongs to `subscription_id`.
    pub fn remove_if(
        &self,
        endpoint: &EndpointId,
        subscription_id: u32,
    ) -> Option<Arc<SubscriptionHandle>> {
        self.handles
            .remove_if(endpoint, |_, handle| handle.subscription_id() == subscription_id)
            .map(|(_, handle)| handle)
    }

    /// Removes and returns every handle.
    pub fn drain(&self) -> Vec<(EndpointId, Arc<SubscriptionHandle>)> {
        let endpoints: Vec<EndpointId> = self.handles.iter().map(|r| r.key().clone()).collect();
        endpoints
            .into_iter()
            .filter_map(|endpoint| self.handles.remove(&endpoint))
            .collect()
    }

    /// Returns `true` if the endpoint owns a subscription.
    pub fn contains(&self, endpoint: &EndpointId) -> bool {
        self.handles.contains_key(endpoint)
    }

    /// Number of endpoints with a subscription.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no endpoint owns a subscription.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RevisedSubscription;
    use edge_core::{NodeId, NodeRef, RequestId, SubOperation, SubRequest};

    fn handle(id: u32) -> SubscriptionHandle {
        SubscriptionHandle::new(
            RevisedSubscription {
                subscription_id: id,
                publishing_interval: 1000.0,
                lifetime_count: 60,
                max_keep_alive_count: 10,
            },
            SubRequest::builder(SubOperation::Create).build(),
            RequestId::from_raw(id as u64),
            NodeRef::new(NodeId::numeric(2, 1)),
        )
    }

    #[test]
    fn test_replace_keeps_one_handle() {
        let registry = SubscriptionRegistry::new();
        let ep = EndpointId::new("ep");

        assert!(registry.replace(ep.clone(), handle(1)).is_none());
        let previous = registry.replace(ep.clone(), handle(2)).unwrap();

        assert_eq!(previous.subscription_id(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&ep).unwrap().subscription_id(), 2);
    }

    #[test]
    fn test_stale_remove_keeps_newer_handle() {
        let registry = SubscriptionRegistry::new();
        let ep = EndpointId::new("ep");
        registry.replace(ep.clone(), handle(1));
        registry.replace(ep.clone(), handle(2));

        assert!(registry.remove_if(&ep, 1).is_none());
        assert!(registry.contains(&ep));
        assert!(registry.remove_if(&ep, 2).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_if_matches_subscription() {
        let registry = SubscriptionRegistry::new();
        let ep = EndpointId::new("ep");
        registry.replace(ep.clone(), handle(3));

        assert!(!registry.update_if(&ep, 4, |h| h.with_monitored_items(vec![1])));
        assert!(registry.update_if(&ep, 3, |h| h.with_monitored_items(vec![5])));
        assert_eq!(registry.get(&ep).unwrap().monitored_item_ids(), &[5]);
    }

    #[test]
    fn test_drain() {
        let registry = SubscriptionRegistry::new();
        registry.replace(EndpointId::new("a"), handle(1));
        registry.replace(EndpointId::new("b"), handle(2));

        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
