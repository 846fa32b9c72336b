// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Alias to service registry.

use std::sync::Arc;

use dashmap::DashMap;

use super::{ValueAccessService, WELL_KNOWN_GROUP};

/// Concurrent alias to service map.
///
/// Registering an alias again replaces the previous service.
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<dyn ValueAccessService>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its alias.
    pub fn register(&self, service: Arc<dyn ValueAccessService>) {
        let alias = service.alias().to_string();
        if self.services.insert(alias.clone(), service).is_some() {
            tracing::warn!(alias = %alias, "Replaced value-access service");
        } else {
            tracing::debug!(alias = %alias, "Registered value-access service");
        }
    }

    /// Looks up a service by alias.
    pub fn get(&self, alias: &str) -> Option<Arc<dyn ValueAccessService>> {
        self.services.get(alias).map(|r| r.value().clone())
    }

    /// Returns the group service, if registered.
    pub fn group(&self) -> Option<Arc<dyn ValueAccessService>> {
        self.get(WELL_KNOWN_GROUP)
    }

    /// Removes a service.
    pub fn remove(&self, alias: &str) -> Option<Arc<dyn ValueAccessService>> {
        self.services.remove(alias).map(|(_, s)| s)
    }

    /// Returns `true` if `alias` is registered.
    pub fn contains(&self, alias: &str) -> bool {
        self.services.contains_key(alias)
    }

    /// Registered aliases.
    pub fn aliases(&self) -> Vec<String> {
        self.services.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("aliases", &self.aliases())
            .finish()
    }
}
