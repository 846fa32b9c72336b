// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lookup.
//!
//! Sessions are established and torn down outside this crate. The lookup
//! only maps an endpoint to the transport handle of its connected session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use edge_core::EndpointId;

use crate::client::transport::OpcUaTransport;
use crate::error::{OpcUaError, OpcUaResult, SessionError};

// =============================================================================
// SessionLookup
// =============================================================================

/// Resolves an endpoint to the transport of its connected session.
///
/// Must be safe to call concurrently and return a stable handle for the
/// lifetime of a connection.
pub trait SessionLookup: Send + Sync {
    /// Returns the transport for `endpoint`.
    fn session(&self, endpoint: &EndpointId) -> OpcUaResult<Arc<dyn OpcUaTransport>>;
}

// =============================================================================
// SessionRegistry
// =============================================================================

/// Concurrent endpoint to transport map.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<EndpointId, Arc<dyn OpcUaTransport>>,
    stats: SessionStats,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the transport of a connected endpoint, replacing any previous one.
    pub fn register(&self, endpoint: impl Into<EndpointId>, transport: Arc<dyn OpcUaTransport>) {
        let endpoint = endpoint.into();
        tracing::info!(
            endpoint = %endpoint,
            transport = %transport.display_name(),
            "Session registered"
        );
        self.sessions.insert(endpoint, transport);
    }

    /// Removes an endpoint. Returns the removed transport, if any.
    pub fn remove(&self, endpoint: &EndpointId) -> Option<Arc<dyn OpcUaTransport>> {
        let removed = self.sessions.remove(endpoint).map(|(_, t)| t);
        if removed.is_some() {
            tracing::info!(endpoint = %endpoint, "Session removed");
        }
        removed
    }

    /// Returns `true` if the endpoint is registered.
    pub fn contains(&self, endpoint: &EndpointId) -> bool {
        self.sessions.contains_key(endpoint)
    }

    /// Returns the number of registered endpoints.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no endpoint is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns lookup statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

impl SessionLookup for SessionRegistry {
    fn session(&self, endpoint: &EndpointId) -> OpcUaResult<Arc<dyn OpcUaTransport>> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        match self.sessions.get(endpoint) {
            Some(entry) => Ok(entry.value().clone()),
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Err(OpcUaError::session(SessionError::not_found(endpoint.as_str())))
            }
        }
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("lookups", &self.stats.lookups())
            .finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Lookup statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    lookups: AtomicU64,
    misses: AtomicU64,
}

impl SessionStats {
    /// Total lookups.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Lookups for an unknown endpoint.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_endpoint() {
        let registry = SessionRegistry::new();
        let err = match registry.session(&EndpointId::new("opc.tcp://nowhere:4840")) {
            Err(err) => err,
            Ok(_) => panic!("lookup of an unknown endpoint must fail"),
        };

        assert!(matches!(err, OpcUaError::Session(SessionError::NotFound { .. })));
        assert_eq!(registry.stats().lookups(), 1);
        assert_eq!(registry.stats().misses(), 1);
        assert!(registry.is_empty());
    }
}
