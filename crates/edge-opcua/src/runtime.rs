// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Composition root.
//!
//! [`EdgeRuntime`] owns every component of the layer. Nothing here is
//! process-global: two runtimes in one process are fully independent.
//!
//! # Example
//!
//! ```rust,ignore
//! use edge_opcua::{EdgeRuntime, NodeShape, SessionRegistry};
//!
//! let sessions = Arc::new(SessionRegistry::new());
//! sessions.register("plc-1", transport);
//!
//! let runtime = EdgeRuntime::builder(EdgeConfig::default())
//!     .sessions(sessions)
//!     .service("temperature", NodeShape::Scalar, NodeId::numeric(2, 1001), "plc-1")
//!     .build()?;
//!
//! let mut output = runtime.subscribe_output();
//! let result = runtime.dispatcher().execute(&message).await;
//! ```

use std::sync::Arc;

use edge_core::message::SubRequestBuilder;
use edge_core::{
    DispatchOutput, EdgeConfig, EndpointId, ErrorReporter, NodeId, OutputSubscriber, SubOperation,
    SubRequest,
};

use crate::client::{SessionLookup, SessionRegistry};
use crate::dispatch::CommandDispatcher;
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::method::MethodCaller;
use crate::service::{
    GroupService, NodeMetadata, NodeShape, ServiceContext, ServiceRegistry, ValueAccess,
};
use crate::subscription::SubscriptionManager;

// =============================================================================
// EdgeRuntime
// =============================================================================

/// Owns the dispatch output, reporter, services and subscriptions.
///
/// Building a runtime does not touch any endpoint. Node metadata is read
/// only when [`bootstrap_metadata`](Self::bootstrap_metadata) is called,
/// once sessions are registered; services added later with
/// [`register_service`](Self::register_service) are picked up by the next
/// call.
pub struct EdgeRuntime {
    config: EdgeConfig,
    output: DispatchOutput,
    reporter: ErrorReporter,
    context: ServiceContext,
    dispatcher: CommandDispatcher,
}

impl EdgeRuntime {
    /// Starts a builder.
    pub fn builder(config: EdgeConfig) -> EdgeRuntimeBuilder {
        EdgeRuntimeBuilder::new(config)
    }

    /// Subscribes to responses, reports and errors.
    pub fn subscribe_output(&self) -> OutputSubscriber {
        self.output.subscribe()
    }

    /// Dispatch output.
    pub fn output(&self) -> &DispatchOutput {
        &self.output
    }

    /// Command dispatcher.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Subscription manager.
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        self.dispatcher.subscriptions()
    }

    /// Service registry.
    pub fn services(&self) -> &Arc<ServiceRegistry> {
        self.dispatcher.services()
    }

    /// Error reporter.
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Runtime configuration.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Registers a value-access service after construction.
    ///
    /// Its metadata stays empty until the next
    /// [`bootstrap_metadata`](Self::bootstrap_metadata).
    pub fn register_service(
        &self,
        alias: impl Into<String>,
        shape: NodeShape,
        node_id: NodeId,
        endpoint: impl Into<EndpointId>,
    ) {
        self.services().register(Arc::new(ValueAccess::new(
            alias,
            shape,
            node_id,
            endpoint,
            self.context.clone(),
        )));
    }

    /// Starts a subscription request with the configured defaults.
    pub fn sub_request(&self, operation: SubOperation) -> SubRequestBuilder {
        SubRequest::builder(operation).defaults(&self.config.subscription)
    }

    /// Bootstraps the metadata of every registered service.
    ///
    /// Failures are logged and returned per alias.
    pub async fn bootstrap_metadata(&self) -> Vec<(String, OpcUaResult<NodeMetadata>)> {
        let mut aliases = self.services().aliases();
        aliases.sort();

        let mut results = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let Some(service) = self.services().get(&alias) else {
                continue;
            };
            let outcome = service.bootstrap_metadata().await;
            if let Err(e) = &outcome {
                e.log(&alias);
            }
            results.push((alias, outcome));
        }
        results
    }

    /// Tears down every live subscription.
    pub async fn shutdown(&self) {
        let torn_down = self.subscriptions().shutdown().await;
        let stats = self.output.stats();
        tracing::info!(
            subscriptions = torn_down,
            published = stats.messages_published,
            errors = stats.errors_published,
            "Edge runtime stopped"
        );
    }
}

impl std::fmt::Debug for EdgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("output", &self.output)
            .finish()
    }
}

// =============================================================================
// EdgeRuntimeBuilder
// =============================================================================

struct ServiceEntry {
    alias: String,
    shape: NodeShape,
    node_id: NodeId,
    endpoint: EndpointId,
}

/// Builder for [`EdgeRuntime`].
pub struct EdgeRuntimeBuilder {
    config: EdgeConfig,
    sessions: Option<Arc<dyn SessionLookup>>,
    services: Vec<ServiceEntry>,
}

impl EdgeRuntimeBuilder {
    fn new(config: EdgeConfig) -> Self {
        Self {
            config,
            sessions: None,
            services: Vec::new(),
        }
    }

    /// Sets the session lookup. Defaults to an empty [`SessionRegistry`].
    pub fn sessions(mut self, sessions: Arc<dyn SessionLookup>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Adds a value-access service.
    pub fn service(
        mut self,
        alias: impl Into<String>,
        shape: NodeShape,
        node_id: NodeId,
        endpoint: impl Into<EndpointId>,
    ) -> Self {
        self.services.push(ServiceEntry {
            alias: alias.into(),
            shape,
            node_id,
            endpoint: endpoint.into(),
        });
        self
    }

    /// Validates the configuration and wires the components.
    pub fn build(self) -> OpcUaResult<EdgeRuntime> {
        self.config
            .validate()
            .map_err(|e| OpcUaError::configuration(ConfigurationError::from(e)))?;

        let output = DispatchOutput::new(self.config.output.capacity);
        let reporter = ErrorReporter::new(output.clone());
        let sessions: Arc<dyn SessionLookup> = match self.sessions {
            Some(sessions) => sessions,
            None => Arc::new(SessionRegistry::new()),
        };
        let context = ServiceContext::new(sessions.clone(), reporter.clone());

        let services = Arc::new(ServiceRegistry::new());
        services.register(Arc::new(GroupService::new(context.clone())));
        for entry in self.services {
            services.register(Arc::new(ValueAccess::new(
                entry.alias,
                entry.shape,
                entry.node_id,
                entry.endpoint,
                context.clone(),
            )));
        }

        let subscriptions = Arc::new(SubscriptionManager::new(sessions, reporter.clone()));
        let dispatcher = CommandDispatcher::new(
            services,
            subscriptions,
            MethodCaller::new(context.clone()),
            reporter.clone(),
        );

        tracing::info!(
            services = dispatcher.services().len(),
            output_capacity = output.capacity(),
            "Edge runtime built"
        );

        Ok(EdgeRuntime {
            config: self.config,
            output,
            reporter,
            context,
            dispatcher,
        })
    }
}
