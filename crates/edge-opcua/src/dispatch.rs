// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command dispatch.
//!
//! ```text
//!   Message ──▶ CommandDispatcher
//!                 │
//!                 ├─ Read / ReadSync / Write ──▶ ValueAccessService (by alias, or group)
//!                 ├─ Subscribe ────────────────▶ SubscriptionManager
//!                 └─ Method ───────────────────▶ MethodCaller
//! ```
//!
//! The dispatcher always completes with an [`OpResult`]. Failures of the
//! value-access path are reported with the originating request id; the
//! subscription manager and the method caller report their own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use edge_core::{CommandKind, ErrorReporter, Message, MessageKind, OpResult, StatusCode};
use tokio::sync::oneshot;

use crate::error::{ConfigurationError, OpcUaError};
use crate::method::MethodCaller;
use crate::service::{ServiceRegistry, ValueAccessService};
use crate::subscription::SubscriptionManager;

// =============================================================================
// CommandDispatcher
// =============================================================================

/// Routes request messages to the component serving them.
///
/// Cloning is cheap; clones share every component.
#[derive(Clone)]
pub struct CommandDispatcher {
    services: Arc<ServiceRegistry>,
    subscriptions: Arc<SubscriptionManager>,
    methods: MethodCaller,
    reporter: ErrorReporter,
    stats: Arc<DispatcherStats>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over its components.
    pub fn new(
        services: Arc<ServiceRegistry>,
        subscriptions: Arc<SubscriptionManager>,
        methods: MethodCaller,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            services,
            subscriptions,
            methods,
            reporter,
            stats: Arc::new(DispatcherStats::default()),
        }
    }

    /// Executes `message` and returns its result.
    pub async fn execute(&self, message: &Message) -> OpResult {
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);

        let result = match (message.kind(), message.command()) {
            (MessageKind::SendRequest | MessageKind::SendRequests, Some(command)) => {
                self.route(command, message).await
            }
            (kind, command) => {
                let detail = format!("cannot dispatch {} message (command {:?})", kind, command);
                self.report(message, StatusCode::ParamInvalid, Some(detail));
                OpResult::status(StatusCode::ParamInvalid)
            }
        };

        if result.is_ok() {
            self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Executes `message` on a spawned task.
    ///
    /// The receiver resolves with the result once the operation completes.
    pub fn submit(&self, message: Message) -> oneshot::Receiver<OpResult> {
        let (tx, rx) = oneshot::channel();
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let result = dispatcher.execute(&message).await;
            if tx.send(result).is_err() {
                tracing::trace!(endpoint = %message.endpoint(), "Submit receiver dropped");
            }
        });
        rx
    }

    /// Service registry.
    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// Subscription manager.
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    async fn route(&self, command: CommandKind, message: &Message) -> OpResult {
        match command {
            CommandKind::Subscribe => self.subscriptions.handle(message).await,
            CommandKind::Method => {
                let request = message.request();
                self.methods.execute_async(
                    message,
                    request.and_then(|r| r.node().node_id.clone()),
                    request.and_then(|r| r.method_id().cloned()),
                    request.and_then(|r| r.value().cloned()),
                )
            }
            CommandKind::Read | CommandKind::ReadSync | CommandKind::Write => {
                self.access(command, message).await
            }
        }
    }

    async fn access(&self, command: CommandKind, message: &Message) -> OpResult {
        let Some(service) = self.resolve(message) else {
            self.stats.unresolved.fetch_add(1, Ordering::Relaxed);
            let target = message
                .request()
                .and_then(|r| r.node().alias())
                .unwrap_or("<none>");
            let e = OpcUaError::configuration(ConfigurationError::unknown_alias(target));
            e.log("dispatch");
            return self.fail(message, &e);
        };

        let outcome = match command {
            CommandKind::ReadSync => service.read_sync(message).await,
            CommandKind::Write => service.write(message).await,
            _ => service.read_async(message).await,
        };

        match outcome {
            Ok(result) if result.is_ok() => result,
            Ok(result) => {
                self.report(message, result.status_code(), None);
                result
            }
            Err(e) => {
                e.log(service.alias());
                self.fail(message, &e)
            }
        }
    }

    fn fail(&self, message: &Message, error: &OpcUaError) -> OpResult {
        let status = error.status_code();
        self.report(message, status, Some(error.to_string()));
        OpResult::status(status)
    }

    fn resolve(&self, message: &Message) -> Option<Arc<dyn ValueAccessService>> {
        match message.kind() {
            MessageKind::SendRequest => message
                .request()
                .and_then(|r| r.node().alias())
                .and_then(|alias| self.services.get(alias)),
            MessageKind::SendRequests => self.services.group(),
            _ => None,
        }
    }

    fn report(&self, message: &Message, status: StatusCode, detail: Option<String>) {
        match message.request() {
            Some(request) => self.reporter.report(
                message.endpoint(),
                Some(request.node()),
                status,
                detail,
                request.request_id(),
            ),
            None => tracing::warn!(
                endpoint = %message.endpoint(),
                kind = %message.kind(),
                status = %status,
                detail = ?detail,
                "Dropped message without request"
            ),
        }
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("services", &self.services)
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Dispatcher counters.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    unresolved: AtomicU64,
}

impl DispatcherStats {
    /// Messages executed.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Executions that completed with OK.
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Executions that completed with a failure status.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Messages for which no service was registered.
    pub fn unresolved(&self) -> u64 {
        self.unresolved.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SessionRegistry;
    use crate::error::{OpcUaError, OpcUaResult, SessionError};
    use crate::service::ServiceContext;
    use async_trait::async_trait;
    use edge_core::{DispatchOutput, EndpointId, NodeRef, Request, Response, Value};

    struct StubService;

    #[async_trait]
    impl ValueAccessService for StubService {
        fn alias(&self) -> &str {
            "stub"
        }

        async fn read_sync(&self, _message: &Message) -> OpcUaResult<OpResult> {
            Ok(OpResult::ok_with(Value::Int32(3)))
        }

        async fn read_async(&self, _message: &Message) -> OpcUaResult<OpResult> {
            Err(OpcUaError::session(SessionError::not_found("ep")))
        }

        async fn write(&self, _message: &Message) -> OpcUaResult<OpResult> {
            Ok(OpResult::status(StatusCode::Error))
        }
    }

    fn dispatcher() -> (CommandDispatcher, DispatchOutput) {
        let output = DispatchOutput::new(32);
        let reporter = ErrorReporter::new(output.clone());
        let sessions = Arc::new(SessionRegistry::new());
        let services = Arc::new(ServiceRegistry::new());
        services.register(Arc::new(StubService));
        let context = ServiceContext::new(sessions.clone(), reporter.clone());
        let dispatcher = CommandDispatcher::new(
            services,
            Arc::new(SubscriptionManager::new(sessions, reporter.clone())),
            MethodCaller::new(context),
            reporter,
        );
        (dispatcher, output)
    }

    fn message(command: CommandKind, alias: &str) -> Message {
        Message::send_request(
            command,
            EndpointId::new("ep"),
            Request::new(NodeRef::alias_only(alias)),
        )
    }

    #[tokio::test]
    async fn test_routes_by_alias() {
        let (dispatcher, _output) = dispatcher();
        let result = dispatcher.execute(&message(CommandKind::ReadSync, "stub")).await;
        assert_eq!(result.value(), Some(&Value::Int32(3)));
        assert_eq!(dispatcher.stats().succeeded(), 1);
    }

    #[tokio::test]
    async fn test_unknown_alias_is_param_invalid() {
        let (dispatcher, output) = dispatcher();
        let mut rx = output.subscribe();
        let msg = message(CommandKind::Read, "missing");
        let id = msg.request_id().unwrap();

        let result = dispatcher.execute(&msg).await;

        assert_eq!(result.status_code(), StatusCode::ParamInvalid);
        assert_eq!(dispatcher.stats().unresolved(), 1);
        let error = rx.drain().remove(0);
        assert_eq!(error.error_report().unwrap().status, StatusCode::ParamInvalid);
        assert_eq!(error.request_id(), Some(id));
    }

    #[tokio::test]
    async fn test_service_error_becomes_internal_error() {
        let (dispatcher, output) = dispatcher();
        let mut rx = output.subscribe();

        let result = dispatcher.execute(&message(CommandKind::Read, "stub")).await;

        assert_eq!(result.status_code(), StatusCode::InternalError);
        let error = rx.drain().remove(0);
        assert_eq!(error.error_report().unwrap().status, StatusCode::InternalError);
    }

    #[tokio::test]
    async fn test_unknown_alias_detail_names_alias() {
        let (dispatcher, output) = dispatcher();
        let mut rx = output.subscribe();

        dispatcher.execute(&message(CommandKind::ReadSync, "flow")).await;

        let messages = rx.drain();
        assert_eq!(messages.len(), 1);
        let detail = messages[0].error_report().unwrap().detail.clone().unwrap();
        assert!(detail.contains("flow"));
    }

    #[tokio::test]
    async fn test_non_ok_result_is_reported() {
        let (dispatcher, output) = dispatcher();
        let mut rx = output.subscribe();

        let result = dispatcher.execute(&message(CommandKind::Write, "stub")).await;

        assert_eq!(result.status_code(), StatusCode::Error);
        assert_eq!(rx.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_response_message_is_rejected() {
        let (dispatcher, _output) = dispatcher();
        let response = Message::general_response(
            CommandKind::Read,
            EndpointId::new("ep"),
            vec![Response::new(
                NodeRef::alias_only("stub"),
                Value::Null,
                edge_core::RequestId::next(),
            )],
        );

        let result = dispatcher.execute(&response).await;
        assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    }

    #[tokio::test]
    async fn test_submit_resolves() {
        let (dispatcher, _output) = dispatcher();
        let rx = dispatcher.submit(message(CommandKind::ReadSync, "stub"));
        let result = tokio::time::timeout(std::time::Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
