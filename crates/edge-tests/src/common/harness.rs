// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Test harness.
//!
//! [`TestRuntime`] builds an [`EdgeRuntime`] whose fixture endpoint is served
//! by a [`MockTransport`], registers the fixture services and keeps one
//! output subscriber open from the start so no message is missed.

use std::sync::Arc;
use std::time::Duration;

use edge_core::{EdgeConfig, Message, MessageKind, OpResult, OutputSubscriber, RequestId};
use edge_opcua::{EdgeRuntime, SessionRegistry};

use super::fixtures::{NodeFixtures, ENDPOINT};
use super::mocks::MockTransport;

/// How long a test waits for an expected message.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a test waits to prove no message arrives.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(100);

// =============================================================================
// TestRuntime
// =============================================================================

/// A runtime wired to a mock transport.
pub struct TestRuntime {
    /// Runtime under test.
    pub runtime: EdgeRuntime,

    /// Transport serving the fixture endpoint.
    pub transport: Arc<MockTransport>,

    /// Session registry the runtime looks endpoints up in.
    pub sessions: Arc<SessionRegistry>,

    /// Output subscriber opened before the first request.
    pub output: OutputSubscriber,
}

impl TestRuntime {
    /// Builds a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EdgeConfig::default())
    }

    /// Builds a runtime with `config`.
    pub fn with_config(config: EdgeConfig) -> Self {
        super::init_test_logging();

        let transport = Arc::new(MockTransport::new(ENDPOINT));
        let sessions = Arc::new(SessionRegistry::new());
        sessions.register(ENDPOINT, transport.clone());

        let mut builder = EdgeRuntime::builder(config).sessions(sessions.clone());
        for (alias, shape, node_id) in NodeFixtures::services() {
            builder = builder.service(alias, shape, node_id, ENDPOINT);
        }
        let runtime = builder.build().expect("fixture runtime builds");
        let output = runtime.subscribe_output();

        Self {
            runtime,
            transport,
            sessions,
            output,
        }
    }

    /// Executes a message through the dispatcher.
    pub async fn execute(&self, message: &Message) -> OpResult {
        self.runtime.dispatcher().execute(message).await
    }

    /// Waits for the next message.
    pub async fn next(&mut self) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.output.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("dispatch output closed")
    }

    /// Waits for the next message belonging to `request_id`.
    pub async fn next_for(&mut self, request_id: RequestId) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.output.recv_for(request_id))
            .await
            .expect("timed out waiting for the request's message")
            .expect("dispatch output closed")
    }

    /// Waits for the next message of `kind`.
    pub async fn next_kind(&mut self, kind: MessageKind) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.output.recv_kind(kind))
            .await
            .expect("timed out waiting for a message kind")
            .expect("dispatch output closed")
    }

    /// Returns every message already published.
    pub fn drain(&mut self) -> Vec<Message> {
        self.output.drain()
    }

    /// Asserts that nothing is published within the silence window.
    pub async fn expect_silence(&mut self) {
        if let Ok(Ok(message)) = tokio::time::timeout(SILENCE_WINDOW, self.output.recv()).await {
            panic!("expected no message, got {:?}", message);
        }
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}
