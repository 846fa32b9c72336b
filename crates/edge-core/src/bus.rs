// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dispatch output: the single stream callers observe.
//!
//! General responses, subscription reports and error messages are all
//! published here, each tagged with the originating request id. The output
//! is a `tokio::sync::broadcast` channel, so every subscriber sees every
//! message in publish order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌───────────────┐
//! │ ValueAccess  │  │ Subscription │  │ ErrorReporter │
//! │  services    │  │   listener   │  │               │
//! └──────┬───────┘  └──────┬───────┘  └───────┬───────┘
//!        │ GeneralResponse │ Report           │ Error
//!        ▼                 ▼                  ▼
//! ┌─────────────────────────────────────────────────────┐
//! │             DispatchOutput (broadcast)               │
//! └─────────────────────────────────────────────────────┘
//!        │                 │                  │
//!        ▼                 ▼                  ▼
//!   OutputSubscriber  OutputSubscriber   OutputSubscriber
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let output = DispatchOutput::new(1024);
//! let mut subscriber = output.subscribe();
//! output.publish(message);
//! let reply = subscriber.recv_for(request_id).await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::BusError;
use crate::message::{Message, MessageKind};
use crate::types::RequestId;

// =============================================================================
// Statistics
// =============================================================================

/// Statistics of the dispatch output.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OutputStats {
    /// Total messages published.
    pub messages_published: u64,
    /// Messages published while nobody was subscribed.
    pub messages_unobserved: u64,
    /// Messages dropped because a subscriber lagged.
    pub messages_dropped: u64,
    /// Error-kind messages published.
    pub errors_published: u64,
    /// Current number of subscribers.
    pub subscriber_count: u64,
}

#[derive(Debug, Default)]
struct AtomicOutputStats {
    messages_published: AtomicU64,
    messages_unobserved: AtomicU64,
    messages_dropped: AtomicU64,
    errors_published: AtomicU64,
}

// =============================================================================
// DispatchOutput
// =============================================================================

/// Multi-producer, multi-consumer output channel.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct DispatchOutput {
    sender: broadcast::Sender<Message>,
    capacity: usize,
    stats: Arc<AtomicOutputStats>,
}

impl DispatchOutput {
    /// Creates an output buffering up to `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            capacity,
            stats: Arc::new(AtomicOutputStats::default()),
        }
    }

    /// Publishes a message to all subscribers.
    ///
    /// Returns the number of subscribers that will see the message. Publishing
    /// with no subscriber is not an error.
    pub fn publish(&self, message: Message) -> usize {
        let is_error = message.kind() == MessageKind::Error;
        self.stats.messages_published.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.stats.errors_published.fetch_add(1, Ordering::Relaxed);
        }

        match self.sender.send(message) {
            Ok(count) => count,
            Err(_) => {
                self.stats.messages_unobserved.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    /// Creates a new subscriber that sees messages published from now on.
    pub fn subscribe(&self) -> OutputSubscriber {
        OutputSubscriber {
            receiver: self.sender.subscribe(),
            stats: self.stats.clone(),
        }
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current statistics.
    pub fn stats(&self) -> OutputStats {
        OutputStats {
            messages_published: self.stats.messages_published.load(Ordering::Relaxed),
            messages_unobserved: self.stats.messages_unobserved.load(Ordering::Relaxed),
            messages_dropped: self.stats.messages_dropped.load(Ordering::Relaxed),
            errors_published: self.stats.errors_published.load(Ordering::Relaxed),
            subscriber_count: self.subscriber_count() as u64,
        }
    }
}

impl std::fmt::Debug for DispatchOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchOutput")
            .field("capacity", &self.capacity)
            .field("subscriber_count", &self.subscriber_count())
            .field(
                "messages_published",
                &self.stats.messages_published.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// =============================================================================
// OutputSubscriber
// =============================================================================

/// A subscriber to the dispatch output.
pub struct OutputSubscriber {
    receiver: broadcast::Receiver<Message>,
    stats: Arc<AtomicOutputStats>,
}

impl OutputSubscriber {
    /// Receives the next message.
    ///
    /// Lag is counted and skipped; only a closed channel is an error.
    pub async fn recv(&mut self) -> Result<Message, BusError> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Ok(msg),
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.stats.messages_dropped.fetch_add(count, Ordering::Relaxed);
                    tracing::warn!(count, "Dispatch output subscriber lagged, messages dropped");
                }
            }
        }
    }

    /// Tries to receive a message without waiting.
    ///
    /// Lag is counted and skipped like in [`recv`](Self::recv); `Ok(None)`
    /// always means the queue is empty.
    pub fn try_recv(&mut self) -> Result<Option<Message>, BusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(BusError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.stats.messages_dropped.fetch_add(count, Ordering::Relaxed);
                    tracing::warn!(count, "Dispatch output subscriber lagged, messages dropped");
                }
            }
        }
    }

    /// Receives the next message belonging to `request_id`, skipping others.
    pub async fn recv_for(&mut self, request_id: RequestId) -> Result<Message, BusError> {
        loop {
            let msg = self.recv().await?;
            if msg.concerns(request_id) {
                return Ok(msg);
            }
        }
    }

    /// Receives the next message of the given kind, skipping others.
    pub async fn recv_kind(&mut self, kind: MessageKind) -> Result<Message, BusError> {
        loop {
            let msg = self.recv().await?;
            if msg.kind() == kind {
                return Ok(msg);
            }
        }
    }

    /// Drains every message that is already queued.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(Some(msg)) = self.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommandKind, ErrorReport, Response};
    use crate::status::StatusCode;
    use crate::types::{EndpointId, NodeId, NodeRef, Value};

    fn response(id: u64) -> Message {
        Message::general_response(
            CommandKind::Read,
            EndpointId::new("ep"),
            vec![Response::new(
                NodeRef::new(NodeId::numeric(2, 1)),
                Value::Int32(id as i32),
                RequestId::from_raw(id),
            )],
        )
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let output = DispatchOutput::new(16);
        let mut subscriber = output.subscribe();

        assert_eq!(output.publish(response(1)), 1);
        let msg = subscriber.recv().await.unwrap();
        assert_eq!(msg.request_id(), Some(RequestId::from_raw(1)));
        assert_eq!(output.stats().messages_published, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let output = DispatchOutput::new(16);
        assert_eq!(output.publish(response(1)), 0);
        assert_eq!(output.stats().messages_unobserved, 1);
    }

    #[tokio::test]
    async fn test_recv_for_skips_other_requests() {
        let output = DispatchOutput::new(16);
        let mut subscriber = output.subscribe();

        output.publish(response(1));
        output.publish(response(2));

        let msg = subscriber.recv_for(RequestId::from_raw(2)).await.unwrap();
        assert_eq!(msg.request_id(), Some(RequestId::from_raw(2)));
    }

    #[tokio::test]
    async fn test_recv_kind_and_error_stats() {
        let output = DispatchOutput::new(16);
        let mut subscriber = output.subscribe();

        output.publish(response(1));
        output.publish(Message::error(
            EndpointId::new("ep"),
            ErrorReport::new(StatusCode::Error, RequestId::from_raw(1)),
        ));

        let msg = subscriber.recv_kind(MessageKind::Error).await.unwrap();
        assert_eq!(msg.kind(), MessageKind::Error);
        assert_eq!(output.stats().errors_published, 1);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_counts_drops() {
        let output = DispatchOutput::new(2);
        let mut subscriber = output.subscribe();

        for id in 0..5 {
            output.publish(response(id));
        }

        let msg = subscriber.recv().await.unwrap();
        assert_eq!(msg.request_id(), Some(RequestId::from_raw(3)));
        assert_eq!(output.stats().messages_dropped, 3);
    }

    #[test]
    fn test_drain_after_lag_keeps_buffered_messages() {
        let output = DispatchOutput::new(4);
        let mut subscriber = output.subscribe();

        for id in 0..6 {
            output.publish(response(id));
        }

        let drained = subscriber.drain();
        let ids: Vec<_> = drained.iter().filter_map(Message::request_id).collect();
        assert_eq!(
            ids,
            (2..6).map(RequestId::from_raw).collect::<Vec<_>>()
        );
        assert_eq!(output.stats().messages_dropped, 2);
        assert!(subscriber.drain().is_empty());
    }

    #[test]
    fn test_drain_and_closed() {
        let output = DispatchOutput::new(8);
        let mut subscriber = output.subscribe();
        output.publish(response(1));
        output.publish(response(2));

        assert_eq!(subscriber.drain().len(), 2);
        drop(output);
        assert!(matches!(subscriber.try_recv(), Err(BusError::Closed)));
    }
}
