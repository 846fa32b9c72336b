// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error reporter.
//!
//! The single sink every failure path goes through. Reporting never fails:
//! the report is logged and published as an error-kind message on the
//! dispatch output, carrying the originating request id. The reporter is
//! `Clone + Send + Sync` and may be called from any task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bus::DispatchOutput;
use crate::message::{ErrorReport, Message};
use crate::status::{StatusCode, StatusSeverity};
use crate::types::{EndpointId, NodeRef, RequestId};

/// Publishes failures on the dispatch output.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    output: DispatchOutput,
    reported: Arc<AtomicU64>,
}

impl ErrorReporter {
    /// Creates a reporter publishing into `output`.
    pub fn new(output: DispatchOutput) -> Self {
        Self {
            output,
            reported: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reports a failure for a node.
    pub fn report(
        &self,
        endpoint: &EndpointId,
        node: Option<&NodeRef>,
        status: StatusCode,
        detail: Option<String>,
        request_id: RequestId,
    ) {
        let mut report = ErrorReport::new(status, request_id);
        report.node = node.cloned();
        report.detail = detail;
        self.publish(endpoint, report);
    }

    /// Publishes a prepared report.
    pub fn publish(&self, endpoint: &EndpointId, report: ErrorReport) {
        self.reported.fetch_add(1, Ordering::Relaxed);

        let node = report.node.as_ref().map(ToString::to_string);
        match report.status.severity() {
            StatusSeverity::Error => tracing::error!(
                endpoint = %endpoint,
                request_id = %report.request_id,
                status = %report.status,
                node = ?node,
                detail = ?report.detail,
                "Operation failed"
            ),
            StatusSeverity::Warning => tracing::warn!(
                endpoint = %endpoint,
                request_id = %report.request_id,
                status = %report.status,
                node = ?node,
                detail = ?report.detail,
                "Operation reported a warning"
            ),
            StatusSeverity::Info => tracing::debug!(
                endpoint = %endpoint,
                request_id = %report.request_id,
                status = %report.status,
                "Reported status"
            ),
        }

        self.output.publish(Message::error(endpoint.clone(), report));
    }

    /// Number of reports made so far.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    /// Returns the dispatch output this reporter publishes into.
    pub fn output(&self) -> &DispatchOutput {
        &self.output
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::types::NodeId;

    #[tokio::test]
    async fn test_report_publishes_error_message() {
        let output = DispatchOutput::new(8);
        let mut subscriber = output.subscribe();
        let reporter = ErrorReporter::new(output);

        let node = NodeRef::new(NodeId::numeric(2, 5));
        let id = RequestId::from_raw(11);
        reporter.report(
            &EndpointId::new("ep"),
            Some(&node),
            StatusCode::ParamInvalid,
            Some("bad attribute".to_string()),
            id,
        );

        let msg = subscriber.recv().await.unwrap();
        assert_eq!(msg.kind(), MessageKind::Error);
        let report = msg.error_report().unwrap();
        assert_eq!(report.status, StatusCode::ParamInvalid);
        assert_eq!(report.request_id, id);
        assert_eq!(report.node.as_ref(), Some(&node));
        assert_eq!(report.detail.as_deref(), Some("bad attribute"));
        assert_eq!(reporter.reported(), 1);
    }

    #[test]
    fn test_report_without_subscribers_never_fails() {
        let reporter = ErrorReporter::new(DispatchOutput::new(8));
        reporter.report(
            &EndpointId::new("ep"),
            None,
            StatusCode::Error,
            None,
            RequestId::from_raw(1),
        );
        assert_eq!(reporter.reported(), 1);
        assert_eq!(reporter.output().stats().errors_published, 1);
    }

    #[test]
    fn test_reporter_shared_across_threads() {
        let output = DispatchOutput::new(64);
        let mut subscriber = output.subscribe();
        let reporter = ErrorReporter::new(output);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    reporter.report(
                        &EndpointId::new("ep"),
                        None,
                        StatusCode::InternalError,
                        None,
                        RequestId::from_raw(i),
                    );
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(reporter.reported(), 4);
        assert_eq!(subscriber.drain().len(), 4);
    }
}
