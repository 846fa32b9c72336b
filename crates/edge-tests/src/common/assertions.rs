// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Assertion helpers for output messages.

use edge_core::{CommandKind, Message, MessageKind, RequestId, StatusCode, Value};

// =============================================================================
// Message Assertions
// =============================================================================

/// Assertion extensions for [`Message`].
pub trait MessageAssertions {
    /// Asserts a general response to `request_id` under `command`.
    fn assert_general_response(&self, command: CommandKind, request_id: RequestId);

    /// Asserts a subscription report for `request_id`.
    fn assert_report(&self, request_id: RequestId);

    /// Asserts an error report with `status` for `request_id`.
    fn assert_error(&self, status: StatusCode, request_id: RequestId);

    /// Asserts the value of the first response.
    fn assert_value(&self, expected: &Value);
}

impl MessageAssertions for Message {
    fn assert_general_response(&self, command: CommandKind, request_id: RequestId) {
        assert_eq!(
            self.kind(),
            MessageKind::GeneralResponse,
            "Expected a general response, got {:?}",
            self
        );
        assert_eq!(self.command(), Some(command));
        assert_eq!(self.request_id(), Some(request_id));
    }

    fn assert_report(&self, request_id: RequestId) {
        assert_eq!(
            self.kind(),
            MessageKind::Report,
            "Expected a report, got {:?}",
            self
        );
        assert_eq!(self.request_id(), Some(request_id));
    }

    fn assert_error(&self, status: StatusCode, request_id: RequestId) {
        let report = self
            .error_report()
            .unwrap_or_else(|| panic!("Expected an error report, got {:?}", self));
        assert_eq!(
            report.status, status,
            "Expected {} but got {} ({:?})",
            status, report.status, report.detail
        );
        assert_eq!(report.request_id, request_id);
    }

    fn assert_value(&self, expected: &Value) {
        let response = self
            .responses()
            .first()
            .unwrap_or_else(|| panic!("Expected a response, got {:?}", self));
        assert_eq!(response.value(), expected);
    }
}

/// Counts the error reports with `status` in `messages`.
pub fn count_errors(messages: &[Message], status: StatusCode) -> usize {
    messages
        .iter()
        .filter_map(Message::error_report)
        .filter(|report| report.status == status)
        .count()
}

/// Counts the messages of `kind` in `messages`.
pub fn count_kind(messages: &[Message], kind: MessageKind) -> usize {
    messages.iter().filter(|m| m.kind() == kind).count()
}
