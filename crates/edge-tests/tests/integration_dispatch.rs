// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dispatch integration tests.
//!
//! Routing, request id correlation, batched group access and method calls.

use std::collections::HashSet;

use edge_core::{CommandKind, EndpointId, Message, MessageKind, RequestId, StatusCode, Value};
use edge_opcua::{MethodCallResult, UaStatus};
use edge_tests::prelude::*;

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unknown_alias_is_param_invalid() {
    let mut rt = TestRuntime::new();
    let msg = RequestMessageBuilder::alias("flow")
        .command(CommandKind::ReadSync)
        .build();
    let id = msg.request_id().unwrap();

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    assert_eq!(rt.transport.total_calls(), 0);
    assert_eq!(rt.runtime.dispatcher().stats().unresolved(), 1);
    rt.next().await.assert_error(StatusCode::ParamInvalid, id);
}

#[tokio::test]
async fn test_missing_session_is_internal_error() {
    let mut rt = TestRuntime::new();
    let msg = RequestMessageBuilder::alias("temperature")
        .command(CommandKind::ReadSync)
        .endpoint(OFFLINE_ENDPOINT)
        .build();
    let id = msg.request_id().unwrap();

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::InternalError);
    let error = rt.next().await;
    error.assert_error(StatusCode::InternalError, id);
    assert_eq!(error.endpoint(), &EndpointId::new(OFFLINE_ENDPOINT));
}

#[tokio::test]
async fn test_output_message_is_not_dispatched() {
    let mut rt = TestRuntime::new();
    let msg = Message::report(endpoint(), Vec::new());

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    rt.expect_silence().await;
}

#[tokio::test]
async fn test_submit_resolves_with_result() {
    let rt = TestRuntime::new();
    rt.transport.set_value(NodeFixtures::temperature(), 5i32);

    let msg = RequestMessageBuilder::alias("temperature")
        .command(CommandKind::ReadSync)
        .build();
    let result = rt.runtime.dispatcher().submit(msg).await.unwrap();

    assert_eq!(result.value(), Some(&Value::Int32(5)));
}

#[tokio::test]
async fn test_concurrent_requests_correlate_by_id() {
    let mut rt = TestRuntime::new();
    rt.transport.set_value(NodeFixtures::temperature(), 1i32);
    rt.transport.set_value(NodeFixtures::pressure(), 2i32);

    let first = RequestMessageBuilder::alias("temperature").build();
    let second = RequestMessageBuilder::alias("pressure").build();
    let first_id = first.request_id().unwrap();
    let second_id = second.request_id().unwrap();
    assert_ne!(first_id, second_id);

    let dispatcher = rt.runtime.dispatcher().clone();
    let (a, b) = tokio::join!(dispatcher.execute(&first), dispatcher.execute(&second));
    assert!(a.is_ok() && b.is_ok());

    let mut seen = HashSet::new();
    for _ in 0..2 {
        let msg = rt.next_kind(MessageKind::GeneralResponse).await;
        let id = msg.request_id().unwrap();
        let expected = if id == first_id {
            Value::Int32(1)
        } else {
            Value::Int32(2)
        };
        msg.assert_value(&expected);
        seen.insert(id);
    }
    assert_eq!(seen, HashSet::from([first_id, second_id]));
}

// =============================================================================
// Group Access
// =============================================================================

#[tokio::test]
async fn test_group_read_sync_answers_every_request() {
    let mut rt = TestRuntime::new();
    rt.transport.set_value(NodeFixtures::temperature(), 20i32);

    let msg = batch_read(
        CommandKind::ReadSync,
        &[NodeFixtures::temperature(), NodeFixtures::pressure()],
    );
    let ids: Vec<RequestId> = msg.requests().iter().map(|r| r.request_id()).collect();

    let result = rt.execute(&msg).await;

    assert_eq!(
        result.value(),
        Some(&Value::Array(vec![Value::Int32(20), Value::Null]))
    );
    assert_eq!(rt.transport.call_count("read_values"), 1);

    let response = rt.next().await;
    assert_eq!(response.kind(), MessageKind::GeneralResponse);
    let responses = response.responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].request_id(), ids[0]);
    assert_eq!(responses[0].status(), StatusCode::Ok);
    assert_eq!(responses[1].request_id(), ids[1]);
    assert_eq!(responses[1].status(), StatusCode::Error);
}

#[tokio::test]
async fn test_group_read_async_failure_reports_each_request() {
    let mut rt = TestRuntime::new();
    rt.transport.fail_reads(true);

    let msg = batch_read(
        CommandKind::Read,
        &[NodeFixtures::temperature(), NodeFixtures::pressure()],
    );
    let ids: Vec<RequestId> = msg.requests().iter().map(|r| r.request_id()).collect();

    assert!(rt.execute(&msg).await.is_ok());

    rt.next().await.assert_error(StatusCode::Error, ids[0]);
    rt.next().await.assert_error(StatusCode::Error, ids[1]);
}

#[tokio::test]
async fn test_group_write_applies_every_value() {
    let mut rt = TestRuntime::new();
    let msg = batch_write(vec![
        (NodeFixtures::temperature(), Value::Int32(7)),
        (NodeFixtures::pressure(), Value::Int32(8)),
    ]);

    assert!(rt.execute(&msg).await.is_ok());

    let response = rt.next().await;
    assert_eq!(response.command(), Some(CommandKind::Write));
    assert!(response
        .responses()
        .iter()
        .all(|r| r.status() == StatusCode::Ok));
    assert_eq!(rt.transport.call_count("write_values"), 1);

    let values = rt
        .execute(&batch_read(
            CommandKind::ReadSync,
            &[NodeFixtures::temperature(), NodeFixtures::pressure()],
        ))
        .await;
    assert_eq!(
        values.value(),
        Some(&Value::Array(vec![Value::Int32(7), Value::Int32(8)]))
    );
}

#[tokio::test]
async fn test_group_request_without_node_id_is_rejected() {
    let mut rt = TestRuntime::new();
    let request = RequestMessageBuilder::alias("temperature").build_request();
    let id = request.request_id();
    let msg = Message::send_requests(CommandKind::ReadSync, endpoint(), vec![request]);

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    assert_eq!(rt.transport.total_calls(), 0);
    rt.next().await.assert_error(StatusCode::ParamInvalid, id);
    rt.expect_silence().await;
}

// =============================================================================
// Method Calls
// =============================================================================

fn method_message(argument: i32) -> Message {
    RequestMessageBuilder::node(NodeFixtures::pump())
        .method(NodeFixtures::start_method())
        .value(argument)
        .build()
}

#[tokio::test]
async fn test_method_publishes_first_output() {
    let mut rt = TestRuntime::new();
    rt.transport.set_method_result(MethodCallResult {
        status: UaStatus::GOOD,
        outputs: vec![Value::from("started"), Value::Int32(1)],
    });

    let msg = method_message(3);
    let id = msg.request_id().unwrap();

    assert!(rt.execute(&msg).await.is_ok());

    let response = rt.next_for(id).await;
    response.assert_general_response(CommandKind::Method, id);
    response.assert_value(&Value::from("started"));

    let calls = rt.transport.method_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, NodeFixtures::pump());
    assert_eq!(calls[0].1, NodeFixtures::start_method());
    assert_eq!(calls[0].2, vec![Value::Int32(3)]);
}

#[tokio::test]
async fn test_method_without_outputs_publishes_nothing() {
    let mut rt = TestRuntime::new();
    rt.transport.set_method_result(MethodCallResult {
        status: UaStatus::GOOD,
        outputs: Vec::new(),
    });

    assert!(rt.execute(&method_message(1)).await.is_ok());

    rt.expect_silence().await;
    assert_eq!(rt.transport.call_count("call_method"), 1);
}

#[tokio::test]
async fn test_method_bad_status_is_error() {
    let mut rt = TestRuntime::new();
    rt.transport.set_method_result(MethodCallResult {
        status: UaStatus::BAD_TYPE_MISMATCH,
        outputs: Vec::new(),
    });

    let msg = method_message(1);
    let id = msg.request_id().unwrap();

    assert!(rt.execute(&msg).await.is_ok());
    rt.next_for(id).await.assert_error(StatusCode::Error, id);
}

#[tokio::test]
async fn test_method_without_object_is_param_invalid() {
    let mut rt = TestRuntime::new();
    let msg = RequestMessageBuilder::alias("pump")
        .method(NodeFixtures::start_method())
        .build();
    let id = msg.request_id().unwrap();

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    assert_eq!(rt.transport.total_calls(), 0);
    rt.next().await.assert_error(StatusCode::ParamInvalid, id);
}
