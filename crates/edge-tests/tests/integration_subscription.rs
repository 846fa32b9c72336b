// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription integration tests.
//!
//! Each test drives the subscription manager through the dispatcher and
//! plays the server side through the mock transport's captured listeners.

use chrono::{Duration as ChronoDuration, Utc};
use edge_core::{CommandKind, MessageKind, RequestId, StatusCode, Value};
use edge_opcua::{AttributeId, DeleteResults, MonitoredItemResult, MonitoringMode, UaStatus};
use edge_tests::prelude::*;

/// Creates the fixture subscription and returns its request id.
async fn create(rt: &mut TestRuntime) -> RequestId {
    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::create());
    let id = msg.request_id().unwrap();
    assert!(rt.execute(&msg).await.is_ok());
    id
}

fn subscription_id(rt: &TestRuntime) -> u32 {
    rt.runtime
        .subscriptions()
        .handle_for(&endpoint())
        .expect("active subscription")
        .subscription_id()
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_subscribes_one_monitored_item() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    let created = rt.transport.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].publishing_interval, 1000.0);
    assert_eq!(created[0].lifetime_count, None);

    let items = rt.transport.created_items();
    assert_eq!(items.len(), 1);
    let (sub_id, item) = &items[0];
    assert_eq!(*sub_id, 1);
    assert_eq!(item.node_id, NodeFixtures::temperature());
    assert_eq!(item.attribute, AttributeId::Value);
    assert_eq!(item.sampling_interval, 500.0);
    assert_eq!(item.queue_size, 1);
    assert!(item.discard_oldest);
    assert_eq!(item.mode, MonitoringMode::Reporting);

    let handle = rt.runtime.subscriptions().handle_for(&endpoint()).unwrap();
    assert_eq!(handle.subscription_id(), 1);
    assert_eq!(handle.monitored_item_ids(), &[100]);
    rt.expect_silence().await;
}

#[tokio::test]
async fn test_first_notification_also_answers_the_request() {
    let mut rt = TestRuntime::new();
    let id = create(&mut rt).await;
    let sub_id = subscription_id(&rt);

    rt.transport
        .fire_data_change(sub_id, vec![Value::Float64(20.5)])
        .await;
    let first = rt.drain();
    assert_eq!(first.len(), 2);
    first[0].assert_general_response(CommandKind::Subscribe, id);
    first[0].assert_value(&Value::Float64(20.5));
    first[1].assert_report(id);
    first[1].assert_value(&Value::Float64(20.5));
    assert!(first[1].responses()[0].timestamp().is_some());

    rt.transport
        .fire_data_change(sub_id, vec![Value::Float64(21.0)])
        .await;
    let second = rt.drain();
    assert_eq!(second.len(), 1);
    second[0].assert_report(id);
    second[0].assert_value(&Value::Float64(21.0));

    assert_eq!(rt.runtime.subscriptions().stats().notifications(), 2);
}

#[tokio::test]
async fn test_every_item_of_a_batch_is_reported() {
    let mut rt = TestRuntime::new();
    let id = create(&mut rt).await;

    rt.transport
        .fire_data_change(
            subscription_id(&rt),
            vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)],
        )
        .await;

    let messages = rt.drain();
    assert_eq!(count_kind(&messages, MessageKind::GeneralResponse), 1);
    assert_eq!(count_kind(&messages, MessageKind::Report), 3);
    assert!(messages.iter().all(|m| m.request_id() == Some(id)));
}

#[tokio::test]
async fn test_second_create_replaces_the_first() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    let second = create(&mut rt).await;

    let subscriptions = rt.runtime.subscriptions();
    assert_eq!(subscriptions.len(), 1);
    let handle = subscriptions.handle_for(&endpoint()).unwrap();
    assert_eq!(handle.subscription_id(), 2);
    assert_eq!(handle.request_id(), second);

    assert_eq!(rt.transport.deleted(), vec![1]);
    assert_eq!(rt.transport.subscription_listener_count(), 1);
    assert_eq!(rt.transport.notification_listener_count(2), 1);
}

#[tokio::test]
async fn test_create_without_node_id_never_reaches_transport() {
    let mut rt = TestRuntime::new();
    let msg = RequestMessageBuilder::alias("temperature")
        .subscribe(SubFixtures::create())
        .build();
    let id = msg.request_id().unwrap();

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::ParamInvalid);
    assert_eq!(rt.transport.total_calls(), 0);
    rt.next().await.assert_error(StatusCode::ParamInvalid, id);
}

#[tokio::test]
async fn test_create_failure_leaves_no_handle() {
    let mut rt = TestRuntime::new();
    rt.transport.fail_subscriptions(true);

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::create());
    let id = msg.request_id().unwrap();

    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::Error);
    assert!(rt.runtime.subscriptions().is_empty());
    rt.next().await.assert_error(StatusCode::Error, id);
}

// =============================================================================
// Monitored Item Checks
// =============================================================================

#[tokio::test]
async fn test_all_items_failing_alike_reports_once() {
    let mut rt = TestRuntime::new();
    rt.transport.script_monitored_items(vec![
        MonitoredItemResult::rejected(UaStatus::BAD_NODE_ID_UNKNOWN),
        MonitoredItemResult::rejected(UaStatus::BAD_NODE_ID_UNKNOWN),
    ]);
    let id = create(&mut rt).await;

    let messages = rt.drain();
    assert_eq!(count_errors(&messages, StatusCode::AllItemsError), 1);
    assert!(messages.iter().all(|m| m.request_id() == Some(id)));

    let handle = rt.runtime.subscriptions().handle_for(&endpoint()).unwrap();
    assert!(handle.monitored_item_ids().is_empty());
}

#[tokio::test]
async fn test_duplicate_item_id_reports_once() {
    let mut rt = TestRuntime::new();
    rt.transport.script_monitored_items(vec![
        MonitoredItemResult::accepted(100, 500.0, 1),
        MonitoredItemResult::accepted(100, 500.0, 1),
    ]);
    let id = create(&mut rt).await;

    let messages = rt.drain();
    assert_eq!(messages.len(), 1);
    messages[0].assert_error(StatusCode::Error, id);
    assert_eq!(
        messages[0].error_report().unwrap().detail.as_deref(),
        Some("duplicate item ID 1 is used")
    );

    let handle = rt.runtime.subscriptions().handle_for(&endpoint()).unwrap();
    assert_eq!(handle.monitored_item_ids(), &[100]);
}

#[tokio::test]
async fn test_revised_sampling_drift_is_reported() {
    let mut rt = TestRuntime::new();
    rt.transport
        .script_monitored_items(vec![MonitoredItemResult::accepted(100, 1000.0, 1)]);
    let id = create(&mut rt).await;

    let messages = rt.drain();
    let sampling: Vec<_> = messages
        .iter()
        .filter_map(|m| m.error_report())
        .filter(|r| r.status == StatusCode::MonitorSamplingIntervalInvalid)
        .collect();
    assert_eq!(sampling.len(), 1);
    assert_eq!(sampling[0].request_id, id);
    assert_eq!(
        sampling[0].detail.as_deref(),
        Some("revised value is larger than request")
    );
    // A single item with drift is also every item with drift.
    assert_eq!(count_errors(&messages, StatusCode::AllItemsError), 1);
}

// =============================================================================
// Conformance
// =============================================================================

#[tokio::test]
async fn test_short_lifetime_reported_per_batch() {
    let mut rt = TestRuntime::new();
    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::conformance(20, 10));
    let id = msg.request_id().unwrap();
    assert!(rt.execute(&msg).await.is_ok());
    let created = rt.transport.created();
    assert_eq!(created[0].lifetime_count, Some(20));
    let sub_id = subscription_id(&rt);

    rt.transport.fire_data_change(sub_id, vec![Value::Int32(1)]).await;
    rt.transport.fire_data_change(sub_id, vec![Value::Int32(2)]).await;

    let messages = rt.drain();
    assert_eq!(count_errors(&messages, StatusCode::SubLifetimeDifference), 2);
    assert_eq!(count_kind(&messages, MessageKind::Report), 2);
    assert!(messages.iter().all(|m| m.request_id() == Some(id)));
}

#[tokio::test]
async fn test_conforming_server_reports_nothing_extra() {
    let mut rt = TestRuntime::new();
    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::conformance(30, 10));
    assert!(rt.execute(&msg).await.is_ok());

    rt.transport
        .fire_data_change(subscription_id(&rt), vec![Value::Int32(1)])
        .await;

    let messages = rt.drain();
    assert_eq!(count_kind(&messages, MessageKind::Error), 0);
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn test_future_publish_time_is_reported() {
    let mut rt = TestRuntime::new();
    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::conformance(30, 10));
    assert!(rt.execute(&msg).await.is_ok());

    rt.transport
        .fire_data_change_at(
            subscription_id(&rt),
            Utc::now() + ChronoDuration::seconds(60),
            vec![Value::Int32(1)],
        )
        .await;

    let messages = rt.drain();
    assert_eq!(
        count_errors(&messages, StatusCode::SubNotificationTimeInvalid),
        1
    );
}

#[tokio::test]
async fn test_unchecked_subscription_skips_conformance() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    rt.transport
        .fire_data_change_at(
            subscription_id(&rt),
            Utc::now() + ChronoDuration::seconds(60),
            vec![Value::Int32(1)],
        )
        .await;

    assert_eq!(count_kind(&rt.drain(), MessageKind::Error), 0);
}

// =============================================================================
// Modify
// =============================================================================

#[tokio::test]
async fn test_modify_applies_new_sampling_interval() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::modify(250.0));
    let result = rt.execute(&msg).await;

    assert!(result.is_ok());
    let handle = rt.runtime.subscriptions().handle_for(&endpoint()).unwrap();
    assert_eq!(handle.subscription_id(), 1);
    assert_eq!(handle.sub_request().sampling_interval(), 250.0);

    let modified = rt.transport.modified();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].0, 1);

    let items = rt.transport.modified_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0, 1);
    assert_eq!(items[0].1.monitored_item_id, 100);
    assert_eq!(items[0].1.sampling_interval, 250.0);

    assert_eq!(rt.transport.call_count("set_publishing_mode"), 1);
    assert_eq!(rt.runtime.subscriptions().stats().modified(), 1);
    rt.expect_silence().await;
}

#[tokio::test]
async fn test_modify_empty_publishing_result_is_reported() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    rt.transport.script_publishing_mode(Vec::new());

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::modify(250.0));
    let id = msg.request_id().unwrap();
    rt.execute(&msg).await;

    rt.next().await.assert_error(StatusCode::SubSetpublishEmptyResult, id);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_removes_the_handle() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::delete());
    let result = rt.execute(&msg).await;

    assert!(result.is_ok());
    assert!(rt.runtime.subscriptions().is_empty());
    assert_eq!(rt.transport.deleted(), vec![1]);
    assert_eq!(rt.transport.call_count("delete_monitored_items"), 1);
    rt.expect_silence().await;
}

#[tokio::test]
async fn test_delete_counts_item_result_mismatch() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    rt.transport.script_item_delete(Vec::new());

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::delete());
    let result = rt.execute(&msg).await;

    assert!(result.is_ok());
    assert!(rt.runtime.subscriptions().is_empty());
    assert_eq!(rt.runtime.subscriptions().stats().item_delete_mismatches(), 1);
    rt.expect_silence().await;
}

#[tokio::test]
async fn test_delete_with_fewer_results_is_decrease() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    rt.transport.script_delete(DeleteResults {
        service_result: UaStatus::GOOD,
        results: Vec::new(),
    });

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::delete());
    let id = msg.request_id().unwrap();
    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::SubDeleteItemDecrease);
    rt.next().await.assert_error(StatusCode::SubDeleteItemDecrease, id);
}

#[tokio::test]
async fn test_delete_with_more_results_is_increase() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    rt.transport.script_delete(DeleteResults {
        service_result: UaStatus::GOOD,
        results: vec![UaStatus::GOOD, UaStatus::GOOD],
    });

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::delete());
    let id = msg.request_id().unwrap();
    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::SubDeleteItemIncrease);
    rt.next().await.assert_error(StatusCode::SubDeleteItemIncrease, id);
}

#[tokio::test]
async fn test_delete_bad_item_status_is_mapped() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;
    rt.transport.script_delete(DeleteResults {
        service_result: UaStatus::GOOD,
        results: vec![UaStatus::BAD_SUBSCRIPTION_ID_INVALID],
    });

    let msg = subscribe(NodeFixtures::temperature(), SubFixtures::delete());
    let id = msg.request_id().unwrap();
    let result = rt.execute(&msg).await;

    assert_eq!(result.status_code(), StatusCode::SubIdInvalid);
    rt.next().await.assert_error(StatusCode::SubIdInvalid, id);
}

// =============================================================================
// Republish and Missing Subscriptions
// =============================================================================

#[tokio::test]
async fn test_republish_advances_the_sequence() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    for _ in 0..2 {
        let msg = subscribe(NodeFixtures::temperature(), SubFixtures::republish());
        assert!(rt.execute(&msg).await.is_ok());
    }

    assert_eq!(rt.transport.republished(), vec![(1, 1), (1, 2)]);
    assert_eq!(rt.runtime.subscriptions().stats().republished(), 2);
}

#[tokio::test]
async fn test_operations_without_subscription_fail_fast() {
    let mut rt = TestRuntime::new();

    for sub in [
        SubFixtures::modify(250.0),
        SubFixtures::delete(),
        SubFixtures::republish(),
    ] {
        let msg = subscribe(NodeFixtures::temperature(), sub);
        let id = msg.request_id().unwrap();

        let result = rt.execute(&msg).await;

        assert_eq!(result.status_code(), StatusCode::SubNoActiveSubscription);
        rt.next()
            .await
            .assert_error(StatusCode::SubNoActiveSubscription, id);
    }
    assert_eq!(rt.transport.total_calls(), 0);
}

// =============================================================================
// Lifecycle Events
// =============================================================================

#[tokio::test]
async fn test_data_loss_is_reported_against_the_subscription() {
    let mut rt = TestRuntime::new();
    let id = create(&mut rt).await;

    rt.transport.fire_data_lost(subscription_id(&rt));

    rt.next().await.assert_error(StatusCode::SubDataLoss, id);
}

#[tokio::test]
async fn test_data_loss_for_unknown_subscription_is_ignored() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    rt.transport.fire_data_lost(99);
    rt.transport.fire_keep_alive(1);

    rt.expect_silence().await;
}

#[tokio::test]
async fn test_publish_failure_is_reported() {
    let mut rt = TestRuntime::new();
    let id = create(&mut rt).await;

    rt.transport.fire_publish_failure("timeout");

    let error = rt.next().await;
    error.assert_error(StatusCode::Error, id);
    assert_eq!(
        error.error_report().unwrap().detail.as_deref(),
        Some("publish failed: timeout")
    );
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_deletes_live_subscriptions() {
    let mut rt = TestRuntime::new();
    create(&mut rt).await;

    rt.runtime.shutdown().await;

    assert!(rt.runtime.subscriptions().is_empty());
    assert_eq!(rt.transport.deleted(), vec![1]);
    assert_eq!(rt.runtime.subscriptions().stats().deleted(), 1);
}
