// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Checks applied to server results.
//!
//! Every check here is a pure function over the requested parameters and
//! what the server returned. The manager and the notification listener turn
//! the findings into error reports.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use edge_core::{StatusCode, SubRequest};

use crate::types::{DeleteResults, MonitoredItemResult, RevisedSubscription, UaStatus};

const LARGER_THAN_REQUEST: &str = "revised value is larger than request";
const SMALLER_THAN_REQUEST: &str = "revised value is smaller than request";

/// One finding of [`check_monitored_items`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemIssue {
    /// Status to report.
    pub status: StatusCode,
    /// Report detail.
    pub detail: String,
}

impl ItemIssue {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

fn drift_detail<T: PartialOrd>(status: StatusCode, requested: T, revised: T) -> String {
    if revised > requested {
        LARGER_THAN_REQUEST.to_string()
    } else if revised < requested {
        SMALLER_THAN_REQUEST.to_string()
    } else {
        status.description().to_string()
    }
}

// =============================================================================
// Monitored Items
// =============================================================================

/// Validates the results of a monitored item creation.
///
/// Findings are returned in result order, with the aggregate
/// `ALL_ITEMS_ERROR` last.
pub fn check_monitored_items(
    requested_sampling_interval: f64,
    requested_queue_size: u32,
    results: &[MonitoredItemResult],
) -> Vec<ItemIssue> {
    if results.is_empty() {
        return vec![ItemIssue::new(
            StatusCode::Error,
            "monitored item result is empty",
        )];
    }

    let mut issues = Vec::new();
    let mut first_bad: Option<UaStatus> = None;
    let mut same_bad = 0usize;
    let mut sampling_anomalies = 0usize;
    let mut seen_ids = HashSet::new();

    for (index, item) in results.iter().enumerate() {
        if !item.status.is_good() {
            if index == 0 {
                issues.push(ItemIssue::new(StatusCode::Error, item.status.to_string()));
            }
            if *first_bad.get_or_insert(item.status) == item.status {
                same_bad += 1;
            }
            continue;
        }

        let revised_sampling = item.revised_sampling_interval;
        if revised_sampling != requested_sampling_interval || revised_sampling <= 0.0 {
            sampling_anomalies += 1;
            let status = StatusCode::MonitorSamplingIntervalInvalid;
            issues.push(ItemIssue::new(
                status,
                drift_detail(status, requested_sampling_interval, revised_sampling),
            ));
        }

        let revised_queue = item.revised_queue_size;
        if revised_queue != requested_queue_size || revised_queue == 0 {
            let status = StatusCode::MonitorQueueSizeInvalid;
            issues.push(ItemIssue::new(
                status,
                drift_detail(status, requested_queue_size, revised_queue),
            ));
        }

        if index == 0 && item.monitored_item_id == 0 {
            issues.push(ItemIssue::new(StatusCode::Error, "item ID is invalid"));
        } else if !seen_ids.insert(item.monitored_item_id) {
            issues.push(ItemIssue::new(
                StatusCode::Error,
                format!("duplicate item ID {} is used", index),
            ));
        }
    }

    if same_bad == results.len() || sampling_anomalies == results.len() {
        let shared = first_bad.unwrap_or(UaStatus::BAD);
        issues.push(ItemIssue::new(StatusCode::AllItemsError, shared.to_string()));
    }

    issues
}

// =============================================================================
// Notifications
// =============================================================================

/// Checks one notification batch against the requested parameters.
///
/// Returns the first violation only.
pub fn check_notification(
    requested: &SubRequest,
    revised: &RevisedSubscription,
    batch_len: usize,
    publish_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<StatusCode> {
    if revised.publishing_interval != requested.publishing_interval() {
        return Some(StatusCode::SubPubIntervalDifference);
    }

    let min_lifetime = requested.max_keep_alive_count().saturating_mul(3);
    if revised.lifetime_count != requested.lifetime_count() || revised.lifetime_count < min_lifetime
    {
        return Some(StatusCode::SubLifetimeDifference);
    }

    if revised.max_keep_alive_count != requested.max_keep_alive_count() {
        return Some(StatusCode::SubMaxKeepaliveDifference);
    }

    if publish_time > now {
        return Some(StatusCode::SubNotificationTimeInvalid);
    }

    let max = requested.max_notifications_per_publish();
    if max != 0 && batch_len > max as usize {
        return Some(StatusCode::SubMaxNotificationNotMatch);
    }

    None
}

// =============================================================================
// Delete
// =============================================================================

/// Maps a per-subscription delete status.
pub fn map_delete_status(status: UaStatus) -> StatusCode {
    match status {
        UaStatus::BAD_NOTHING_TO_DO => StatusCode::SubNothingToDo,
        UaStatus::BAD_TOO_MANY_OPERATIONS => StatusCode::SubTooManyOperation,
        UaStatus::BAD_SUBSCRIPTION_ID_INVALID => StatusCode::SubIdInvalid,
        UaStatus::BAD_INTERNAL_ERROR => StatusCode::SubLibInternalError,
        UaStatus::BAD_SEQUENCE_NUMBER_UNKNOWN => StatusCode::SubSequenceNumberUnknown,
        UaStatus::BAD_SEQUENCE_NUMBER_INVALID => StatusCode::SubSequenceNumberInvalid,
        _ => StatusCode::Error,
    }
}

/// Validates a delete subscriptions response for `requested` ids.
pub fn check_delete_results(
    requested: usize,
    response: &DeleteResults,
) -> Vec<(StatusCode, UaStatus)> {
    if response.service_result.is_good() {
        if response.results.len() < requested {
            return vec![(StatusCode::SubDeleteItemDecrease, response.service_result)];
        }
        if response.results.len() > requested {
            return vec![(StatusCode::SubDeleteItemIncrease, response.service_result)];
        }
    } else {
        return vec![(map_delete_status(response.service_result), response.service_result)];
    }

    response
        .results
        .iter()
        .filter(|status| !status.is_good())
        .map(|&status| (map_delete_status(status), status))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use edge_core::SubOperation;

    fn accepted(id: u32) -> MonitoredItemResult {
        MonitoredItemResult::accepted(id, 500.0, 1)
    }

    #[test]
    fn test_clean_batch_has_no_issues() {
        let results = [accepted(1), accepted(2)];
        assert!(check_monitored_items(500.0, 1, &results).is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let issues = check_monitored_items(500.0, 1, &[]);
        assert_eq!(
            issues,
            vec![ItemIssue::new(StatusCode::Error, "monitored item result is empty")]
        );
    }

    #[test]
    fn test_all_same_bad_yields_one_aggregate() {
        let bad = MonitoredItemResult::rejected(UaStatus::BAD_NODE_ID_UNKNOWN);
        let issues = check_monitored_items(500.0, 1, &[bad, bad, bad]);

        let aggregates: Vec<_> = issues
            .iter()
            .filter(|i| i.status == StatusCode::AllItemsError)
            .collect();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].detail, UaStatus::BAD_NODE_ID_UNKNOWN.to_string());

        // Only the first bad item is reported individually.
        let individual = issues.iter().filter(|i| i.status == StatusCode::Error).count();
        assert_eq!(individual, 1);
    }

    #[test]
    fn test_mixed_bad_has_no_aggregate() {
        let results = [
            MonitoredItemResult::rejected(UaStatus::BAD_NODE_ID_UNKNOWN),
            MonitoredItemResult::rejected(UaStatus::BAD_TYPE_MISMATCH),
        ];
        let issues = check_monitored_items(500.0, 1, &results);
        assert!(issues.iter().all(|i| i.status != StatusCode::AllItemsError));
    }

    #[test]
    fn test_duplicate_id_reported_once_for_later_item() {
        let results = [accepted(4), accepted(4)];
        let issues = check_monitored_items(500.0, 1, &results);

        assert_eq!(
            issues,
            vec![ItemIssue::new(StatusCode::Error, "duplicate item ID 1 is used")]
        );
    }

    #[test]
    fn test_zero_id_at_first_index() {
        let issues = check_monitored_items(500.0, 1, &[accepted(0)]);
        assert_eq!(issues, vec![ItemIssue::new(StatusCode::Error, "item ID is invalid")]);
    }

    #[test]
    fn test_sampling_drift_details() {
        let larger = MonitoredItemResult::accepted(1, 750.0, 1);
        let smaller = MonitoredItemResult::accepted(2, 250.0, 1);
        let issues = check_monitored_items(500.0, 1, &[larger, smaller]);

        assert_eq!(issues[0].status, StatusCode::MonitorSamplingIntervalInvalid);
        assert_eq!(issues[0].detail, LARGER_THAN_REQUEST);
        assert_eq!(issues[1].status, StatusCode::MonitorSamplingIntervalInvalid);
        assert_eq!(issues[1].detail, SMALLER_THAN_REQUEST);
        // Every item drifted.
        assert_eq!(issues[2].status, StatusCode::AllItemsError);
        assert_eq!(issues[2].detail, UaStatus::BAD.to_string());
    }

    #[test]
    fn test_queue_drift() {
        let item = MonitoredItemResult::accepted(1, 500.0, 10);
        let issues = check_monitored_items(500.0, 1, &[item]);
        assert_eq!(
            issues,
            vec![ItemIssue::new(StatusCode::MonitorQueueSizeInvalid, LARGER_THAN_REQUEST)]
        );
    }

    fn sub(lifetime: u32, keep_alive: u32, max_notifications: u32) -> SubRequest {
        SubRequest::builder(SubOperation::Create)
            .publishing_interval(1000.0)
            .lifetime_count(lifetime)
            .max_keep_alive_count(keep_alive)
            .max_notifications_per_publish(max_notifications)
            .conformance(true)
            .build()
    }

    fn echo(sub: &SubRequest) -> RevisedSubscription {
        RevisedSubscription {
            subscription_id: 1,
            publishing_interval: sub.publishing_interval(),
            lifetime_count: sub.lifetime_count(),
            max_keep_alive_count: sub.max_keep_alive_count(),
        }
    }

    #[test]
    fn test_notification_conforms() {
        let now = Utc::now();
        let sub = sub(30, 10, 0);
        assert_eq!(check_notification(&sub, &echo(&sub), 100, now, now), None);
    }

    #[test]
    fn test_lifetime_below_three_keep_alives() {
        let now = Utc::now();
        let sub = sub(20, 10, 0);
        assert_eq!(
            check_notification(&sub, &echo(&sub), 1, now, now),
            Some(StatusCode::SubLifetimeDifference)
        );
    }

    #[test]
    fn test_first_violation_wins() {
        let now = Utc::now();
        let sub = sub(30, 10, 1);
        let mut revised = echo(&sub);
        revised.publishing_interval = 2000.0;
        revised.max_keep_alive_count = 5;

        assert_eq!(
            check_notification(&sub, &revised, 5, now + Duration::seconds(5), now),
            Some(StatusCode::SubPubIntervalDifference)
        );
    }

    #[test]
    fn test_future_publish_time_and_batch_size() {
        let now = Utc::now();
        let sub = sub(30, 10, 2);
        let revised = echo(&sub);

        assert_eq!(
            check_notification(&sub, &revised, 1, now + Duration::seconds(5), now),
            Some(StatusCode::SubNotificationTimeInvalid)
        );
        assert_eq!(
            check_notification(&sub, &revised, 3, now, now),
            Some(StatusCode::SubMaxNotificationNotMatch)
        );
    }

    #[test]
    fn test_delete_count_mismatch() {
        let fewer = DeleteResults::default();
        assert_eq!(
            check_delete_results(1, &fewer)[0].0,
            StatusCode::SubDeleteItemDecrease
        );

        let more = DeleteResults {
            service_result: UaStatus::GOOD,
            results: vec![UaStatus::GOOD, UaStatus::GOOD],
        };
        assert_eq!(
            check_delete_results(1, &more)[0].0,
            StatusCode::SubDeleteItemIncrease
        );
    }

    #[test]
    fn test_delete_status_mapping() {
        let response = DeleteResults {
            service_result: UaStatus::GOOD,
            results: vec![UaStatus::BAD_SUBSCRIPTION_ID_INVALID],
        };
        assert_eq!(
            check_delete_results(1, &response),
            vec![(StatusCode::SubIdInvalid, UaStatus::BAD_SUBSCRIPTION_ID_INVALID)]
        );
        assert_eq!(map_delete_status(UaStatus::BAD_TIMEOUT), StatusCode::Error);
        assert!(check_delete_results(
            1,
            &DeleteResults {
                service_result: UaStatus::GOOD,
                results: vec![UaStatus::GOOD],
            }
        )
        .is_empty());
    }
}
