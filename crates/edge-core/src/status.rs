// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Operation status taxonomy.
//!
//! Every operation exposed by the edge layer completes with a [`StatusCode`].
//! Transport failures never surface as raw errors; they are mapped to one of
//! these codes, and anything other than [`StatusCode::Ok`] is also published
//! on the dispatch output as an error message.
//!
//! # Categories
//!
//! ```text
//! StatusCode
//! ├── General        OK, ERROR, PARAM_INVALID, INTERNAL_ERROR
//! ├── Subscription   SUB_* (revision drift, delete results, data loss)
//! └── MonitoredItem  MONITOR_*, ALL_ITEMS_ERROR
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// StatusSeverity
// =============================================================================

/// How loudly a status should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    /// Successful completion.
    Info,
    /// A server revised a parameter or reported a recoverable condition.
    Warning,
    /// The operation failed.
    Error,
}

// =============================================================================
// StatusCode
// =============================================================================

/// Outcome of an edge operation.
///
/// Serializes as the upper snake case name (`SUB_DATA_LOSS`), which is also
/// what [`StatusCode::as_str`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    // General
    /// The operation completed successfully.
    #[default]
    Ok,
    /// Generic failure.
    Error,
    /// A request parameter or target is not acceptable.
    ParamInvalid,
    /// An unexpected failure inside the edge layer or the transport.
    InternalError,

    // Subscription
    /// The server dropped notifications for a subscription.
    SubDataLoss,
    /// Revised publishing interval differs from the requested one.
    SubPubIntervalDifference,
    /// Revised lifetime count differs from the request or is below three keep-alives.
    SubLifetimeDifference,
    /// Revised max keep-alive count differs from the requested one.
    SubMaxKeepaliveDifference,
    /// Notification publish time lies in the future.
    SubNotificationTimeInvalid,
    /// A notification batch exceeded the max notifications per publish.
    SubMaxNotificationNotMatch,
    /// Set publishing mode returned no results.
    SubSetpublishEmptyResult,
    /// Delete returned fewer results than requested ids.
    SubDeleteItemDecrease,
    /// Delete returned more results than requested ids.
    SubDeleteItemIncrease,
    /// The server had nothing to do for the request.
    SubNothingToDo,
    /// The request carried too many operations.
    SubTooManyOperation,
    /// The subscription id is not known to the server.
    SubIdInvalid,
    /// The server reported an internal error.
    SubLibInternalError,
    /// The republish sequence number is unknown.
    SubSequenceNumberUnknown,
    /// The republish sequence number is invalid.
    SubSequenceNumberInvalid,
    /// No subscription exists for the endpoint.
    SubNoActiveSubscription,

    // Monitored item
    /// Revised sampling interval differs from the request or is not positive.
    MonitorSamplingIntervalInvalid,
    /// Revised queue size differs from the request or is zero.
    MonitorQueueSizeInvalid,
    /// Every item of a monitored item batch failed the same way.
    AllItemsError,
}

impl StatusCode {
    /// Returns the stable upper snake case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::ParamInvalid => "PARAM_INVALID",
            Self::InternalError => "INTERNAL_ERROR",
            Self::SubDataLoss => "SUB_DATA_LOSS",
            Self::SubPubIntervalDifference => "SUB_PUB_INTERVAL_DIFFERENCE",
            Self::SubLifetimeDifference => "SUB_LIFETIME_DIFFERENCE",
            Self::SubMaxKeepaliveDifference => "SUB_MAX_KEEPALIVE_DIFFERENCE",
            Self::SubNotificationTimeInvalid => "SUB_NOTIFICATION_TIME_INVALID",
            Self::SubMaxNotificationNotMatch => "SUB_MAX_NOTIFICATION_NOT_MATCH",
            Self::SubSetpublishEmptyResult => "SUB_SETPUBLISH_EMPTY_RESULT",
            Self::SubDeleteItemDecrease => "SUB_DELETE_ITEM_DECREASE",
            Self::SubDeleteItemIncrease => "SUB_DELETE_ITEM_INCREASE",
            Self::SubNothingToDo => "SUB_NOTHING_TO_DO",
            Self::SubTooManyOperation => "SUB_TOO_MANY_OPERATION",
            Self::SubIdInvalid => "SUB_ID_INVALID",
            Self::SubLibInternalError => "SUB_LIB_INTERNAL_ERROR",
            Self::SubSequenceNumberUnknown => "SUB_SEQUENCE_NUMBER_UNKNOWN",
            Self::SubSequenceNumberInvalid => "SUB_SEQUENCE_NUMBER_INVALID",
            Self::SubNoActiveSubscription => "SUB_NO_ACTIVE_SUBSCRIPTION",
            Self::MonitorSamplingIntervalInvalid => "MONITOR_SAMPLING_INTERVAL_INVALID",
            Self::MonitorQueueSizeInvalid => "MONITOR_QUEUE_SIZE_INVALID",
            Self::AllItemsError => "ALL_ITEMS_ERROR",
        }
    }

    /// Returns a human-readable description.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Ok => "operation completed",
            Self::Error => "operation failed",
            Self::ParamInvalid => "parameter is invalid",
            Self::InternalError => "internal error",
            Self::SubDataLoss => "subscription notification data was lost",
            Self::SubPubIntervalDifference => {
                "revised publishing interval differs from the requested value"
            }
            Self::SubLifetimeDifference => {
                "revised lifetime count differs from the requested value or is less than three keep-alive counts"
            }
            Self::SubMaxKeepaliveDifference => {
                "revised max keep-alive count differs from the requested value"
            }
            Self::SubNotificationTimeInvalid => "notification publish time is in the future",
            Self::SubMaxNotificationNotMatch => {
                "notification count exceeds the max notifications per publish"
            }
            Self::SubSetpublishEmptyResult => "set publishing mode returned an empty result",
            Self::SubDeleteItemDecrease => "delete returned fewer results than requested",
            Self::SubDeleteItemIncrease => "delete returned more results than requested",
            Self::SubNothingToDo => "nothing to do",
            Self::SubTooManyOperation => "too many operations",
            Self::SubIdInvalid => "subscription id is invalid",
            Self::SubLibInternalError => "server reported an internal error",
            Self::SubSequenceNumberUnknown => "sequence number is unknown",
            Self::SubSequenceNumberInvalid => "sequence number is invalid",
            Self::SubNoActiveSubscription => "no active subscription for the endpoint",
            Self::MonitorSamplingIntervalInvalid => "monitored item sampling interval is invalid",
            Self::MonitorQueueSizeInvalid => "monitored item queue size is invalid",
            Self::AllItemsError => "every monitored item failed",
        }
    }

    /// Returns `true` for [`StatusCode::Ok`].
    #[inline]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns `true` for subscription-specific codes.
    pub const fn is_subscription(&self) -> bool {
        matches!(
            self,
            Self::SubDataLoss
                | Self::SubPubIntervalDifference
                | Self::SubLifetimeDifference
                | Self::SubMaxKeepaliveDifference
                | Self::SubNotificationTimeInvalid
                | Self::SubMaxNotificationNotMatch
                | Self::SubSetpublishEmptyResult
                | Self::SubDeleteItemDecrease
                | Self::SubDeleteItemIncrease
                | Self::SubNothingToDo
                | Self::SubTooManyOperation
                | Self::SubIdInvalid
                | Self::SubLibInternalError
                | Self::SubSequenceNumberUnknown
                | Self::SubSequenceNumberInvalid
                | Self::SubNoActiveSubscription
        )
    }

    /// Returns the log severity of this status.
    pub const fn severity(&self) -> StatusSeverity {
        match self {
            Self::Ok => StatusSeverity::Info,
            Self::SubPubIntervalDifference
            | Self::SubLifetimeDifference
            | Self::SubMaxKeepaliveDifference
            | Self::SubMaxNotificationNotMatch
            | Self::SubNotificationTimeInvalid
            | Self::SubNothingToDo
            | Self::MonitorSamplingIntervalInvalid
            | Self::MonitorQueueSizeInvalid => StatusSeverity::Warning,
            _ => StatusSeverity::Error,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
