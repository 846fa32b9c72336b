// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Values exchanged with the transport collaborator.
//!
//! - **UaStatus**: raw 32-bit status codes returned by the server
//! - **DataValue**: a decoded value with status and timestamps
//! - **Subscription / monitored item parameters** and their revised results
//! - **DataChangeBatch**: one data-change notification delivered to a listener
//!
//! Intervals are milliseconds as `f64`, matching the wire representation.

use std::fmt;

use chrono::{DateTime, Utc};
use edge_core::{NodeId, SubRequest, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// UaStatus
// =============================================================================

/// Raw status code returned by the server.
///
/// The top two bits carry the severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UaStatus(pub u32);

impl UaStatus {
    /// Good.
    pub const GOOD: UaStatus = UaStatus(0x0000_0000);
    /// Bad, with no more specific reason.
    pub const BAD: UaStatus = UaStatus(0x8000_0000);
    /// Bad_UnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: UaStatus = UaStatus(0x8001_0000);
    /// Bad_InternalError.
    pub const BAD_INTERNAL_ERROR: UaStatus = UaStatus(0x8002_0000);
    /// Bad_CommunicationError.
    pub const BAD_COMMUNICATION_ERROR: UaStatus = UaStatus(0x8005_0000);
    /// Bad_Timeout.
    pub const BAD_TIMEOUT: UaStatus = UaStatus(0x800A_0000);
    /// Bad_NothingToDo.
    pub const BAD_NOTHING_TO_DO: UaStatus = UaStatus(0x800F_0000);
    /// Bad_TooManyOperations.
    pub const BAD_TOO_MANY_OPERATIONS: UaStatus = UaStatus(0x8010_0000);
    /// Bad_SubscriptionIdInvalid.
    pub const BAD_SUBSCRIPTION_ID_INVALID: UaStatus = UaStatus(0x8028_0000);
    /// Bad_NodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: UaStatus = UaStatus(0x8034_0000);
    /// Bad_AttributeIdInvalid.
    pub const BAD_ATTRIBUTE_ID_INVALID: UaStatus = UaStatus(0x8035_0000);
    /// Bad_NotWritable.
    pub const BAD_NOT_WRITABLE: UaStatus = UaStatus(0x803B_0000);
    /// Bad_MonitoredItemIdInvalid.
    pub const BAD_MONITORED_ITEM_ID_INVALID: UaStatus = UaStatus(0x8042_0000);
    /// Bad_TypeMismatch.
    pub const BAD_TYPE_MISMATCH: UaStatus = UaStatus(0x8074_0000);
    /// Bad_SequenceNumberUnknown.
    pub const BAD_SEQUENCE_NUMBER_UNKNOWN: UaStatus = UaStatus(0x807A_0000);
    /// Bad_SequenceNumberInvalid.
    pub const BAD_SEQUENCE_NUMBER_INVALID: UaStatus = UaStatus(0x8087_0000);

    /// Returns the raw code.
    #[inline]
    pub const fn code(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the severity bits are good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity bits are uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity bits are bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name of well-known codes.
    pub const fn name(&self) -> Option<&'static str> {
        match self.0 {
            0x0000_0000 => Some("Good"),
            0x8000_0000 => Some("Bad"),
            0x8001_0000 => Some("BadUnexpectedError"),
            0x8002_0000 => Some("BadInternalError"),
            0x8005_0000 => Some("BadCommunicationError"),
            0x800A_0000 => Some("BadTimeout"),
            0x800F_0000 => Some("BadNothingToDo"),
            0x8010_0000 => Some("BadTooManyOperations"),
            0x8028_0000 => Some("BadSubscriptionIdInvalid"),
            0x8034_0000 => Some("BadNodeIdUnknown"),
            0x8035_0000 => Some("BadAttributeIdInvalid"),
            0x803B_0000 => Some("BadNotWritable"),
            0x8042_0000 => Some("BadMonitoredItemIdInvalid"),
            0x8074_0000 => Some("BadTypeMismatch"),
            0x807A_0000 => Some("BadSequenceNumberUnknown"),
            0x8087_0000 => Some("BadSequenceNumberInvalid"),
            _ => None,
        }
    }
}

impl fmt::Display for UaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#010X})", name, self.0),
            None => write!(f, "{:#010X}", self.0),
        }
    }
}

impl From<u32> for UaStatus {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// Node attributes read by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Access level attribute.
    AccessLevel,
    /// User access level attribute.
    UserAccessLevel,
}

impl AttributeId {
    /// Returns the numeric attribute id.
    pub const fn value(&self) -> u32 {
        match self {
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::Value => 13,
            Self::DataType => 14,
            Self::AccessLevel => 17,
            Self::UserAccessLevel => 18,
        }
    }
}

// =============================================================================
// MonitoringMode
// =============================================================================

/// Monitored item monitoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// Monitoring disabled.
    Disabled,
    /// Sampling enabled, reporting disabled.
    Sampling,
    /// Sampling and reporting enabled.
    #[default]
    Reporting,
}

impl MonitoringMode {
    /// Returns the numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Sampling => 1,
            Self::Reporting => 2,
        }
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value read from or reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    /// Decoded value.
    pub value: Value,
    /// Status of the value.
    pub status: UaStatus,
    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value stamped now.
    pub fn good(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            status: UaStatus::GOOD,
            source_timestamp: Some(Utc::now()),
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Creates a null value with a bad status.
    pub fn bad(status: UaStatus) -> Self {
        Self {
            value: Value::Null,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Returns `true` if the status is good and the value is not null.
    pub fn is_usable(&self) -> bool {
        self.status.is_good() && !self.value.is_null()
    }
}

// =============================================================================
// Subscription Parameters
// =============================================================================

/// Parameters of a create or modify subscription call.
///
/// `None` leaves the parameter to the transport's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParameters {
    /// Requested publishing interval (ms).
    pub publishing_interval: f64,
    /// Requested lifetime count.
    pub lifetime_count: Option<u32>,
    /// Requested max keep-alive count.
    pub max_keep_alive_count: Option<u32>,
    /// Max notifications per publish.
    pub max_notifications_per_publish: Option<u32>,
    /// Priority.
    pub priority: Option<u8>,
    /// Whether publishing starts enabled.
    pub publishing_enabled: bool,
}

impl SubscriptionParameters {
    /// Only a publishing interval; everything else uses transport defaults.
    pub fn with_interval(publishing_interval: f64) -> Self {
        Self {
            publishing_interval,
            lifetime_count: None,
            max_keep_alive_count: None,
            max_notifications_per_publish: None,
            priority: None,
            publishing_enabled: true,
        }
    }

    /// Every parameter taken from the request.
    pub fn explicit(sub: &SubRequest) -> Self {
        Self {
            publishing_interval: sub.publishing_interval(),
            lifetime_count: Some(sub.lifetime_count()),
            max_keep_alive_count: Some(sub.max_keep_alive_count()),
            max_notifications_per_publish: Some(sub.max_notifications_per_publish()),
            priority: Some(sub.priority()),
            publishing_enabled: sub.publishing_enabled(),
        }
    }
}

/// Server-revised subscription parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevisedSubscription {
    /// Subscription id assigned by the server.
    pub subscription_id: u32,
    /// Revised publishing interval (ms).
    pub publishing_interval: f64,
    /// Revised lifetime count.
    pub lifetime_count: u32,
    /// Revised max keep-alive count.
    pub max_keep_alive_count: u32,
}

// =============================================================================
// Monitored Items
// =============================================================================

/// One monitored item to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemCreate {
    /// Monitored node.
    pub node_id: NodeId,
    /// Monitored attribute.
    pub attribute: AttributeId,
    /// Client handle echoed in notifications.
    pub client_handle: u32,
    /// Requested sampling interval (ms).
    pub sampling_interval: f64,
    /// Requested queue size.
    pub queue_size: u32,
    /// Discard the oldest value when the queue is full.
    pub discard_oldest: bool,
    /// Monitoring mode.
    pub mode: MonitoringMode,
}

/// One monitored item to modify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemModify {
    /// Server id of the item.
    pub monitored_item_id: u32,
    /// Client handle echoed in notifications.
    pub client_handle: u32,
    /// Requested sampling interval (ms).
    pub sampling_interval: f64,
    /// Requested queue size.
    pub queue_size: u32,
    /// Discard the oldest value when the queue is full.
    pub discard_oldest: bool,
}

/// Server result for one created or modified monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemResult {
    /// Item status.
    pub status: UaStatus,
    /// Server id of the item.
    pub monitored_item_id: u32,
    /// Revised sampling interval (ms).
    pub revised_sampling_interval: f64,
    /// Revised queue size.
    pub revised_queue_size: u32,
}

impl MonitoredItemResult {
    /// A good result echoing the requested parameters.
    pub fn accepted(monitored_item_id: u32, sampling_interval: f64, queue_size: u32) -> Self {
        Self {
            status: UaStatus::GOOD,
            monitored_item_id,
            revised_sampling_interval: sampling_interval,
            revised_queue_size: queue_size,
        }
    }

    /// A failed result.
    pub fn rejected(status: UaStatus) -> Self {
        Self {
            status,
            monitored_item_id: 0,
            revised_sampling_interval: 0.0,
            revised_queue_size: 0,
        }
    }
}

/// Result of a delete subscriptions call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeleteResults {
    /// Service-level result.
    pub service_result: UaStatus,
    /// One status per requested id.
    pub results: Vec<UaStatus>,
}

// =============================================================================
// Notifications
// =============================================================================

/// One changed item inside a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeItem {
    /// Client handle of the monitored item.
    pub client_handle: u32,
    /// Server id of the monitored item.
    pub monitored_item_id: u32,
    /// New value.
    pub value: DataValue,
}

/// A data-change notification for one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeBatch {
    /// Subscription the batch belongs to.
    pub subscription_id: u32,
    /// Publish time stamped by the server.
    pub publish_time: DateTime<Utc>,
    /// Changed items in notification order.
    pub items: Vec<DataChangeItem>,
}

/// Result of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MethodCallResult {
    /// Call status.
    pub status: UaStatus,
    /// Output arguments.
    pub outputs: Vec<Value>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::SubOperation;

    #[test]
    fn test_status_severity_bits() {
        assert!(UaStatus::GOOD.is_good());
        assert!(UaStatus::BAD_NOTHING_TO_DO.is_bad());
        assert!(!UaStatus::BAD_NOTHING_TO_DO.is_good());
        assert!(UaStatus(0x4000_0000).is_uncertain());
        assert!(!UaStatus(0x4000_0000).is_good());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            UaStatus::BAD_SUBSCRIPTION_ID_INVALID.to_string(),
            "BadSubscriptionIdInvalid (0x80280000)"
        );
        assert_eq!(UaStatus(0x80AB_0000).to_string(), "0x80AB0000");
    }

    #[test]
    fn test_data_value_usable() {
        assert!(DataValue::good(1.0f64).is_usable());
        assert!(!DataValue::bad(UaStatus::BAD_TIMEOUT).is_usable());
        assert!(!DataValue::good(Value::Null).is_usable());
    }

    #[test]
    fn test_subscription_parameters() {
        let sub = SubRequest::builder(SubOperation::Create)
            .publishing_interval(250.0)
            .lifetime_count(90)
            .max_keep_alive_count(30)
            .priority(4)
            .build();

        let explicit = SubscriptionParameters::explicit(&sub);
        assert_eq!(explicit.publishing_interval, 250.0);
        assert_eq!(explicit.lifetime_count, Some(90));
        assert_eq!(explicit.priority, Some(4));

        let plain = SubscriptionParameters::with_interval(250.0);
        assert!(plain.lifetime_count.is_none());
        assert!(plain.publishing_enabled);
    }

    #[test]
    fn test_attribute_ids() {
        assert_eq!(AttributeId::Value.value(), 13);
        assert_eq!(AttributeId::AccessLevel.value(), 17);
        assert_eq!(MonitoringMode::default(), MonitoringMode::Reporting);
    }
}
