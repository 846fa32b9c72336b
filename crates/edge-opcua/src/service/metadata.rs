// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Static node metadata collected once per service.

use edge_core::Value;
use serde::{Deserialize, Serialize};

use crate::error::OpcUaResult;
use crate::types::DataValue;

/// Cached metadata of a node.
///
/// Every field is collected independently; a field that could not be read
/// stays `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Data type of the value attribute.
    pub data_type: Option<String>,
    /// Access mode: `read`, `write`, `readwrite` or `none`.
    pub access: Option<String>,
    /// Node description.
    pub description: Option<String>,
    /// Vendor definition of the value.
    pub definition: Option<String>,
    /// Value precision.
    pub precision: Option<String>,
    /// Display name of the engineering units.
    pub units: Option<String>,
    /// Lower bound of the normal operating range.
    pub min: Option<String>,
    /// Upper bound of the normal operating range.
    pub max: Option<String>,
    /// Axis scale type.
    pub scale: Option<String>,
}

impl NodeMetadata {
    /// Number of fields that were collected.
    pub fn collected(&self) -> usize {
        [
            &self.data_type,
            &self.access,
            &self.description,
            &self.definition,
            &self.precision,
            &self.units,
            &self.min,
            &self.max,
            &self.scale,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

/// Maps an access level bit mask to its mode name.
pub(crate) fn access_mode(level: i64) -> &'static str {
    match (level & 0x01 != 0, level & 0x02 != 0) {
        (true, true) => "readwrite",
        (true, false) => "read",
        (false, true) => "write",
        (false, false) => "none",
    }
}

/// Extracts a usable value from one metadata read, logging and skipping failures.
pub(crate) fn usable(field: &'static str, result: OpcUaResult<DataValue>) -> Option<Value> {
    match result {
        Ok(data) if data.is_usable() => Some(data.value),
        Ok(data) => {
            tracing::debug!(field, status = %data.status, "Metadata field unavailable");
            None
        }
        Err(e) => {
            tracing::debug!(field, error = %e, "Metadata field read failed");
            None
        }
    }
}

/// Low and high bounds of a decoded range structure.
pub(crate) fn range_bounds(range: &Value) -> Option<(&Value, &Value)> {
    Some((range.field("Low")?, range.field("High")?))
}

/// Range of a decoded axis information structure.
pub(crate) fn axis_range(axis: &Value) -> Option<(&Value, &Value)> {
    range_bounds(axis.field("EURange")?)
}

/// Display name of a decoded engineering units structure.
pub(crate) fn units_name(units: &Value) -> String {
    units
        .field("DisplayName")
        .map(ToString::to_string)
        .unwrap_or_else(|| units.to_string())
}
