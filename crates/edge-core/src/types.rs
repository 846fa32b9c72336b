// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for the edge layer.
//!
//! - **EndpointId / RequestId**: correlation identifiers
//! - **NodeId / NodeRef**: addressing of remote data points
//! - **NodeAttribute**: which part of a node an operation targets
//! - **Value**: decoded variant payloads

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NodeIdError;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a remote endpoint (one connected server session).
///
/// # Examples
///
/// ```
/// use edge_core::types::EndpointId;
///
/// let id = EndpointId::new("opc.tcp://plc-01:4840");
/// assert_eq!(id.as_str(), "opc.tcp://plc-01:4840");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Creates a new endpoint ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Correlation key of a request.
///
/// Drawn from a process-wide monotonic counter, so two outstanding requests
/// never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates the next request id.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an explicit id value.
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// Node identifier: a namespace index plus a numeric, string, GUID or
/// opaque identifier.
///
/// # Examples
///
/// ```
/// use edge_core::types::NodeId;
///
/// let node = NodeId::string(2, "Line1.Temperature");
/// assert_eq!(node.to_string(), "ns=2;s=Line1.Temperature");
///
/// let parsed: NodeId = "ns=2;i=1001".parse().unwrap();
/// assert_eq!(parsed, NodeId::numeric(2, 1001));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Returns `true` if this is a null node ID (ns=0, i=0).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to the `ns=<namespace>;{i|s|g|b}=<identifier>` form.
    ///
    /// The namespace prefix is omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    /// Parses `ns=2;i=1001`, `ns=2;s=Name`, `ns=2;g=<uuid>`, `ns=2;b=<base64>`,
    /// or the same forms without the namespace prefix (namespace 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest
                    .split_once(';')
                    .ok_or_else(|| NodeIdError::new(s, "Missing identifier after namespace"))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| NodeIdError::new(s, "Invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| NodeIdError::new(s, "Invalid numeric identifier"))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id)
                .map_err(|e| NodeIdError::new(s, format!("Invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| NodeIdError::new(s, format!("Invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(NodeIdError::new(
                s,
                "Unknown identifier type. Expected i=, s=, g=, or b=",
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

/// Node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// NodeAttribute
// =============================================================================

/// The part of a node an operation targets.
///
/// `Value` is the node's value attribute. Every other variant names a
/// property child of a data-access item and reads through its browse name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeAttribute {
    /// The node value.
    #[default]
    Value,
    /// Vendor-specific definition of how the value is calculated.
    Definition,
    /// Maximum precision the server can maintain.
    ValuePrecision,
    /// Display title of an array item.
    Title,
    /// Engineering units of the value.
    EngineeringUnits,
    /// Normal operating range.
    EuRange,
    /// Range the instrument can return.
    InstrumentRange,
    /// Scale of the value axis.
    AxisScaleType,
    /// X axis of an XY, image or cube item.
    XAxisDefinition,
    /// Y axis of an image or cube item.
    YAxisDefinition,
    /// Z axis of a cube item.
    ZAxisDefinition,
    /// Axis definitions of an N-dimensional item.
    AxisDefinition,
}

impl NodeAttribute {
    /// Returns the browse name of the property child, or `None` for `Value`.
    pub const fn property_name(&self) -> Option<&'static str> {
        match self {
            Self::Value => None,
            Self::Definition => Some("Definition"),
            Self::ValuePrecision => Some("ValuePrecision"),
            Self::Title => Some("Title"),
            Self::EngineeringUnits => Some("EngineeringUnits"),
            Self::EuRange => Some("EURange"),
            Self::InstrumentRange => Some("InstrumentRange"),
            Self::AxisScaleType => Some("AxisScaleType"),
            Self::XAxisDefinition => Some("XAxisDefinition"),
            Self::YAxisDefinition => Some("YAxisDefinition"),
            Self::ZAxisDefinition => Some("ZAxisDefinition"),
            Self::AxisDefinition => Some("AxisDefinition"),
        }
    }
}

impl fmt::Display for NodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.property_name().unwrap_or("Value"))
    }
}

// =============================================================================
// NodeRef
// =============================================================================

/// Identity of one addressable data point on a remote endpoint.
///
/// The alias names the value-access service responsible for the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeRef {
    /// Node identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Targeted attribute.
    #[serde(default)]
    pub attribute: NodeAttribute,
    /// Alias of the responsible service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl NodeRef {
    /// Creates a reference to the value of a node.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            attribute: NodeAttribute::Value,
            alias: None,
        }
    }

    /// Creates a reference resolved only by alias.
    pub fn alias_only(alias: impl Into<String>) -> Self {
        Self {
            node_id: None,
            attribute: NodeAttribute::Value,
            alias: Some(alias.into()),
        }
    }

    /// Sets the service alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the targeted attribute.
    pub fn with_attribute(mut self, attribute: NodeAttribute) -> Self {
        self.attribute = attribute;
        self
    }

    /// Returns the alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node_id, &self.alias) {
            (Some(id), Some(alias)) => write!(f, "{} ({}) [{}]", alias, id, self.attribute),
            (Some(id), None) => write!(f, "{} [{}]", id, self.attribute),
            (None, Some(alias)) => write!(f, "{} [{}]", alias, self.attribute),
            (None, None) => write!(f, "<unresolved> [{}]", self.attribute),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// A decoded variant value.
///
/// Structured values (ranges, engineering units, axis information) arrive
/// already decoded by the transport as [`Value::Struct`].
///
/// # Examples
///
/// ```
/// use edge_core::types::Value;
///
/// let range = Value::structure([("low", Value::Float64(0.0)), ("high", Value::Float64(100.0))]);
/// assert_eq!(range.field("low").and_then(Value::as_f64), Some(0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// Unsigned 8-bit integer
    UInt8(u8),
    /// Unsigned 16-bit integer
    UInt16(u16),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Unsigned 64-bit integer
    UInt64(u64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string (also localized text)
    String(String),
    /// Byte string
    Bytes(Vec<u8>),
    /// GUID
    Guid(Uuid),
    /// Date and time
    DateTime(DateTime<Utc>),
    /// Array of values
    Array(Vec<Value>),
    /// Named fields of a decoded structure
    Struct(Vec<(String, Value)>),
    /// Null/empty variant
    #[default]
    Null,
}

impl Value {
    /// Builds a structure value from name/value pairs.
    pub fn structure<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Guid(_) => "guid",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Null => "null",
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to convert this value to a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int8(v) => Some(*v as f64),
            Value::Int16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt8(v) => Some(*v as f64),
            Value::UInt16(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get this value as a string reference.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to get this value as an array reference.
    #[inline]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a named field of a structure value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Guid(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Array(v) => write!(f, "[{} elements]", v.len()),
            Value::Struct(v) => write!(f, "{{{} fields}}", v.len()),
            Value::Null => write!(f, "null"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $type:ty) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_for_value!(Bool, bool);
impl_from_for_value!(Int16, i16);
impl_from_for_value!(Int32, i32);
impl_from_for_value!(Int64, i64);
impl_from_for_value!(UInt16, u16);
impl_from_for_value!(UInt32, u32);
impl_from_for_value!(UInt64, u64);
impl_from_for_value!(Float32, f32);
impl_from_for_value!(Float64, f64);
impl_from_for_value!(String, String);
impl_from_for_value!(DateTime, DateTime<Utc>);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_monotonic() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert!(b > a);
        assert_eq!(RequestId::from_raw(42).value(), 42);
    }

    #[test]
    fn test_node_id_parse_forms() {
        assert_eq!("ns=2;i=1001".parse::<NodeId>().unwrap(), NodeId::numeric(2, 1001));
        assert_eq!("s=Plain".parse::<NodeId>().unwrap(), NodeId::string(0, "Plain"));
        assert_eq!(
            "ns=3;b=AQI=".parse::<NodeId>().unwrap(),
            NodeId::opaque(3, vec![1, 2])
        );

        let guid = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse::<NodeId>().unwrap();
        assert!(matches!(guid.identifier, NodeIdentifier::Guid(_)));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=2;q=1".parse::<NodeId>().is_err());
        assert!("ns=2;i=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_display_round_trips() {
        let node = NodeId::string(2, "Line1.Temperature");
        let parsed: NodeId = node.to_string().parse().unwrap();
        assert_eq!(parsed, node);
        assert_eq!(NodeId::numeric(0, 85).to_string(), "i=85");
        assert!(NodeId::numeric(0, 0).is_null());
    }

    #[test]
    fn test_node_attribute_property_names() {
        assert_eq!(NodeAttribute::Value.property_name(), None);
        assert_eq!(NodeAttribute::EuRange.property_name(), Some("EURange"));
        assert_eq!(NodeAttribute::XAxisDefinition.to_string(), "XAxisDefinition");
    }

    #[test]
    fn test_node_ref_builders() {
        let node = NodeRef::new(NodeId::numeric(2, 7))
            .with_alias("Boiler/Temp")
            .with_attribute(NodeAttribute::Title);
        assert_eq!(node.alias(), Some("Boiler/Temp"));
        assert_eq!(node.attribute, NodeAttribute::Title);
        assert!(node.to_string().contains("Boiler/Temp"));

        assert!(NodeRef::alias_only("group").node_id.is_none());
    }

    #[test]
    fn test_value_structure_field() {
        let eu = Value::structure([
            ("display_name", Value::from("°C")),
            ("unit_id", Value::Int32(4408652)),
        ]);
        assert_eq!(eu.field("display_name").and_then(Value::as_str), Some("°C"));
        assert!(eu.field("missing").is_none());
        assert_eq!(eu.type_name(), "struct");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(1.5f64).as_f64(), Some(1.5));
        assert_eq!(Value::UInt32(7).as_i64(), Some(7));
        assert!(Value::default().is_null());
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
