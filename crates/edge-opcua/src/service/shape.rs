// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node shapes and the attributes each one exposes.

use std::fmt;

use edge_core::NodeAttribute;
use serde::{Deserialize, Serialize};

/// Layout of an array item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayKind {
    /// One-dimensional array without axes.
    Plain,
    /// XY pairs with an X axis.
    Xy,
    /// Two-dimensional image with X and Y axes.
    Image,
    /// Three-dimensional cube with X, Y and Z axes.
    Cube,
}

/// Shape of the node a service serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", content = "kind", rename_all = "snake_case")]
pub enum NodeShape {
    /// Scalar data item.
    Scalar,
    /// Array item with engineering units and axis metadata.
    ArrayItem(ArrayKind),
    /// N-dimensional array item with an axis definition list.
    NDimensionArrayItem,
}

impl NodeShape {
    /// Returns `true` if the shape exposes `attribute`.
    pub fn supports(&self, attribute: NodeAttribute) -> bool {
        use NodeAttribute as A;

        match (self, attribute) {
            (_, A::Value) => true,
            (Self::Scalar, A::Definition | A::ValuePrecision) => true,
            (Self::Scalar, _) => false,
            (
                _,
                A::Definition
                | A::ValuePrecision
                | A::Title
                | A::EngineeringUnits
                | A::EuRange
                | A::InstrumentRange
                | A::AxisScaleType,
            ) => true,
            (Self::ArrayItem(kind), A::XAxisDefinition) => {
                matches!(kind, ArrayKind::Xy | ArrayKind::Image | ArrayKind::Cube)
            }
            (Self::ArrayItem(kind), A::YAxisDefinition) => {
                matches!(kind, ArrayKind::Image | ArrayKind::Cube)
            }
            (Self::ArrayItem(kind), A::ZAxisDefinition) => matches!(kind, ArrayKind::Cube),
            (Self::NDimensionArrayItem, A::AxisDefinition) => true,
            _ => false,
        }
    }

    /// Returns `true` if the value attribute accepts writes.
    ///
    /// XY items hold structured XV values that have no writable encoding.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::ArrayItem(ArrayKind::Xy))
    }

    /// Returns `true` for array shapes.
    pub fn is_array(&self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::ArrayItem(ArrayKind::Plain) => write!(f, "array_item"),
            Self::ArrayItem(ArrayKind::Xy) => write!(f, "xy_array_item"),
            Self::ArrayItem(ArrayKind::Image) => write!(f, "image_item"),
            Self::ArrayItem(ArrayKind::Cube) => write!(f, "cube_item"),
            Self::NDimensionArrayItem => write!(f, "n_dimension_array_item"),
        }
    }
}
