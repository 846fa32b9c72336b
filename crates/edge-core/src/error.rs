// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the edge core layer.
//!
//! # Error Hierarchy
//!
//! ```text
//! EdgeError (root)
//! ├── ConfigError     - Configuration parsing and validation
//! ├── BusError        - Dispatch output operations
//! └── NodeIdError     - Node identifier parsing
//! ```
//!
//! Transport and subscription failures live in `edge-opcua`; they are turned
//! into [`StatusCode`](crate::status::StatusCode) values before reaching the
//! dispatch output, so callers of this crate only ever see the three kinds
//! above as Rust errors.
//!
//! # Examples
//!
//! ```
//! use edge_core::error::{EdgeError, ConfigError};
//!
//! let error = ConfigError::validation("output.capacity", "must be greater than 0");
//! let edge_error: EdgeError = error.into();
//! assert!(!edge_error.is_retryable());
//! ```

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// EdgeError - Root Error Type
// =============================================================================

/// The root error type for the edge core crate.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dispatch output error.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Node identifier error.
    #[error("Node id error: {0}")]
    NodeId(#[from] NodeIdError),
}

impl EdgeError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            EdgeError::Bus(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// A specialized Result type for edge core operations.
pub type EdgeResult<T> = Result<T, EdgeError>;

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration content.
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// Format being parsed (toml, json).
        format: &'static str,
        /// Error message.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Unsupported file extension.
    #[error("Unsupported config format for '{path}'")]
    UnsupportedFormat {
        /// Path to the file.
        path: PathBuf,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// BusError
// =============================================================================

/// Dispatch output errors.
#[derive(Debug, Error)]
pub enum BusError {
    /// Channel is closed.
    #[error("Channel is closed")]
    Closed,

    /// Receiver lagged behind.
    #[error("Receiver lagged by {count} messages")]
    Lagged {
        /// Number of missed messages.
        count: u64,
    },
}

impl BusError {
    /// Creates a lagged error.
    pub fn lagged(count: u64) -> Self {
        Self::Lagged { count }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Lagged { .. })
    }
}

// =============================================================================
// NodeIdError
// =============================================================================

/// Node identifier parse errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid node id '{input}': {message}")]
pub struct NodeIdError {
    /// The offending input.
    pub input: String,
    /// What was wrong with it.
    pub message: String,
}

impl NodeIdError {
    /// Creates a node id error.
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
