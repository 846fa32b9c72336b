// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA error types.
//!
//! Transport, session and subscription failures are Rust errors inside this
//! crate only. At the dispatcher, service and subscription manager boundary
//! they are turned into a [`StatusCode`] with [`OpcUaError::status_code`]
//! and reported; callers never see them raw.
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Transport     - Failures raised by the transport collaborator
//! ├── Session       - Endpoint lookup failures
//! ├── Operation     - Read/write/call failures and bad status codes
//! ├── Subscription  - Subscription and monitored item failures
//! └── Configuration - Invalid requests or service registrations
//! ```
//!
//! # Examples
//!
//! ```
//! use edge_core::StatusCode;
//! use edge_opcua::error::{OpcUaError, SubscriptionError};
//!
//! let error = OpcUaError::subscription(SubscriptionError::no_active("ep"));
//! assert_eq!(error.status_code(), StatusCode::SubNoActiveSubscription);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;

use edge_core::StatusCode;
use thiserror::Error;
use tracing::Level;

use crate::types::UaStatus;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for OPC UA operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Transport failures.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Session lookup failures.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Read/write/call failures.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Subscription and monitoring failures.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration failures.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a session error.
    #[inline]
    pub fn session(error: SessionError) -> Self {
        Self::Session(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a service call failure.
    pub fn service_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport(TransportError::service_failed(service, message))
    }

    /// Creates a bad status error for a node.
    pub fn bad_status(node_id: impl Into<String>, status: UaStatus) -> Self {
        Self::Operation(OperationError::bad_status(node_id, status))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Subscription(e) => e.is_retryable(),
            Self::Transport(_) | Self::Session(_) | Self::Operation(_) | Self::Configuration(_) => {
                false
            }
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transport(_) => ErrorSeverity::Error,
            Self::Session(_) => ErrorSeverity::Error,
            Self::Operation(e) => e.severity(),
            Self::Subscription(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Session(_) => "session",
            Self::Operation(_) => "operation",
            Self::Subscription(_) => "subscription",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Transport(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Maps this error to the status reported to callers.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) | Self::Session(_) => StatusCode::InternalError,
            Self::Operation(e) => e.status_code(),
            Self::Subscription(e) => e.status_code(),
            Self::Configuration(_) => StatusCode::ParamInvalid,
        }
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

/// A specialized Result type for OPC UA operations.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// TransportError
// =============================================================================

/// Failures raised by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A service call failed before producing results.
    #[error("Service '{service}' failed: {message}")]
    ServiceFailed {
        /// Service name.
        service: String,
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Creates a service failure.
    pub fn service_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceFailed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ServiceFailed { .. } => ErrorCode::new(1, 1),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Endpoint session lookup failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session registered for the endpoint.
    #[error("No session for endpoint '{endpoint}'")]
    NotFound {
        /// Endpoint ID.
        endpoint: String,
    },
}

impl SessionError {
    /// Creates a not-found error.
    pub fn not_found(endpoint: impl Into<String>) -> Self {
        Self::NotFound {
            endpoint: endpoint.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::new(2, 1),
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read/write/call operation failures.
#[derive(Debug, Error)]
pub enum OperationError {
    /// A node returned a bad status.
    #[error("Bad status {status} for node '{node_id}'")]
    BadStatus {
        /// Node ID.
        node_id: String,
        /// Status returned.
        status: UaStatus,
    },

    /// A read returned no value.
    #[error("Node '{node_id}' returned no value")]
    EmptyValue {
        /// Node ID.
        node_id: String,
    },

    /// A method call returned a bad status.
    #[error("Method '{method_id}' on '{object_id}' failed with {status}")]
    MethodFailed {
        /// Object node.
        object_id: String,
        /// Method node.
        method_id: String,
        /// Status returned.
        status: UaStatus,
    },

    /// Operation not supported for the node.
    #[error("Operation '{operation}' not supported for '{target}'")]
    NotSupported {
        /// Operation name.
        operation: String,
        /// Target description.
        target: String,
    },
}

impl OperationError {
    /// Creates a bad status error.
    pub fn bad_status(node_id: impl Into<String>, status: UaStatus) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status,
        }
    }

    /// Creates an empty value error.
    pub fn empty_value(node_id: impl Into<String>) -> Self {
        Self::EmptyValue {
            node_id: node_id.into(),
        }
    }

    /// Creates a not-supported error.
    pub fn not_supported(operation: impl Into<String>, target: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
            target: target.into(),
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotSupported { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BadStatus { .. } => ErrorCode::new(3, 1),
            Self::EmptyValue { .. } => ErrorCode::new(3, 2),
            Self::MethodFailed { .. } => ErrorCode::new(3, 3),
            Self::NotSupported { .. } => ErrorCode::new(3, 4),
        }
    }

    /// Maps this error to a caller status.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotSupported { .. } => StatusCode::ParamInvalid,
            _ => StatusCode::Error,
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription and monitoring failures.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Subscription creation failed.
    #[error("Failed to create subscription: {message}")]
    CreationFailed {
        /// Error message.
        message: String,
    },

    /// No subscription exists for the endpoint.
    #[error("No active subscription for endpoint '{endpoint}'")]
    NoActive {
        /// Endpoint ID.
        endpoint: String,
    },

    /// Request carried no subscription parameters.
    #[error("Subscribe request carries no subscription parameters")]
    MissingParameters,

    /// Set publishing mode returned no results.
    #[error("Set publishing mode returned no results for subscription {subscription_id}")]
    EmptyPublishingResult {
        /// Subscription ID.
        subscription_id: u32,
    },
}

impl SubscriptionError {
    /// Creates a creation failure.
    pub fn creation_failed(message: impl Into<String>) -> Self {
        Self::CreationFailed {
            message: message.into(),
        }
    }

    /// Creates a no-active-subscription error.
    pub fn no_active(endpoint: impl Into<String>) -> Self {
        Self::NoActive {
            endpoint: endpoint.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CreationFailed { .. })
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CreationFailed { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreationFailed { .. } => ErrorCode::new(4, 1),
            Self::NoActive { .. } => ErrorCode::new(4, 2),
            Self::MissingParameters => ErrorCode::new(4, 3),
            Self::EmptyPublishingResult { .. } => ErrorCode::new(4, 4),
        }
    }

    /// Maps this error to a caller status.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::CreationFailed { .. } => StatusCode::Error,
            Self::NoActive { .. } => StatusCode::SubNoActiveSubscription,
            Self::MissingParameters => StatusCode::ParamInvalid,
            Self::EmptyPublishingResult { .. } => StatusCode::SubSetpublishEmptyResult,
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid requests or service registrations.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No service registered under the alias.
    #[error("No value access service registered for alias '{alias}'")]
    UnknownAlias {
        /// Requested alias.
        alias: String,
    },

    /// Request is missing a required part.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Runtime configuration failed validation.
    #[error("Invalid runtime configuration: {0}")]
    Runtime(#[from] edge_core::ConfigError),
}

impl ConfigurationError {
    /// Creates an unknown alias error.
    pub fn unknown_alias(alias: impl Into<String>) -> Self {
        Self::UnknownAlias {
            alias: alias.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownAlias { .. } => ErrorCode::new(5, 1),
            Self::InvalidRequest { .. } => ErrorCode::new(5, 2),
            Self::Runtime(_) => ErrorCode::new(5, 3),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Transport
/// - 2: Session
/// - 3: Operation
/// - 4: Subscription
/// - 5: Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-5).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================
