// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client-side contract consumed by this crate.
//!
//! - **Transport Layer**: the service calls and listener hooks of one connected session
//! - **Session Lookup**: endpoint to transport resolution
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌─────────────────────┐
//! │ CommandDispatcher │   │ SubscriptionManager │
//! └─────────┬─────────┘   └──────────┬──────────┘
//!           │                        │
//!           ▼                        ▼
//! ┌─────────────────────────────────────────────┐
//! │           SessionLookup (endpoint)          │
//! └─────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │        OpcUaTransport (external stack)      │
//! └─────────────────────────────────────────────┘
//! ```

mod session;
mod transport;

pub use session::{SessionLookup, SessionRegistry, SessionStats};
pub use transport::{NotificationListener, OpcUaTransport, SubscriptionListener};
