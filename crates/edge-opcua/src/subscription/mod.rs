// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription management.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SubscriptionManager                         │
//! │          Create / Modify / Delete / Republish per endpoint      │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                      │                       │
//!          ▼                      ▼                       ▼
//! ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────┐
//! │  Subscription   │  │  DataChangeForwarder │  │   validation    │
//! │  Registry       │  │  LifecycleForwarder  │  │  (pure checks)  │
//! │  endpoint→handle│  │  transport callbacks │  │                 │
//! └─────────────────┘  └─────────────────────┘  └─────────────────┘
//!                                 │
//!                                 ▼
//!                    GeneralResponse / Report / Error
//! ```
//!
//! One endpoint owns at most one subscription with its monitored item.

mod handle;
mod listener;
mod manager;
mod registry;
pub mod validation;

pub use handle::SubscriptionHandle;
pub use manager::{SubscriptionManager, SubscriptionManagerStats};
pub use registry::SubscriptionRegistry;
pub use validation::ItemIssue;
