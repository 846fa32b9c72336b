// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime configuration.
//!
//! Configuration is read from TOML or JSON, then environment overrides are
//! applied, then the result is validated.
//!
//! ```toml
//! [output]
//! capacity = 4096
//!
//! [subscription]
//! publishing_interval = "1s"
//! sampling_interval = "500ms"
//! queue_size = 1
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Override
//!
//! ```text
//! EDGE_LOG_LEVEL=debug
//! EDGE_LOG_FORMAT=compact
//! EDGE_OUTPUT_CAPACITY=8192
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "EDGE";

// =============================================================================
// EdgeConfig
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Dispatch output settings.
    pub output: OutputConfig,
    /// Defaults for subscription requests.
    pub subscription: SubscriptionDefaults,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl EdgeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::parse("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.toml` or `.json` file, applies environment overrides and
    /// validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mut config: Self = match extension.as_deref() {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ConfigError::parse("toml", e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse("json", e.to_string()))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `EDGE_*` overrides from the given variables.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}_", ENV_PREFIX);
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            match name {
                "LOG_LEVEL" => self.logging.level = value,
                "LOG_FORMAT" => self.logging.format = value.parse()?,
                "OUTPUT_CAPACITY" => {
                    self.output.capacity = value.parse().map_err(|_| {
                        ConfigError::validation("output.capacity", format!("not a number: {}", value))
                    })?;
                }
                _ => continue,
            }
            debug!(variable = %key, "Applied environment override");
        }
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.capacity == 0 {
            return Err(ConfigError::validation(
                "output.capacity",
                "must be greater than 0",
            ));
        }
        self.subscription.validate()?;
        Ok(())
    }
}

// =============================================================================
// OutputConfig
// =============================================================================

/// Dispatch output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Messages buffered per subscriber before slow subscribers lag.
    pub capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

// =============================================================================
// SubscriptionDefaults
// =============================================================================

/// Defaults applied to subscription requests built without explicit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionDefaults {
    /// Publishing interval.
    #[serde(with = "humantime_serde")]
    pub publishing_interval: Duration,
    /// Sampling interval of monitored items.
    #[serde(with = "humantime_serde")]
    pub sampling_interval: Duration,
    /// Lifetime count.
    pub lifetime_count: u32,
    /// Max keep-alive count.
    pub max_keep_alive_count: u32,
    /// Max notifications per publish (0 = unlimited).
    pub max_notifications_per_publish: u32,
    /// Monitored item queue size.
    pub queue_size: u32,
    /// Subscription priority.
    pub priority: u8,
}

impl Default for SubscriptionDefaults {
    fn default() -> Self {
        Self {
            publishing_interval: Duration::from_millis(1000),
            sampling_interval: Duration::from_millis(1000),
            lifetime_count: 60,
            max_keep_alive_count: 10,
            max_notifications_per_publish: 0,
            queue_size: 1,
            priority: 0,
        }
    }
}

impl SubscriptionDefaults {
    /// Validates the defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publishing_interval.is_zero() {
            return Err(ConfigError::validation(
                "subscription.publishing_interval",
                "must be greater than 0",
            ));
        }
        if self.queue_size == 0 {
            return Err(ConfigError::validation(
                "subscription.queue_size",
                "must be greater than 0",
            ));
        }
        if self.lifetime_count < self.max_keep_alive_count.saturating_mul(3) {
            return Err(ConfigError::validation(
                "subscription.lifetime_count",
                "must be at least three times max_keep_alive_count",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// LoggingConfig
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or an EnvFilter string).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// Minimal single-line output.
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Compact => "compact",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::validation(
                "logging.format",
                format!("unknown format '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
