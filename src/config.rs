//! Detector configuration.
//!
//! A [`DetectConfig`] is handed to a [`Detector`](crate::Detector) at
//! construction time. It carries the concurrency used when a call does not ask
//! for one, and the policy for outcomes that resolve after stop was flagged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the default concurrency.
pub const MAX_ENV: &str = "DETECT_ASYNC_MAX";
/// Environment variable holding the [`CapturePolicy`].
pub const CAPTURE_ENV: &str = "DETECT_ASYNC_CAPTURE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid concurrency {value:?}: expected a non-negative integer")]
    InvalidConcurrency { value: String },
    #[error("unknown capture policy {value:?}: expected `last-writer-wins` or `first-wins`")]
    UnknownCapturePolicy { value: String },
}

/// How evaluations that were still in flight when stop was flagged affect the
/// captured outcome.
///
/// A captured error always wins over a captured match at settlement; the
/// policy only decides which match and which error are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapturePolicy {
    /// Every later truthy result or failure overwrites the previous one.
    #[default]
    LastWriterWins,
    /// The first captured match and the first captured error are kept.
    FirstWins,
}

impl CapturePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastWriterWins => "last-writer-wins",
            Self::FirstWins => "first-wins",
        }
    }
}

impl fmt::Display for CapturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapturePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-writer-wins" | "last" => Ok(Self::LastWriterWins),
            "first-wins" | "first" => Ok(Self::FirstWins),
            _ => Err(ConfigError::UnknownCapturePolicy {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Concurrency used when a call passes `None` or `Some(0)`.
    /// Zero here falls back to 1.
    pub default_concurrency: usize,
    pub capture: CapturePolicy,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 1,
            capture: CapturePolicy::default(),
        }
    }
}

impl DetectConfig {
    #[must_use]
    pub fn with_default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_capture(mut self, capture: CapturePolicy) -> Self {
        self.capture = capture;
        self
    }

    /// The configured default, or 1 when it is zero.
    #[must_use]
    pub fn effective_default(&self) -> usize {
        self.default_concurrency.max(1)
    }

    /// Resolve the cap for one call. Only a positive request is used as given;
    /// `None` and `Some(0)` take the effective default. Never returns 0.
    #[must_use]
    pub fn resolve_concurrency(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|&n| n > 0)
            .unwrap_or_else(|| self.effective_default())
    }

    /// Read [`MAX_ENV`] and [`CAPTURE_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_ENV) {
            config.default_concurrency = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidConcurrency { value: raw.clone() })?;
        }
        if let Some(raw) = lookup(CAPTURE_ENV) {
            config.capture = raw.parse()?;
        }

        Ok(config)
    }
}
