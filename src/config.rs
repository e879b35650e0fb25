/*!
 * Configuration
 * Backend selection, coercion policy and limits
 *
 * Environment variables:
 * - USDT_BACKEND: auto | native | simulation (default: auto)
 * - USDT_COERCION: strict | permissive (default: strict)
 * - USDT_MAX_PROBES: probes per provider (default: 1024)
 * - USDT_EVENT_HISTORY: simulated tracer history size (default: 10000)
 */

use crate::core::limits::{MAX_EVENT_HISTORY, MAX_PROBES_PER_PROVIDER};
use crate::core::{UsdtError, UsdtResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Which tracing subsystem receives probe definitions and fire events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Native when available, simulation otherwise
    #[default]
    Auto,
    /// libusdt, requires the `libusdt` feature
    Native,
    /// In-process simulated tracer
    Simulation,
}

impl FromStr for BackendKind {
    type Err = UsdtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "native" | "libusdt" => Ok(BackendKind::Native),
            "simulation" | "sim" => Ok(BackendKind::Simulation),
            other => Err(UsdtError::Config {
                reason: format!("unknown backend {:?}", other),
            }),
        }
    }
}

/// How fire-time values are matched against declared argument types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Validate every value against its declared tag; mismatches drop the fire
    #[default]
    Strict,
    /// Dispatch on the runtime type of the value, ignoring declared tags.
    /// Int32-representable numbers become integers, everything else a string.
    Permissive,
}

impl FromStr for CoercionPolicy {
    type Err = UsdtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CoercionPolicy::Strict),
            "permissive" | "dynamic" => Ok(CoercionPolicy::Permissive),
            other => Err(UsdtError::Config {
                reason: format!("unknown coercion policy {:?}", other),
            }),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsdtConfig {
    pub backend: BackendKind,
    pub coercion: CoercionPolicy,
    pub max_probes_per_provider: usize,
    pub event_history: usize,
}

impl Default for UsdtConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            coercion: CoercionPolicy::Strict,
            max_probes_per_provider: MAX_PROBES_PER_PROVIDER,
            event_history: MAX_EVENT_HISTORY,
        }
    }
}

impl UsdtConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_max_probes(mut self, max: usize) -> Self {
        self.max_probes_per_provider = max;
        self
    }

    pub fn with_event_history(mut self, events: usize) -> Self {
        self.event_history = events;
        self
    }

    /// Simulation backend with strict coercion, for tests
    pub fn simulation() -> Self {
        Self::default().with_backend(BackendKind::Simulation)
    }

    /// Build from defaults overridden by `USDT_*` environment variables
    pub fn from_env() -> UsdtResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("USDT_BACKEND") {
            config.backend = value.parse()?;
        }
        if let Ok(value) = std::env::var("USDT_COERCION") {
            config.coercion = value.parse()?;
        }
        if let Ok(value) = std::env::var("USDT_MAX_PROBES") {
            config.max_probes_per_provider = parse_usize("USDT_MAX_PROBES", &value)?;
        }
        if let Ok(value) = std::env::var("USDT_EVENT_HISTORY") {
            config.event_history = parse_usize("USDT_EVENT_HISTORY", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> UsdtResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| UsdtError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| UsdtError::Config {
            reason: format!("cannot parse {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside the subsystem's limits
    pub fn validate(&self) -> UsdtResult<()> {
        if self.max_probes_per_provider == 0
            || self.max_probes_per_provider > MAX_PROBES_PER_PROVIDER
        {
            return Err(UsdtError::Config {
                reason: format!(
                    "max_probes_per_provider must be in 1..={}, got {}",
                    MAX_PROBES_PER_PROVIDER, self.max_probes_per_provider
                ),
            });
        }
        if self.event_history == 0 {
            return Err(UsdtError::Config {
                reason: "event_history must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> UsdtResult<usize> {
    value.trim().parse().map_err(|_| UsdtError::Config {
        reason: format!("{} must be a positive integer, got {:?}", key, value),
    })
}
