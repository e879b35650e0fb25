/*!
 * Provider Manifests
 * JSON description of a provider and its probes, built in one call
 *
 * ```json
 * {"name": "myapp", "module": "core",
 *  "probes": [{"function": "doWork", "name": "start", "args": ["int", "char *"]}]}
 * ```
 */

use crate::core::{UsdtError, UsdtResult};
use crate::probes::provider::Provider;
use crate::probes::registry::UsdtRegistry;
use crate::probes::types::ArgValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// One probe signature in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeManifest {
    pub function: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A provider and the probes to attach to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub probes: Vec<ProbeManifest>,
}

impl ProviderManifest {
    pub fn from_json_str(raw: &str) -> UsdtResult<Self> {
        serde_json::from_str(raw).map_err(|e| UsdtError::Config {
            reason: format!("invalid provider manifest: {}", e),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> UsdtResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| UsdtError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&raw)
    }

    /// Create the provider and attach every probe, in manifest order
    ///
    /// The provider is returned unenabled. Any failure aborts the build and
    /// drops whatever was created so far.
    pub fn build(&self, registry: &UsdtRegistry) -> UsdtResult<Provider> {
        let mut provider = registry.create_provider(&self.name, &self.module)?;
        for probe in &self.probes {
            let definition = registry.create_probe(&probe.function, &probe.name, probe.args.as_slice())?;
            provider.add_probe(definition)?;
        }
        debug!(
            provider = %self.name,
            module = %self.module,
            probes = self.probes.len(),
            "manifest built"
        );
        Ok(provider)
    }
}

/// A single fire request as read by the CLI, one per JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireRequest {
    pub function: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl FireRequest {
    pub fn from_json_str(raw: &str) -> UsdtResult<Self> {
        serde_json::from_str(raw).map_err(|e| UsdtError::Config {
            reason: format!("invalid fire request: {}", e),
        })
    }

    /// Fire the addressed probe; false when the provider has no such probe
    pub fn fire(&self, provider: &Provider) -> bool {
        match provider.probe(&self.function, &self.name) {
            Some(probe) => {
                probe.fire_with(|| ArgValue::from_host_array(&self.args));
                true
            }
            None => false,
        }
    }
}
