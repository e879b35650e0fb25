/*!
 * Probe Registry
 * Explicit process-wide context for providers and probe definitions
 *
 * Holds the configuration and the selected backend, tracks which
 * provider identities are alive, and refuses new work after shutdown.
 */

use super::backend::Backend;
use super::definition::ProbeDefinition;
use super::provider::Provider;
use super::simulation::SimulationBackend;
use crate::config::UsdtConfig;
use crate::core::types::Identifier;
use crate::core::{UsdtError, UsdtResult};
use crate::monitoring::{FireCounters, FireStats};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type IdentityKey = (Identifier, Identifier);
type LiveSet = Arc<DashMap<IdentityKey, (), RandomState>>;

/// Keeps a provider identity reserved until the provider drops
pub(crate) struct ProviderLease {
    live: LiveSet,
    key: IdentityKey,
}

impl Drop for ProviderLease {
    fn drop(&mut self) {
        self.live.remove(&self.key);
    }
}

/// Registry that owns configuration and the tracing backend
pub struct UsdtRegistry {
    config: UsdtConfig,
    backend: Backend,
    live: LiveSet,
    totals: Arc<FireCounters>,
    shut_down: AtomicBool,
}

impl UsdtRegistry {
    /// Build a registry from validated configuration
    pub fn new(config: UsdtConfig) -> UsdtResult<Self> {
        config.validate()?;
        let backend = Backend::from_config(&config)?;
        Ok(Self::assemble(config, backend))
    }

    /// Build a registry over an existing backend
    pub fn with_backend(config: UsdtConfig, backend: Backend) -> UsdtResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, backend))
    }

    /// Registry with a simulated tracer (for testing)
    pub fn simulation() -> Self {
        let config = UsdtConfig::simulation();
        let backend = Backend::from_simulation(SimulationBackend::with_history(config.event_history));
        Self::assemble(config, backend)
    }

    /// Registry configured from `USDT_*` environment variables
    pub fn from_env() -> UsdtResult<Self> {
        Self::new(UsdtConfig::from_env()?)
    }

    fn assemble(config: UsdtConfig, backend: Backend) -> Self {
        Self {
            config,
            backend,
            live: Arc::new(DashMap::with_hasher(RandomState::new())),
            totals: Arc::new(FireCounters::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> UsdtResult<()> {
        if self.is_shut_down() {
            return Err(UsdtError::RegistryShutdown);
        }
        Ok(())
    }

    /// Create a provider; the identity stays reserved while it is alive
    pub fn create_provider(&self, name: &str, module: &str) -> UsdtResult<Provider> {
        self.ensure_open()?;

        let key: IdentityKey = (name.into(), module.into());
        match self.live.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(UsdtError::ProviderExists {
                    provider: key.0,
                    module: key.1,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let lease = ProviderLease {
            live: Arc::clone(&self.live),
            key,
        };
        // A failed create drops the lease and frees the identity again.
        Provider::create(
            &self.backend,
            name,
            module,
            &self.config,
            Arc::clone(&self.totals),
            Some(lease),
        )
    }

    /// Define and register a probe signature
    pub fn create_probe<S: AsRef<str>>(
        &self,
        function: &str,
        name: &str,
        arg_types: &[S],
    ) -> UsdtResult<ProbeDefinition> {
        self.ensure_open()?;
        ProbeDefinition::new(&self.backend, function, name, arg_types)
    }

    pub fn config(&self) -> &UsdtConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The simulated tracer, when running in simulation mode
    pub fn simulation_backend(&self) -> Option<&SimulationBackend> {
        self.backend.simulation()
    }

    /// Providers created here that have not been dropped
    pub fn live_providers(&self) -> usize {
        self.live.len()
    }

    /// Fire counters across every provider this registry created
    pub fn stats(&self) -> FireStats {
        self.totals.snapshot()
    }

    /// Refuse further creation; returns false if already shut down
    ///
    /// Providers that are still alive keep working and dispose themselves
    /// when dropped.
    pub fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(live_providers = self.live.len(), stats = ?self.stats(), "usdt registry shut down");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl fmt::Debug for UsdtRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsdtRegistry")
            .field("config", &self.config)
            .field("live_providers", &self.live.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
