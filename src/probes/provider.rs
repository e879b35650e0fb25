/*!
 * Provider
 * Registry entry, probe attachment and activation
 *
 * A provider moves Unregistered -> Attaching -> Enabled and never back.
 * It exclusively owns its attached probes and disposes the native provider
 * exactly once, on drop.
 */

use super::attached::AttachedProbe;
use super::backend::Backend;
use super::definition::ProbeDefinition;
use super::registry::ProviderLease;
use super::traits::{ProviderHandle, TracingBackend};
use super::types::{ProviderInfo, ProviderState};
use crate::config::{CoercionPolicy, UsdtConfig};
use crate::core::types::{validate_identifier, Identifier};
use crate::core::{IdentifierKind, UsdtError, UsdtResult};
use crate::monitoring::{FireCounters, FireStats};
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A named group of probes, the unit of tracer visibility
pub struct Provider {
    name: Identifier,
    module: Identifier,
    state: ProviderState,
    handle: ProviderHandle,
    backend: Backend,
    probes: Vec<AttachedProbe>,
    index: HashMap<(Identifier, Identifier), usize, RandomState>,
    policy: CoercionPolicy,
    max_probes: usize,
    totals: Arc<FireCounters>,
    _lease: Option<ProviderLease>,
}

impl Provider {
    /// Create a provider with default limits and strict coercion
    pub fn new(backend: &Backend, name: &str, module: &str) -> UsdtResult<Self> {
        Self::with_config(backend, name, module, &UsdtConfig::default())
    }

    /// Create a provider using the coercion policy and limits in `config`
    pub fn with_config(
        backend: &Backend,
        name: &str,
        module: &str,
        config: &UsdtConfig,
    ) -> UsdtResult<Self> {
        Self::create(backend, name, module, config, Arc::new(FireCounters::new()), None)
    }

    pub(crate) fn create(
        backend: &Backend,
        name: &str,
        module: &str,
        config: &UsdtConfig,
        totals: Arc<FireCounters>,
        lease: Option<ProviderLease>,
    ) -> UsdtResult<Self> {
        let name = validate_identifier(IdentifierKind::Provider, name)?;
        let module = validate_identifier(IdentifierKind::Module, module)?;
        let handle = backend.create_provider(&name, &module)?;

        debug!(provider = %name, module = %module, "provider created");

        Ok(Self {
            name,
            module,
            state: ProviderState::Unregistered,
            handle,
            backend: backend.clone(),
            probes: Vec::new(),
            index: HashMap::with_hasher(RandomState::new()),
            policy: config.coercion,
            max_probes: config.max_probes_per_provider,
            totals,
            _lease: lease,
        })
    }

    /// Link `definition` into this provider
    ///
    /// The probe is enumerable right away but stays invisible to tracers
    /// until [`enable`](Provider::enable).
    pub fn add_probe(&mut self, definition: ProbeDefinition) -> UsdtResult<&AttachedProbe> {
        if self.state == ProviderState::Enabled {
            return Err(UsdtError::AlreadyEnabled {
                provider: self.name.clone(),
            });
        }

        let key = (
            Identifier::from(definition.function()),
            Identifier::from(definition.name()),
        );
        // Definition handles only mean something to the backend that issued them
        if !self.backend.same_subsystem(definition.backend()) {
            return Err(UsdtError::ForeignDefinition {
                function: key.0,
                name: key.1,
            });
        }
        if self.index.contains_key(&key) {
            return Err(UsdtError::AlreadyAttached {
                function: key.0,
                name: key.1,
            });
        }
        if self.probes.len() >= self.max_probes {
            return Err(UsdtError::AttachmentLimitExceeded {
                provider: self.name.clone(),
                max: self.max_probes,
            });
        }

        let (function, name, arg_types, def_handle) = definition.into_parts();
        let handle = match self.backend.provider_add_probe(self.handle, def_handle) {
            Ok(handle) => handle,
            Err(e) => {
                self.backend.release_probe(def_handle);
                warn!(provider = %self.name, function = %function, probe = %name, error = %e, "attach failed");
                return Err(e);
            }
        };

        debug!(
            provider = %self.name,
            function = %function,
            probe = %name,
            argc = arg_types.len(),
            "probe attached"
        );

        let position = self.probes.len();
        self.probes.push(AttachedProbe::new(
            function,
            name,
            arg_types,
            handle,
            self.backend.clone(),
            self.policy,
            Arc::clone(&self.totals),
        ));
        self.index.insert(key, position);
        self.state = ProviderState::Attaching;

        Ok(&self.probes[position])
    }

    /// Make every attached probe visible to external tracers
    ///
    /// Enabling a provider with no probes is a no-op. Enabling twice fails.
    pub fn enable(&mut self) -> UsdtResult<()> {
        match self.state {
            ProviderState::Enabled => {
                return Err(UsdtError::AlreadyEnabled {
                    provider: self.name.clone(),
                })
            }
            ProviderState::Unregistered => {
                debug!(provider = %self.name, "enable skipped, no probes attached");
                return Ok(());
            }
            ProviderState::Attaching => {}
        }

        self.backend.provider_enable(self.handle)?;
        self.state = ProviderState::Enabled;

        info!(
            provider = %self.name,
            module = %self.module,
            probes = self.probes.len(),
            "provider enabled"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ProviderState::Enabled
    }

    pub fn coercion(&self) -> CoercionPolicy {
        self.policy
    }

    /// Attached probes in attachment order
    pub fn probes(&self) -> &[AttachedProbe] {
        &self.probes
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Look up an attached probe by identity
    pub fn probe(&self, function: &str, name: &str) -> Option<&AttachedProbe> {
        let key = (Identifier::from(function), Identifier::from(name));
        self.index.get(&key).map(|&i| &self.probes[i])
    }

    /// Fire counters summed over every attached probe
    pub fn stats(&self) -> FireStats {
        self.probes.iter().map(AttachedProbe::stats).sum()
    }

    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.clone(),
            module: self.module.clone(),
            state: self.state,
            probes: self.probes.iter().map(AttachedProbe::info).collect(),
        }
    }

    /// Raw subsystem handle, for backend-level inspection
    pub fn handle(&self) -> ProviderHandle {
        self.handle
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        // Probes point into the native provider; drop them first.
        let probes = self.probes.len();
        self.probes.clear();
        self.backend.dispose_provider(self.handle);
        info!(provider = %self.name, module = %self.module, probes, "provider disposed");
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("state", &self.state)
            .field("probes", &self.probes)
            .finish()
    }
}
