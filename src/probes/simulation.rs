/*!
 * Simulation Backend
 * In-process tracing subsystem for tests and hosts without libusdt
 *
 * Behaves like libusdt plus a consumer: probes only report enabled once
 * their provider is enabled and an attached tracer selects them, and
 * fired events are decoded and recorded by an [`EventCollector`].
 */

use super::coerce::ArgumentFrame;
use super::events::{EventCallback, EventCollector, ProbeSelector};
use super::traits::*;
use super::types::{ArgType, FiredEvent};
use crate::config::BackendKind;
use crate::core::types::{timestamp_ns, Identifier};
use crate::core::{NativeOp, UsdtError, UsdtResult};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

struct SimProvider {
    name: Identifier,
    module: Identifier,
    enabled: bool,
    probes: Vec<usize>,
}

struct SimProbeDef {
    function: Identifier,
    name: Identifier,
    arg_types: Vec<ArgType>,
}

struct SimProbe {
    provider: usize,
    provider_name: Identifier,
    module: Identifier,
    function: Identifier,
    name: Identifier,
    arg_types: Vec<ArgType>,
    enabled: AtomicBool,
}

struct SimInner {
    next_handle: AtomicUsize,
    providers: DashMap<usize, SimProvider, RandomState>,
    definitions: DashMap<usize, SimProbeDef, RandomState>,
    probes: DashMap<usize, SimProbe, RandomState>,
    events: EventCollector,
    injected: Mutex<HashMap<NativeOp, i32>>,
}

/// Simulation-based tracing backend
#[derive(Clone)]
pub struct SimulationBackend {
    inner: Arc<SimInner>,
}

impl SimulationBackend {
    pub fn new() -> Self {
        Self::with_history(crate::core::limits::MAX_EVENT_HISTORY)
    }

    /// Keep at most `events` fired events
    pub fn with_history(events: usize) -> Self {
        Self {
            inner: Arc::new(SimInner {
                next_handle: AtomicUsize::new(1),
                providers: DashMap::with_hasher(RandomState::new()),
                definitions: DashMap::with_hasher(RandomState::new()),
                probes: DashMap::with_hasher(RandomState::new()),
                events: EventCollector::new(events),
                injected: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// True when both handles drive the same simulated subsystem
    pub fn same_instance(&self, other: &SimulationBackend) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn allocate(&self) -> usize {
        self.inner.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn check_injected(&self, operation: NativeOp) -> UsdtResult<()> {
        match self.inner.injected.lock().remove(&operation) {
            Some(status) => Err(UsdtError::NativeSubsystemFailure {
                operation,
                status,
                detail: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn failure(operation: NativeOp, detail: &str) -> UsdtError {
        UsdtError::NativeSubsystemFailure {
            operation,
            status: -1,
            detail: detail.to_string(),
        }
    }

    /// Recompute every probe's enabled flag from provider state and tracers
    ///
    /// Holds at most one map's guard at a time, like `provider_add_probe`.
    fn refresh(&self) {
        let enabled: HashSet<usize, RandomState> = self
            .inner
            .providers
            .iter()
            .filter(|entry| entry.value().enabled)
            .map(|entry| *entry.key())
            .collect();

        for entry in self.inner.probes.iter() {
            let probe = entry.value();
            let selected = enabled.contains(&probe.provider)
                && self.inner.events.is_selected(
                    &probe.provider_name,
                    &probe.module,
                    &probe.function,
                    &probe.name,
                );
            probe.enabled.store(selected, Ordering::Release);
        }
    }

    /// Make the next call to `operation` fail with `status`
    pub fn inject_failure(&self, operation: NativeOp, status: i32) {
        self.inner.injected.lock().insert(operation, status);
    }

    /// Start a tracer session on every probe matching `selector`
    pub fn attach_tracer(&self, selector: impl Into<ProbeSelector>) -> String {
        self.attach(selector.into(), None)
    }

    /// Start a tracer session that also receives each matching event
    pub fn attach_tracer_with(
        &self,
        selector: impl Into<ProbeSelector>,
        callback: EventCallback,
    ) -> String {
        self.attach(selector.into(), Some(callback))
    }

    fn attach(&self, selector: ProbeSelector, callback: Option<EventCallback>) -> String {
        debug!(selector = %selector, "simulated tracer attached");
        let id = self.inner.events.subscribe(selector, callback);
        self.refresh();
        id
    }

    /// Stop a tracer session; false if it did not exist
    pub fn detach_tracer(&self, session: &str) -> bool {
        let removed = self.inner.events.unsubscribe(session);
        if removed {
            self.refresh();
        }
        removed
    }

    /// Events observed by attached tracers
    pub fn events(&self) -> &EventCollector {
        &self.inner.events
    }

    pub fn last_event(&self) -> Option<FiredEvent> {
        self.inner.events.last()
    }

    pub fn recent_events(&self, limit: usize) -> Vec<FiredEvent> {
        self.inner.events.recent(limit)
    }

    pub fn provider_count(&self) -> usize {
        self.inner.providers.len()
    }

    /// Definitions registered but not attached
    pub fn pending_definitions(&self) -> usize {
        self.inner.definitions.len()
    }

    pub fn attached_probe_count(&self) -> usize {
        self.inner.probes.len()
    }

    pub fn is_provider_enabled(&self, provider: ProviderHandle) -> bool {
        self.inner
            .providers
            .get(&provider.as_raw())
            .map(|p| p.enabled)
            .unwrap_or(false)
    }

    /// Declared tags of an attached probe, as the subsystem stored them
    pub fn probe_signature(&self, probe: ProbeHandle) -> Option<Vec<ArgType>> {
        self.inner
            .probes
            .get(&probe.as_raw())
            .map(|p| p.arg_types.clone())
    }
}

impl Default for SimulationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingBackend for SimulationBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulation
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn create_provider(&self, name: &str, module: &str) -> UsdtResult<ProviderHandle> {
        self.check_injected(NativeOp::CreateProvider)?;

        let id = self.allocate();
        self.inner.providers.insert(
            id,
            SimProvider {
                name: name.into(),
                module: module.into(),
                enabled: false,
                probes: Vec::new(),
            },
        );
        ProviderHandle::from_raw(id)
            .ok_or_else(|| Self::failure(NativeOp::CreateProvider, "null provider handle"))
    }

    fn create_probe(
        &self,
        function: &str,
        name: &str,
        arg_types: &[ArgType],
    ) -> UsdtResult<ProbeDefHandle> {
        self.check_injected(NativeOp::CreateProbe)?;

        let id = self.allocate();
        self.inner.definitions.insert(
            id,
            SimProbeDef {
                function: function.into(),
                name: name.into(),
                arg_types: arg_types.to_vec(),
            },
        );
        ProbeDefHandle::from_raw(id)
            .ok_or_else(|| Self::failure(NativeOp::CreateProbe, "null probe handle"))
    }

    fn provider_add_probe(
        &self,
        provider: ProviderHandle,
        probe: ProbeDefHandle,
    ) -> UsdtResult<ProbeHandle> {
        self.check_injected(NativeOp::AddProbe)?;

        // Snapshot the provider and release its shard before touching probes
        let (provider_name, module, attached) = {
            let entry = self
                .inner
                .providers
                .get(&provider.as_raw())
                .ok_or_else(|| Self::failure(NativeOp::AddProbe, "unknown provider"))?;
            (entry.name.clone(), entry.module.clone(), entry.probes.clone())
        };

        let duplicate = {
            let def = self
                .inner
                .definitions
                .get(&probe.as_raw())
                .ok_or_else(|| Self::failure(NativeOp::AddProbe, "unknown probe definition"))?;
            attached.iter().any(|id| {
                self.inner
                    .probes
                    .get(id)
                    .map(|p| p.function == def.function && p.name == def.name)
                    .unwrap_or(false)
            })
        };
        if duplicate {
            return Err(Self::failure(NativeOp::AddProbe, "probe already exists"));
        }

        let (_, def) = self
            .inner
            .definitions
            .remove(&probe.as_raw())
            .ok_or_else(|| Self::failure(NativeOp::AddProbe, "unknown probe definition"))?;

        let id = self.allocate();
        self.inner.probes.insert(
            id,
            SimProbe {
                provider: provider.as_raw(),
                provider_name,
                module,
                function: def.function,
                name: def.name,
                arg_types: def.arg_types,
                enabled: AtomicBool::new(false),
            },
        );

        match self.inner.providers.get_mut(&provider.as_raw()) {
            Some(mut entry) => entry.probes.push(id),
            None => {
                // Provider disposed while attaching
                self.inner.probes.remove(&id);
                return Err(Self::failure(NativeOp::AddProbe, "unknown provider"));
            }
        }

        ProbeHandle::from_raw(id).ok_or_else(|| Self::failure(NativeOp::AddProbe, "null probe"))
    }

    fn provider_enable(&self, provider: ProviderHandle) -> UsdtResult<()> {
        self.check_injected(NativeOp::Enable)?;

        {
            let mut entry = self
                .inner
                .providers
                .get_mut(&provider.as_raw())
                .ok_or_else(|| Self::failure(NativeOp::Enable, "unknown provider"))?;
            if entry.probes.is_empty() {
                return Err(Self::failure(NativeOp::Enable, "provider has no probes"));
            }
            entry.enabled = true;
        }

        self.refresh();
        Ok(())
    }

    #[inline]
    fn probe_is_enabled(&self, probe: ProbeHandle) -> bool {
        self.inner
            .probes
            .get(&probe.as_raw())
            .map(|p| p.enabled.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    fn fire_probe(&self, probe: ProbeHandle, args: &ArgumentFrame) {
        let event = match self.inner.probes.get(&probe.as_raw()) {
            Some(p) if p.enabled.load(Ordering::Acquire) => FiredEvent {
                provider: p.provider_name.clone(),
                module: p.module.clone(),
                function: p.function.clone(),
                name: p.name.clone(),
                args: args.decode(),
                timestamp_ns: timestamp_ns(),
            },
            _ => return,
        };
        self.inner.events.emit(event);
    }

    fn release_probe(&self, probe: ProbeDefHandle) {
        self.inner.definitions.remove(&probe.as_raw());
    }

    fn dispose_provider(&self, provider: ProviderHandle) {
        if let Some((_, entry)) = self.inner.providers.remove(&provider.as_raw()) {
            for id in entry.probes {
                self.inner.probes.remove(&id);
            }
            debug!(provider = %entry.name, module = %entry.module, "simulated provider disposed");
        }
    }
}
