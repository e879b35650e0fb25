/*!
 * Attached Probes
 * Enablement guard and the fire path
 */

use super::backend::Backend;
use super::coerce::{marshal, ArgumentFrame};
use super::traits::{ProbeHandle, TracingBackend};
use super::types::{ArgType, ArgValue, ProbeInfo};
use crate::config::CoercionPolicy;
use crate::core::types::Identifier;
use crate::monitoring::{FireCounters, FireStats};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A probe linked into a provider
///
/// Owned by its [`Provider`](super::provider::Provider); callers only ever
/// borrow it, so it cannot outlive the native provider it points into.
pub struct AttachedProbe {
    function: Identifier,
    name: Identifier,
    arg_types: Vec<ArgType>,
    handle: ProbeHandle,
    backend: Backend,
    policy: CoercionPolicy,
    counters: FireCounters,
    totals: Arc<FireCounters>,
}

#[derive(Clone, Copy)]
enum Outcome {
    Fired,
    Skipped,
    Dropped,
}

impl AttachedProbe {
    pub(crate) fn new(
        function: Identifier,
        name: Identifier,
        arg_types: Vec<ArgType>,
        handle: ProbeHandle,
        backend: Backend,
        policy: CoercionPolicy,
        totals: Arc<FireCounters>,
    ) -> Self {
        Self {
            function,
            name,
            arg_types,
            handle,
            backend,
            policy,
            counters: FireCounters::new(),
            totals,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_types(&self) -> &[ArgType] {
        &self.arg_types
    }

    pub fn argc(&self) -> usize {
        self.arg_types.len()
    }

    /// True when a tracer is listening; cheap enough to guard every fire
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.backend.probe_is_enabled(self.handle)
    }

    /// Emit one event with `args`
    ///
    /// Never fails: fires nobody listens to are skipped, and arguments that
    /// cannot be marshaled drop the event. Both are counted in [`stats`].
    ///
    /// [`stats`]: AttachedProbe::stats
    pub fn fire(&self, args: &[ArgValue]) {
        if !self.is_enabled() {
            self.record(Outcome::Skipped);
            return;
        }
        self.emit(args);
    }

    /// Like [`fire`](AttachedProbe::fire), but only builds the arguments
    /// when a tracer is listening
    pub fn fire_with<F>(&self, args: F)
    where
        F: FnOnce() -> Vec<ArgValue>,
    {
        if !self.is_enabled() {
            self.record(Outcome::Skipped);
            return;
        }
        self.emit(&args());
    }

    fn emit(&self, args: &[ArgValue]) {
        if args.is_empty() && self.arg_types.is_empty() {
            self.backend.fire_probe(self.handle, &ArgumentFrame::new());
            self.record(Outcome::Fired);
            return;
        }

        match marshal(self.policy, &self.arg_types, args) {
            Ok(frame) => {
                self.backend.fire_probe(self.handle, &frame);
                self.record(Outcome::Fired);
            }
            Err(error) => {
                self.record(Outcome::Dropped);
                debug!(
                    function = %self.function,
                    probe = %self.name,
                    %error,
                    "fire dropped"
                );
            }
        }
    }

    #[inline]
    fn record(&self, outcome: Outcome) {
        for counters in [&self.counters, &*self.totals] {
            match outcome {
                Outcome::Fired => counters.record_fired(),
                Outcome::Skipped => counters.record_skipped(),
                Outcome::Dropped => counters.record_dropped(),
            }
        }
    }

    pub fn stats(&self) -> FireStats {
        self.counters.snapshot()
    }

    pub fn info(&self) -> ProbeInfo {
        ProbeInfo {
            function: self.function.clone(),
            name: self.name.clone(),
            arg_types: self.arg_types.iter().map(|t| t.tag().into()).collect(),
            enabled: self.is_enabled(),
            stats: self.stats(),
        }
    }

    /// Raw subsystem handle, for backend-level inspection
    pub fn handle(&self) -> ProbeHandle {
        self.handle
    }
}

impl fmt::Debug for AttachedProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedProbe")
            .field("function", &self.function)
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("stats", &self.stats())
            .finish()
    }
}
