/*!
 * Event Collection and Distribution
 * The simulated tracer's side: probe selection, subscriptions, event history
 */

use super::types::FiredEvent;
use crate::core::types::Identifier;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked for every matching event
pub type EventCallback = Box<dyn Fn(&FiredEvent) + Send + Sync>;

/// DTrace-style probe description `provider:module:function:name`
///
/// Partial descriptions are right-aligned, so `"start"` names a probe and
/// `"doWork:start"` a function and probe. Empty fields and `*` match
/// anything; a trailing `*` matches by prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeSelector {
    pub provider: Identifier,
    pub module: Identifier,
    pub function: Identifier,
    pub name: Identifier,
}

impl ProbeSelector {
    /// Matches every probe
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, provider: &str, module: &str, function: &str, name: &str) -> bool {
        field_matches(&self.provider, provider)
            && field_matches(&self.module, module)
            && field_matches(&self.function, function)
            && field_matches(&self.name, name)
    }

    pub fn matches_event(&self, event: &FiredEvent) -> bool {
        self.matches(&event.provider, &event.module, &event.function, &event.name)
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    match pattern {
        "" | "*" => true,
        p => match p.strip_suffix('*') {
            Some(prefix) => value.starts_with(prefix),
            None => p == value,
        },
    }
}

impl From<&str> for ProbeSelector {
    fn from(s: &str) -> Self {
        let mut fields: Vec<&str> = s.split(':').collect();
        fields.truncate(4);
        while fields.len() < 4 {
            fields.insert(0, "");
        }
        Self {
            provider: fields[0].into(),
            module: fields[1].into(),
            function: fields[2].into(),
            name: fields[3].into(),
        }
    }
}

impl fmt::Display for ProbeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.provider, self.module, self.function, self.name
        )
    }
}

struct Subscription {
    selector: ProbeSelector,
    callback: Option<EventCallback>,
}

/// Event collector and distributor
#[derive(Clone)]
pub struct EventCollector {
    history: Arc<RwLock<VecDeque<FiredEvent>>>,
    capacity: usize,
    subscriptions: Arc<DashMap<String, Subscription, RandomState>>,
    total_events: Arc<AtomicU64>,
}

impl EventCollector {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
            subscriptions: Arc::new(DashMap::with_hasher(RandomState::new())),
            total_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an event and notify matching subscribers
    pub fn emit(&self, event: FiredEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        for entry in self.subscriptions.iter() {
            let subscription = entry.value();
            if let Some(callback) = &subscription.callback {
                if subscription.selector.matches_event(&event) {
                    callback(&event);
                }
            }
        }

        let mut history = self.history.write();
        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Register interest in probes matching `selector`
    pub fn subscribe(&self, selector: ProbeSelector, callback: Option<EventCallback>) -> String {
        let id = Uuid::new_v4().to_string();
        self.subscriptions
            .insert(id.clone(), Subscription { selector, callback });
        id
    }

    /// Returns false if no such subscription exists
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.subscriptions.remove(subscription_id).is_some()
    }

    /// Whether any subscription selects the given probe
    pub fn is_selected(&self, provider: &str, module: &str, function: &str, name: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|entry| entry.value().selector.matches(provider, module, function, name))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<FiredEvent> {
        let history = self.history.read();
        let start = history.len().saturating_sub(limit);
        history.iter().skip(start).cloned().collect()
    }

    pub fn last(&self) -> Option<FiredEvent> {
        self.history.read().back().cloned()
    }

    /// Events selected by `selector`, oldest first
    pub fn matching(&self, selector: &ProbeSelector) -> Vec<FiredEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| selector.matches_event(e))
            .cloned()
            .collect()
    }

    pub fn total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    /// Clear event history
    pub fn clear(&self) {
        self.history.write().clear();
    }

    /// Drop history and every subscription
    pub fn reset(&self) {
        self.clear();
        self.subscriptions.clear();
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new(crate::core::limits::MAX_EVENT_HISTORY)
    }
}
