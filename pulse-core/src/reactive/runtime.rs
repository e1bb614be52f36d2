//! Reactive Runtime
//!
//! The runtime is the per-thread home of everything that is not a node:
//! the registry of live effects, the configuration, and inspection of the
//! graph as a whole.
//!
//! # How It Works
//!
//! 1. When an effect is created, it registers with the runtime. The registry
//!    owns the effect, so it keeps running after its handle is dropped.
//!
//! 2. When an effect is destroyed, it unregisters itself.
//!
//! 3. [`Runtime::destroy_all`] tears down every effect of the thread in one
//!    call, e.g. when a view is unmounted.
//!
//! # Thread Safety
//!
//! Nodes are reference counted with `Rc`, so the graph never crosses
//! threads. Each thread has its own registry, task queue and configuration.

use std::cell::RefCell;

use indexmap::IndexMap;

use super::effect::Effect;
use crate::config::{self, RuntimeConfig};
use crate::graph::{GraphSnapshot, NodeId};

thread_local! {
    static REGISTRY: RefCell<IndexMap<NodeId, Effect>> = RefCell::new(IndexMap::new());
}

/// The reactive runtime of the current thread.
pub struct Runtime;

impl Runtime {
    /// Register a live effect with the runtime.
    pub(crate) fn register(effect: Effect) {
        REGISTRY.with(|registry| {
            registry.borrow_mut().insert(effect.id(), effect);
        });
    }

    /// Unregister an effect. Called when it is destroyed.
    pub(crate) fn unregister(id: NodeId) {
        // Release the effect after the registry borrow ends
        let removed = REGISTRY
            .try_with(|registry| registry.borrow_mut().shift_remove(&id))
            .ok()
            .flatten();
        drop(removed);
    }

    /// Handles to every live effect, in creation order.
    pub fn live_effects() -> Vec<Effect> {
        REGISTRY.with(|registry| registry.borrow().values().cloned().collect())
    }

    /// Get the number of live effects.
    pub fn live_effect_count() -> usize {
        REGISTRY.with(|registry| registry.borrow().len())
    }

    /// Destroy every live effect of this thread.
    ///
    /// Returns the number of effects destroyed.
    pub fn destroy_all() -> usize {
        let effects = REGISTRY.with(|registry| std::mem::take(&mut *registry.borrow_mut()));
        let count = effects.len();
        for effect in effects.values() {
            effect.destroy();
        }
        tracing::debug!(count, "destroyed all effects");
        count
    }

    /// Install the configuration for this thread.
    pub fn configure(config: RuntimeConfig) {
        config::install(config);
    }

    /// Get the configuration of this thread.
    pub fn config() -> RuntimeConfig {
        config::current()
    }

    /// Snapshot every live effect and everything it depends on.
    pub fn snapshot() -> GraphSnapshot {
        GraphSnapshot::from_roots(Self::live_effects().iter().map(Effect::node))
    }
}
