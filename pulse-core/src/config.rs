//! Runtime configuration.
//!
//! Configuration is installed per thread, like the rest of the reactive
//! state. Hosts typically deserialize a [`RuntimeConfig`] from their own
//! settings and hand it to [`crate::reactive::Runtime::configure`].

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Default number of tasks a single flush may execute.
pub const DEFAULT_MAX_TASKS_PER_FLUSH: usize = 10_000;

/// Tunables for the reactive runtime of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on tasks executed by one flush of the scheduler.
    ///
    /// Effects that keep rescheduling each other would otherwise spin
    /// forever. Tasks beyond the budget stay queued for the next flush.
    pub max_tasks_per_flush: usize,
}

impl RuntimeConfig {
    pub fn with_max_tasks_per_flush(mut self, max_tasks: usize) -> Self {
        self.max_tasks_per_flush = max_tasks.max(1);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_flush: DEFAULT_MAX_TASKS_PER_FLUSH,
        }
    }
}

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::default());
}

pub(crate) fn current() -> RuntimeConfig {
    CONFIG.with(Cell::get)
}

pub(crate) fn install(config: RuntimeConfig) {
    // A zero budget would starve the queue
    let config = config.with_max_tasks_per_flush(config.max_tasks_per_flush);
    CONFIG.with(|slot| slot.set(config));
}
