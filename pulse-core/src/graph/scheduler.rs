//! Update Scheduler
//!
//! Effects never run synchronously when a dependency changes. Instead they
//! enqueue a task on a per-thread deferred queue, the equivalent of a
//! microtask queue, which the host drains once the current synchronous turn
//! is over.
//!
//! # Algorithm
//!
//! 1. A write marks its downstream closure dirty. Every effect reached by the
//!    walk checks its `scheduled` flag and enqueues at most one task.
//! 2. Further writes in the same turn find the effect already scheduled, so N
//!    writes collapse into a single rerun.
//! 3. [`flush`] pops tasks in FIFO order. Tasks enqueued while flushing run in
//!    the same flush, up to the configured budget.
//!
//! A host with an event loop calls [`flush`] after each externally driven
//! event. Under tokio, [`settle`] yields to the runtime and flushes until the
//! queue is idle.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::config;
use crate::error::ReactiveError;
use crate::graph::NodeId;

type Job = Box<dyn FnOnce() -> Result<(), ReactiveError>>;

/// A deferred unit of work owned by a graph node.
struct Task {
    node: NodeId,
    job: Job,
}

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static FLUSHING: Cell<bool> = Cell::new(false);
}

/// A task that failed during a flush.
#[derive(Debug)]
pub struct EffectFailure {
    /// The node that owned the task.
    pub node: NodeId,
    pub error: ReactiveError,
}

/// Outcome of draining the task queue.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tasks taken off the queue.
    pub executed: usize,

    /// Tasks left queued because the flush budget ran out.
    pub deferred: usize,

    /// Tasks whose effect panicked.
    pub failures: Vec<EffectFailure>,
}

impl TickReport {
    /// True if no task failed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, other: TickReport) {
        self.executed += other.executed;
        self.deferred = other.deferred;
        self.failures.extend(other.failures);
    }
}

/// Queue `job` to run on the next flush of this thread.
pub(crate) fn enqueue<F>(node: NodeId, job: F)
where
    F: FnOnce() -> Result<(), ReactiveError> + 'static,
{
    QUEUE.with(|queue| {
        queue.borrow_mut().push_back(Task {
            node,
            job: Box::new(job),
        })
    });
}

/// Number of tasks waiting for the next flush.
pub fn pending_tasks() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Resets the flushing flag even if a task unwinds.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = FLUSHING.try_with(|flushing| flushing.set(false));
    }
}

/// Drain the task queue of this thread.
///
/// A flush started from inside a running task returns an empty report; the
/// outer flush picks up whatever the task enqueued.
pub fn flush() -> TickReport {
    let mut report = TickReport::default();
    if FLUSHING.with(|flushing| flushing.replace(true)) {
        return report;
    }
    let _guard = FlushGuard;
    let budget = config::current().max_tasks_per_flush;

    loop {
        if report.executed >= budget {
            report.deferred = pending_tasks();
            if report.deferred > 0 {
                tracing::warn!(
                    budget,
                    deferred = report.deferred,
                    "flush budget exhausted, deferring remaining tasks"
                );
            }
            break;
        }

        // The queue must not stay borrowed while the job runs
        let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) else {
            break;
        };
        report.executed += 1;

        if let Err(error) = (task.job)() {
            tracing::error!(node = %task.node, %error, "scheduled task failed");
            report.failures.push(EffectFailure {
                node: task.node,
                error,
            });
        }
    }

    report
}

/// Flush repeatedly, yielding to the tokio runtime before each pass, until
/// the queue is empty.
///
/// The graph lives in thread-local storage, so this must be awaited on the
/// thread that owns it: a current-thread runtime or a `LocalSet`.
pub async fn settle() -> TickReport {
    let mut total = TickReport::default();
    loop {
        tokio::task::yield_now().await;
        total.absorb(flush());
        if pending_tasks() == 0 {
            return total;
        }
    }
}
