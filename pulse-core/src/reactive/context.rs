//! Reactive Context
//!
//! The reactive context tracks which node is currently being evaluated.
//! This enables automatic dependency tracking: when a signal or memo is read,
//! the node in the context is subscribed to it without any explicit wiring.
//!
//! # Implementation
//!
//! Each thread has a single slot naming the active evaluator. Entering a
//! context swaps the new evaluator into the slot and keeps the previous
//! occupant in the returned guard; dropping the guard puts it back. Nested
//! evaluations (a memo reading another memo) therefore restore the outer
//! evaluator when the inner one finishes, including when it panics.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::thread;

use crate::graph::{AnyNode, NodeId};

thread_local! {
    static CURRENT: RefCell<Option<Rc<dyn AnyNode>>> = RefCell::new(None);
}

/// Guard that restores the previous evaluator when dropped.
pub struct ReactiveContext {
    previous: Option<Rc<dyn AnyNode>>,
}

impl ReactiveContext {
    /// Make `node` the active evaluator until the guard is dropped.
    ///
    /// `None` suspends tracking for the lifetime of the guard.
    pub(crate) fn enter(node: Option<Rc<dyn AnyNode>>) -> Self {
        let previous = CURRENT.with(|slot| slot.replace(node));
        Self { previous }
    }

    /// Check if a node is currently being evaluated.
    pub fn is_active() -> bool {
        CURRENT.with(|slot| slot.borrow().is_some())
    }

    /// Get the ID of the node currently being evaluated, if any.
    pub fn current_node() -> Option<NodeId> {
        CURRENT.with(|slot| slot.borrow().as_ref().map(|node| node.core().id()))
    }

    fn current() -> Option<Rc<dyn AnyNode>> {
        CURRENT.with(|slot| slot.borrow().clone())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot is gone during thread teardown; nothing left to restore.
        let _ = CURRENT.try_with(|slot| {
            slot.replace(previous);
        });
    }
}

/// Register `dependency` with the active evaluator.
///
/// Reading outside any evaluation creates no edge.
pub(crate) fn track(dependency: &Rc<dyn AnyNode>) {
    let Some(evaluator) = ReactiveContext::current() else {
        return;
    };
    dependency.core().subscribe(&evaluator);
    evaluator.core().record_pending(dependency);
}

/// Run `f` with `node` as the active evaluator, then reconcile its edges.
///
/// Reconciliation happens whether or not `f` panics; the panic payload is
/// handed back to the caller.
pub(crate) fn evaluate<R>(node: &Rc<dyn AnyNode>, f: impl FnOnce() -> R) -> thread::Result<R> {
    node.core().begin_evaluation();
    let outcome = {
        let _scope = ReactiveContext::enter(Some(Rc::clone(node)));
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    node.core().reconcile();
    outcome
}

/// Run `f` without tracking any of the reads it performs.
///
/// ```rust,ignore
/// let memo = Memo::new(move || a.get() + untrack(|| b.get()));
/// // memo reruns when `a` changes, but not when `b` does
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _scope = ReactiveContext::enter(None);
    f()
}
