//! Effect Implementation
//!
//! An Effect is a side-effecting computation that reruns whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. Creating an effect schedules its first run. Nothing runs until the
//!    scheduler is flushed.
//!
//! 2. Each run is evaluated like a memo recomputation: reads are tracked and
//!    the dependency set is reconciled afterwards, so the effect follows
//!    whatever it read most recently.
//!
//! 3. When a dependency changes the effect is scheduled again. While it is
//!    scheduled, further changes are absorbed: any number of writes in one
//!    synchronous turn produce a single rerun.
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (compute on read); effects are pushed to the scheduler.
//! - Memos are read by other nodes; effects never are.
//!
//! # Lifetime
//!
//! Effects are owned by the thread's [`Runtime`] registry until destroyed,
//! so dropping an `Effect` handle does not stop it. Call [`Effect::destroy`]
//! or [`Runtime::destroy_all`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::context;
use super::runtime::Runtime;
use crate::error::{panic_message, ReactiveError};
use crate::graph::{scheduler, AnyNode, NodeCore, NodeId, NodeKind};

pub(crate) struct EffectNode {
    core: NodeCore,

    /// The effect function.
    run: Box<dyn Fn()>,

    /// A task for this effect is queued and has not finished yet.
    scheduled: Cell<bool>,

    destroyed: Cell<bool>,

    /// Number of times the effect has run.
    run_count: Cell<usize>,
}

impl EffectNode {
    /// Run the effect function as the active evaluator.
    fn execute(self: &Rc<Self>) -> Result<(), ReactiveError> {
        let this: Rc<dyn AnyNode> = Rc::clone(self) as Rc<dyn AnyNode>;
        let outcome = context::evaluate(&this, || (self.run)());
        self.run_count.set(self.run_count.get() + 1);

        // Destroyed from inside its own run: drop what this run subscribed to
        if self.destroyed.get() {
            self.core.release_dependencies();
        }

        tracing::trace!(
            node = %self.core.id(),
            dependencies = self.core.dependency_count(),
            "effect ran"
        );

        outcome.map_err(|payload| ReactiveError::ComputationPanicked {
            node: self.core.id(),
            message: panic_message(payload.as_ref()),
        })
    }

    /// Body of the scheduled task.
    fn run_scheduled(self: Rc<Self>) -> Result<(), ReactiveError> {
        let outcome = if self.destroyed.get() {
            Ok(())
        } else {
            self.execute()
        };
        self.scheduled.set(false);
        outcome
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.core.release_dependencies();
        Runtime::unregister(self.core.id());
        tracing::debug!(node = %self.core.id(), "effect destroyed");
    }
}

impl AnyNode for EffectNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn notify(self: Rc<Self>) {
        if self.scheduled.get() || self.destroyed.get() {
            return;
        }
        self.scheduled.set(true);

        let id = self.core.id();
        scheduler::enqueue(id, move || self.run_scheduled());
    }
}

/// A side-effecting computation that reruns when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new({
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
///
/// flush();       // Prints: "Count is: 0"
/// count.set(5);
/// flush();       // Prints: "Count is: 5"
/// effect.destroy();
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectNode>,
}

impl Effect {
    /// Create a new effect and schedule its first run.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let inner = Rc::new(EffectNode {
            core: NodeCore::new(NodeKind::Effect),
            run: Box::new(run),
            scheduled: Cell::new(false),
            destroyed: Cell::new(false),
            run_count: Cell::new(0),
        });
        let effect = Self { inner };

        Runtime::register(effect.clone());
        tracing::debug!(node = %effect.id(), "effect created");
        Rc::clone(&effect.inner).notify();

        effect
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.core.id()
    }

    /// Stop the effect for good and release all of its subscriptions.
    ///
    /// A run already in progress finishes, but the effect is never run again.
    /// Destroying twice is a no-op.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Check if the effect has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Check if a rerun is queued.
    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of dependencies from the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.core.dependency_count()
    }

    /// Whether the last run read the node with the given ID.
    pub fn depends_on(&self, id: NodeId) -> bool {
        self.inner.core.depends_on(id)
    }

    pub(crate) fn node(&self) -> Rc<dyn AnyNode> {
        Rc::clone(&self.inner) as Rc<dyn AnyNode>
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("scheduled", &self.is_scheduled())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
