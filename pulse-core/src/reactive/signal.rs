//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a memo or effect is being evaluated, the
//!    signal registers that node as a subscriber.
//!
//! 2. When a signal's value changes, every subscriber is marked dirty,
//!    synchronously and transitively, before `set` returns.
//!
//! 3. Memos recompute on their next read; effects are scheduled.
//!
//! Writes that compare equal to the current value are dropped before they
//! reach the graph. The comparison defaults to `PartialEq` and can be
//! replaced per signal.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::context;
use crate::graph::{AnyNode, NodeCore, NodeId, NodeKind};

type EqualFn<T> = Box<dyn Fn(&T, &T) -> bool>;

pub(crate) struct SignalNode<T> {
    core: NodeCore,
    value: RefCell<T>,
    equal: EqualFn<T>,
}

impl<T: 'static> SignalNode<T> {
    fn track(self: &Rc<Self>) {
        context::track(&(Rc::clone(self) as Rc<dyn AnyNode>));
    }

    /// Store `value` and notify subscribers, without comparing.
    fn write(&self, value: T) {
        match self.value.try_borrow_mut() {
            Ok(mut slot) => *slot = value,
            Err(_) => panic!(
                "signal {} written while its value is borrowed",
                self.core.id()
            ),
        }
        self.core.propagate();
    }
}

impl<T> AnyNode for SignalNode<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    // Sources have no dependencies, so nothing ever notifies them.
    fn notify(self: Rc<Self>) {}
}

/// A reactive cell holding a value of type `T`.
///
/// `Signal` is a cheap handle; clones share the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (marks dependents dirty)
/// count.set(5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalNode<T>>,
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Create a new signal that ignores writes equal to the current value.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, |a: &T, b: &T| a == b)
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with a custom equality check.
    ///
    /// `set` only propagates when `equal(current, new)` returns false.
    pub fn with_equality<F>(value: T, equal: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        Self {
            inner: Rc::new(SignalNode {
                core: NodeCore::new(NodeKind::Source),
                value: RefCell::new(value),
                equal: Box::new(equal),
            }),
        }
    }

    /// Create a signal whose every `set` propagates, for values without a
    /// meaningful equality.
    pub fn always_notify(value: T) -> Self {
        Self::with_equality(value, |_, _| false)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.core.id()
    }

    /// Borrow the current value, tracking the read.
    ///
    /// # Panics
    ///
    /// The value stays borrowed while `f` runs, so writing this signal from
    /// inside `f` panics. Use [`Signal::get`] to work on a copy instead.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.track();
        f(&*self.inner.value.borrow())
    }

    /// Set a new value and mark dependents dirty.
    ///
    /// Returns false if the value compared equal and nothing was propagated.
    pub fn set(&self, value: T) -> bool {
        let unchanged = (self.inner.equal)(&*self.inner.value.borrow(), &value);
        if unchanged {
            tracing::trace!(node = %self.id(), "write suppressed, value unchanged");
            return false;
        }
        self.inner.write(value);
        true
    }

    /// Update the value using a function of the current one.
    ///
    /// # Panics
    ///
    /// `f` sees the value borrowed, so it must not write this signal itself.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&*self.inner.value.borrow());
        self.set(next)
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.core.subscriber_count()
    }

    /// Whether the node with the given ID currently subscribes to this signal.
    pub fn has_subscriber(&self, id: NodeId) -> bool {
        self.inner.core.has_subscriber(id)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called while a memo or effect is evaluating, this also registers
    /// that node as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
