//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. Creating a memo computes nothing. The first read runs the computation
//!    and caches the result.
//!
//! 2. While the memo is clean, reads return the cached value.
//!
//! 3. When a dependency changes, the memo is marked dirty and passes the
//!    mark on to its own subscribers. It does not recompute yet.
//!
//! 4. The next read recomputes once, however many writes happened since.
//!
//! # Why This Matters
//!
//! - A signal changes
//! - 10 memos depend on it
//! - Only the memos actually read will recompute
//! - Memos that are never read stay dirty (no wasted work)
//!
//! # Failure
//!
//! A panicking computation propagates to the reader. The previous value is
//! kept, the memo is flagged as failed, and the next read tries again.
//! The memo does not stay dirty, so later upstream writes still travel
//! through it to its subscribers.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::panic;
use std::rc::Rc;

use super::context;
use crate::error::{panic_message, ReactiveError, Result};
use crate::graph::{AnyNode, NodeCore, NodeId, NodeKind};

type Payload = Box<dyn Any + Send>;

/// Why a read could not produce a value.
enum ReadError {
    Cycle,
    Panicked(Payload),
}

pub(crate) struct MemoNode<T> {
    core: NodeCore,

    /// The computation function.
    compute: Box<dyn Fn() -> T>,

    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,

    /// The last computation panicked.
    failed: Cell<bool>,

    /// The computation is running right now.
    computing: Cell<bool>,
}

impl<T: Clone + 'static> MemoNode<T> {
    fn read(self: &Rc<Self>) -> std::result::Result<T, ReadError> {
        if self.computing.get() {
            return Err(ReadError::Cycle);
        }
        context::track(&(Rc::clone(self) as Rc<dyn AnyNode>));

        if !self.core.is_dirty() && !self.failed.get() {
            if let Some(value) = self.value.borrow().as_ref() {
                return Ok(value.clone());
            }
        }
        self.recompute().map_err(ReadError::Panicked)
    }

    /// Run the computation as the active evaluator and cache its result.
    fn recompute(self: &Rc<Self>) -> std::result::Result<T, Payload> {
        let this: Rc<dyn AnyNode> = Rc::clone(self) as Rc<dyn AnyNode>;

        // Cleared up front: a dependency written mid-computation dirties it again
        self.core.mark_clean();
        self.computing.set(true);
        let outcome = context::evaluate(&this, || (self.compute)());
        self.computing.set(false);

        match outcome {
            Ok(value) => {
                tracing::trace!(
                    node = %self.core.id(),
                    dependencies = self.core.dependency_count(),
                    "memo recomputed"
                );
                self.failed.set(false);
                *self.value.borrow_mut() = Some(value.clone());
                Ok(value)
            }
            Err(payload) => {
                tracing::warn!(
                    node = %self.core.id(),
                    message = %panic_message(payload.as_ref()),
                    "memo computation panicked"
                );
                self.failed.set(true);
                Err(payload)
            }
        }
    }
}

impl<T> AnyNode for MemoNode<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn notify(self: Rc<Self>) {
        self.core.mark_dirty();
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Reads hand out clones, so it must
///   be `Clone`.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(2);
/// let doubled = Memo::new({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T: 'static> {
    inner: Rc<MemoNode<T>>,
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            inner: Rc::new(MemoNode {
                core: NodeCore::new(NodeKind::Derived),
                compute: Box::new(compute),
                value: RefCell::new(None),
                failed: Cell::new(false),
                computing: Cell::new(false),
            }),
        }
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Resumes the panic of a failing computation, and panics if the memo is
    /// read from inside its own computation. Use [`Memo::try_get`] to get
    /// these as errors instead.
    pub fn get(&self) -> T {
        match self.inner.read() {
            Ok(value) => value,
            Err(ReadError::Panicked(payload)) => panic::resume_unwind(payload),
            Err(ReadError::Cycle) => panic!("{}", ReactiveError::CyclicRead { node: self.id() }),
        }
    }

    /// Get the current value, reporting failures as errors.
    pub fn try_get(&self) -> Result<T> {
        self.inner.read().map_err(|err| match err {
            ReadError::Cycle => ReactiveError::CyclicRead { node: self.id() },
            ReadError::Panicked(payload) => ReactiveError::ComputationPanicked {
                node: self.id(),
                message: panic_message(payload.as_ref()),
            },
        })
    }
}

impl<T: 'static> Memo<T> {
    /// Get the memo's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.core.id()
    }

    /// Whether a dependency changed since the last computation.
    pub fn is_dirty(&self) -> bool {
        self.inner.core.is_dirty()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Whether the last computation panicked.
    pub fn has_failed(&self) -> bool {
        self.inner.failed.get()
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.core.subscriber_count()
    }

    /// Get the number of dependencies from the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.core.dependency_count()
    }

    /// Whether the last computation read the node with the given ID.
    pub fn depends_on(&self, id: NodeId) -> bool {
        self.inner.core.depends_on(id)
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id())
            .field("dirty", &self.is_dirty())
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
