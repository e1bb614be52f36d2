//! Graph Nodes
//!
//! This module defines the state shared by every node in the reactive graph
//! and the protocol that keeps the edges between nodes consistent.
//!
//! # Edges
//!
//! A node owns its dependencies strongly and refers to its subscribers
//! weakly. A memo that nobody holds any more is therefore released even while
//! the signals it read still list it; the dead entry is pruned the next time
//! the subscriber list is walked.
//!
//! Edges are added while a node is being evaluated (see
//! [`crate::reactive::ReactiveContext`]) and collected into the node's
//! pending set. When the evaluation ends, [`NodeCore::reconcile`] swaps the
//! pending set in as the new dependency set and drops the back-edges of
//! everything that was not read this time.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A source node (signal). Sources have subscribers but never dependencies.
    Source,

    /// A derived node (memo). Recomputed lazily when read while dirty.
    Derived,

    /// An effect node. Effects have dependencies but are never read, so they
    /// never have subscribers.
    Effect,
}

/// A node that can take part in the reactive graph.
///
/// Sources and memos share the base propagation in [`NodeCore::mark_dirty`];
/// effects override [`AnyNode::notify`] to schedule a rerun instead.
pub(crate) trait AnyNode {
    /// The shared node state.
    fn core(&self) -> &NodeCore;

    /// Called when one of this node's dependencies changed.
    fn notify(self: Rc<Self>);
}

/// Weak back-reference from a dependency to one of its subscribers.
struct SubscriberRef {
    id: NodeId,
    node: Weak<dyn AnyNode>,
}

type DependencyMap = IndexMap<NodeId, Rc<dyn AnyNode>>;

/// State and edge bookkeeping common to all node kinds.
pub(crate) struct NodeCore {
    id: NodeId,
    kind: NodeKind,

    /// True if the cached output may be stale.
    dirty: Cell<bool>,

    /// Nodes that read this node during their last evaluation.
    subscribers: RefCell<SmallVec<[SubscriberRef; 4]>>,

    /// Nodes read during the last completed evaluation, in first-read order.
    dependencies: RefCell<DependencyMap>,

    /// Nodes read so far by the evaluation in flight.
    pending: RefCell<DependencyMap>,
}

impl NodeCore {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            dirty: Cell::new(false),
            subscribers: RefCell::new(SmallVec::new()),
            dependencies: RefCell::new(IndexMap::new()),
            pending: RefCell::new(IndexMap::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn mark_clean(&self) {
        self.dirty.set(false);
    }

    /// Add `subscriber` to this node's subscribers. Subscribing twice is a no-op.
    ///
    /// Dead entries are pruned on the way, so a node that is read often but
    /// never written does not accumulate dropped subscribers.
    pub fn subscribe(&self, subscriber: &Rc<dyn AnyNode>) {
        let id = subscriber.core().id();
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|s| s.node.strong_count() > 0);
        if subscribers.iter().any(|s| s.id == id) {
            return;
        }
        subscribers.push(SubscriberRef {
            id,
            node: Rc::downgrade(subscriber),
        });
    }

    /// Remove the subscriber with the given ID, if present, along with any
    /// dead entries.
    pub fn unsubscribe(&self, id: NodeId) {
        self.subscribers
            .borrow_mut()
            .retain(|s| s.id != id && s.node.strong_count() > 0);
    }

    /// Upgrade every subscriber that is still alive, pruning the dead ones.
    pub fn live_subscribers(&self) -> SmallVec<[Rc<dyn AnyNode>; 4]> {
        let mut live = SmallVec::new();
        self.subscribers
            .borrow_mut()
            .retain(|s| match s.node.upgrade() {
                Some(node) => {
                    live.push(node);
                    true
                }
                None => false,
            });
        live
    }

    /// Number of subscribers that are still alive.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.node.strong_count() > 0)
            .count()
    }

    /// Whether a live subscriber with the given ID is registered.
    pub fn has_subscriber(&self, id: NodeId) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|s| s.id == id && s.node.strong_count() > 0)
    }

    /// Notify every live subscriber.
    ///
    /// The subscriber list is not borrowed while the notifications run.
    pub fn propagate(&self) {
        let subscribers = self.live_subscribers();
        if !subscribers.is_empty() {
            tracing::trace!(node = %self.id, fanout = subscribers.len(), "propagating change");
        }
        for subscriber in subscribers {
            subscriber.notify();
        }
    }

    /// Mark this node dirty and push dirtiness to its subscribers.
    ///
    /// Already-dirty nodes stop the walk, so every node is visited at most
    /// once per change even in diamond-shaped graphs.
    pub fn mark_dirty(&self) {
        if self.dirty.replace(true) {
            return;
        }
        self.propagate();
    }

    /// Forget the dependencies collected by an earlier, unfinished evaluation.
    pub fn begin_evaluation(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Record `dependency` as read by the evaluation in flight.
    pub fn record_pending(&self, dependency: &Rc<dyn AnyNode>) {
        self.pending
            .borrow_mut()
            .entry(dependency.core().id())
            .or_insert_with(|| Rc::clone(dependency));
    }

    /// Replace the dependency set with what the last evaluation read.
    ///
    /// Dependencies that were not read again lose their back-edge to this
    /// node. New ones were already subscribed when they were read.
    pub fn reconcile(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let previous = std::mem::replace(&mut *self.dependencies.borrow_mut(), pending);

        let dependencies = self.dependencies.borrow();
        for (id, dependency) in previous {
            if !dependencies.contains_key(&id) {
                dependency.core().unsubscribe(self.id);
            }
        }
    }

    /// Drop every dependency edge in both directions, including the ones
    /// recorded by an evaluation still in flight.
    pub fn release_dependencies(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        for dependency in dependencies.values().chain(pending.values()) {
            dependency.core().unsubscribe(self.id);
        }
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }

    pub fn depends_on(&self, id: NodeId) -> bool {
        self.dependencies.borrow().contains_key(&id)
    }

    /// Strong handles to the current dependencies, in first-read order.
    pub fn dependencies(&self) -> Vec<Rc<dyn AnyNode>> {
        self.dependencies.borrow().values().cloned().collect()
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dirty", &self.is_dirty())
            .field("subscriber_count", &self.subscriber_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// Minimal node used to exercise the graph protocol in unit tests.
#[cfg(test)]
pub(crate) struct Probe {
    core: NodeCore,
    notified: Cell<usize>,
}

#[cfg(test)]
impl Probe {
    pub fn new(kind: NodeKind) -> Rc<Self> {
        Rc::new(Self {
            core: NodeCore::new(kind),
            notified: Cell::new(0),
        })
    }

    pub fn notified(&self) -> usize {
        self.notified.get()
    }

    pub fn erased(self: &Rc<Self>) -> Rc<dyn AnyNode> {
        Rc::clone(self) as Rc<dyn AnyNode>
    }
}

#[cfg(test)]
impl AnyNode for Probe {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn notify(self: Rc<Self>) {
        self.notified.set(self.notified.get() + 1);
        self.core.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wire `dependent` to `dependency` the way a finished evaluation would.
    fn link(dependency: &Rc<Probe>, dependent: &Rc<Probe>) {
        dependency.core().subscribe(&dependent.erased());
        for existing in dependent.core().dependencies() {
            dependent.core().record_pending(&existing);
        }
        dependent.core().record_pending(&dependency.erased());
        dependent.core().reconcile();
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
        assert_eq!(format!("{}", NodeId(7)), "#7");
    }

    #[test]
    fn subscribe_deduplicates_by_identity() {
        let source = Probe::new(NodeKind::Source);
        let memo = Probe::new(NodeKind::Derived);

        source.core().subscribe(&memo.erased());
        source.core().subscribe(&memo.erased());
        assert_eq!(source.core().subscriber_count(), 1);

        source.core().unsubscribe(memo.core().id());
        assert_eq!(source.core().subscriber_count(), 0);

        // Unsubscribing an absent node is harmless
        source.core().unsubscribe(memo.core().id());
        assert_eq!(source.core().subscriber_count(), 0);
    }

    #[test]
    fn subscribe_prunes_dropped_subscribers() {
        let source = Probe::new(NodeKind::Source);

        for _ in 0..1000 {
            let memo = Probe::new(NodeKind::Derived);
            source.core().subscribe(&memo.erased());
        }
        let live = Probe::new(NodeKind::Derived);
        source.core().subscribe(&live.erased());

        // No write happened, yet only the live entry is left
        assert_eq!(source.core().subscribers.borrow().len(), 1);
        assert_eq!(source.core().subscriber_count(), 1);

        let gone = Probe::new(NodeKind::Derived);
        source.core().subscribe(&gone.erased());
        drop(gone);
        source.core().unsubscribe(NodeId(u64::MAX));
        assert_eq!(source.core().subscribers.borrow().len(), 1);
    }

    #[test]
    fn mark_dirty_stops_at_dirty_nodes() {
        // a -> b, a -> c, b -> d, c -> d
        let a = Probe::new(NodeKind::Source);
        let b = Probe::new(NodeKind::Derived);
        let c = Probe::new(NodeKind::Derived);
        let d = Probe::new(NodeKind::Derived);
        link(&a, &b);
        link(&a, &c);
        link(&b, &d);
        link(&c, &d);

        a.core().propagate();

        assert!(b.core().is_dirty());
        assert!(c.core().is_dirty());
        assert!(d.core().is_dirty());
        // d is reached through both b and c, but only walks its subscribers once
        assert_eq!(d.notified(), 2);
        assert_eq!(b.notified(), 1);
    }

    #[test]
    fn dead_subscribers_are_pruned_while_propagating() {
        let source = Probe::new(NodeKind::Source);
        let memo = Probe::new(NodeKind::Derived);
        link(&source, &memo);
        assert_eq!(source.core().subscriber_count(), 1);

        drop(memo);
        assert_eq!(source.core().subscriber_count(), 0);
        assert_eq!(source.core().subscribers.borrow().len(), 1);

        source.core().propagate();
        assert!(source.core().subscribers.borrow().is_empty());
    }

    #[test]
    fn reconcile_drops_edges_not_read_again() {
        let x = Probe::new(NodeKind::Source);
        let y = Probe::new(NodeKind::Source);
        let memo = Probe::new(NodeKind::Derived);
        link(&x, &memo);
        link(&y, &memo);
        assert_eq!(memo.core().dependency_count(), 2);

        // Next evaluation only reads y
        memo.core().begin_evaluation();
        y.core().subscribe(&memo.erased());
        memo.core().record_pending(&y.erased());
        memo.core().reconcile();

        assert!(!memo.core().depends_on(x.core().id()));
        assert!(memo.core().depends_on(y.core().id()));
        assert!(!x.core().has_subscriber(memo.core().id()));
        assert!(y.core().has_subscriber(memo.core().id()));
    }

    #[test]
    fn release_dependencies_clears_both_directions() {
        let source = Probe::new(NodeKind::Source);
        let effect = Probe::new(NodeKind::Effect);
        link(&source, &effect);

        effect.core().release_dependencies();

        assert_eq!(effect.core().dependency_count(), 0);
        assert!(!source.core().has_subscriber(effect.core().id()));
    }
}
