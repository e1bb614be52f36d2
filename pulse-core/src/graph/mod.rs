//! Dependency Graph
//!
//! This module implements the graph that connects reactive values and the
//! computations that read them.
//!
//! # Overview
//!
//! - Nodes represent sources (signals), derived values (memos) or effects.
//! - Edges represent dependencies: if A reads B, B lists A as a subscriber
//!   and A lists B as a dependency.
//!
//! Edges are not declared up front. They are discovered while a node
//! evaluates and reconciled when the evaluation ends, so conditional reads
//! add and remove edges as branches change.
//!
//! # Design Decisions
//!
//! 1. Edges live on the nodes themselves rather than in a central table, so
//!    a node that nothing references any more simply goes away.
//!
//! 2. Dependency edges are strong and subscriber edges are weak. Ownership
//!    flows from effects towards sources, never back.
//!
//! 3. Dirtiness is pushed eagerly, values are pulled lazily, and effects are
//!    deferred to the [`scheduler`].

mod node;
pub mod scheduler;
mod snapshot;

pub(crate) use node::{AnyNode, NodeCore};
#[cfg(test)]
pub(crate) use node::Probe;
pub use node::{NodeId, NodeKind};
pub use scheduler::{flush, pending_tasks, settle, EffectFailure, TickReport};
pub use snapshot::{EdgeSnapshot, GraphSnapshot, NodeSnapshot};
