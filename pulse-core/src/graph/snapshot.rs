//! Graph Snapshots
//!
//! A snapshot is a plain, serializable copy of part of the graph, meant for
//! debugging tools. It is built by walking dependency edges from a set of
//! roots, which is every node those roots can currently observe.

use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;

use super::node::{AnyNode, NodeId, NodeKind};
use crate::error::Result;

/// One node as seen at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub dirty: bool,
    pub subscribers: usize,
    pub dependencies: usize,
}

/// A dependency edge: `dependent` read `dependency` during its last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeSnapshot {
    pub dependency: NodeId,
    pub dependent: NodeId,
}

/// The nodes and edges reachable from a set of roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    pub(crate) fn from_roots<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = Rc<dyn AnyNode>>,
    {
        let mut snapshot = Self::default();
        let mut visited = HashSet::new();
        let mut stack: Vec<Rc<dyn AnyNode>> = roots.into_iter().collect();
        stack.reverse();

        while let Some(node) = stack.pop() {
            let core = node.core();
            if !visited.insert(core.id()) {
                continue;
            }

            let dependencies = core.dependencies();
            snapshot.nodes.push(NodeSnapshot {
                id: core.id(),
                kind: core.kind(),
                dirty: core.is_dirty(),
                subscribers: core.subscriber_count(),
                dependencies: dependencies.len(),
            });
            for dependency in dependencies.into_iter().rev() {
                snapshot.edges.push(EdgeSnapshot {
                    dependency: dependency.core().id(),
                    dependent: core.id(),
                });
                stack.push(dependency);
            }
        }

        snapshot
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn has_edge(&self, dependency: NodeId, dependent: NodeId) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.dependency == dependency && edge.dependent == dependent)
    }

    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
