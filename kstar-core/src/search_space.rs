//! §3 Data Model: `SearchNode` and the `SearchSpace` map that owns the shortest-path tree built
//! by A*.

use crate::task::{Cost, OperatorId, StateId, INFINITE_COST};
use kstar_collections::RefVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    New,
    Open,
    Closed,
    DeadEnd,
}

/// The tree edge recorded for a state: its parent and the operator that generated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEdge {
    pub parent: StateId,
    pub creating_op: OperatorId,
}

#[derive(Debug, Clone)]
pub struct SearchNode {
    pub status: NodeStatus,
    pub g: Cost,
    pub tree_edge: Option<TreeEdge>,
}

impl SearchNode {
    fn unreached() -> Self {
        SearchNode {
            status: NodeStatus::New,
            g: INFINITE_COST,
            tree_edge: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.status == NodeStatus::New
    }
    pub fn is_open(&self) -> bool {
        self.status == NodeStatus::Open
    }
    pub fn is_closed(&self) -> bool {
        self.status == NodeStatus::Closed
    }
    pub fn is_dead_end(&self) -> bool {
        self.status == NodeStatus::DeadEnd
    }
}

/// Owns one [`SearchNode`] per discovered state, keyed by [`StateId`].
///
/// Mirrors `PerStateInformation<SearchNodeInfo>` plus the handful of `SearchNode` accessors of the
/// upstream `SearchSpace`/`SearchNode` pair; the A* driver is the only writer.
#[derive(Default)]
pub struct SearchSpace {
    nodes: RefVec<StateId, SearchNode>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, s: StateId) {
        self.nodes.fill_up_to(s, SearchNode::unreached);
    }

    pub fn get(&mut self, s: StateId) -> &SearchNode {
        self.ensure(s);
        &self.nodes[s]
    }

    pub fn get_opt(&self, s: StateId) -> Option<&SearchNode> {
        if self.nodes.contains(s) {
            Some(&self.nodes[s])
        } else {
            None
        }
    }

    pub fn open_initial(&mut self, s: StateId) {
        self.ensure(s);
        let node = &mut self.nodes[s];
        node.status = NodeStatus::Open;
        node.g = 0;
        node.tree_edge = None;
    }

    pub fn open(&mut self, s: StateId, parent: StateId, op: OperatorId, g: Cost) {
        self.ensure(s);
        let node = &mut self.nodes[s];
        node.status = NodeStatus::Open;
        node.g = g;
        node.tree_edge = Some(TreeEdge { parent, creating_op: op });
    }

    /// Re-opens a closed state through a cheaper predecessor (§4.1). Distinct from `open` only in
    /// that it documents the reopen at call sites; the state transition is identical.
    pub fn reopen(&mut self, s: StateId, parent: StateId, op: OperatorId, g: Cost) {
        self.open(s, parent, op, g);
    }

    pub fn close(&mut self, s: StateId) {
        self.ensure(s);
        self.nodes[s].status = NodeStatus::Closed;
    }

    pub fn mark_dead_end(&mut self, s: StateId) {
        self.ensure(s);
        self.nodes[s].status = NodeStatus::DeadEnd;
    }

    pub fn g(&mut self, s: StateId) -> Cost {
        self.get(s).g
    }

    /// Walks the tree path from the initial state to `s`, inclusive, in initial→s order.
    pub fn tree_path_to(&self, s: StateId) -> Vec<StateId> {
        let mut path = vec![s];
        let mut cur = s;
        while let Some(node) = self.get_opt(cur) {
            match node.tree_edge {
                Some(edge) => {
                    path.push(edge.parent);
                    cur = edge.parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// The operator sequence of the tree path from `s` back to the root, in root→`s` order.
    pub fn tree_plan_to(&self, s: StateId) -> Vec<OperatorId> {
        let mut ops = Vec::new();
        let mut cur = s;
        while let Some(node) = self.get_opt(cur) {
            match node.tree_edge {
                Some(edge) => {
                    ops.push(edge.creating_op);
                    cur = edge.parent;
                }
                None => break,
            }
        }
        ops.reverse();
        ops
    }
}
