//! §3/§4.2: side-track edges (STEs) and the per-state `HinList` that stores them.

use crate::errors::InvariantViolation;
use crate::search_space::SearchSpace;
use crate::task::{Cost, OperatorId, StateId};
use kstar_collections::RefVec;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

/// A non-tree edge `(from, op, to)` observed during expansion, with its cached g-values and
/// `delta = g_from + cost_op - g_to`.
///
/// Equality (the "fingerprint") is the `(from, op, to)` triple alone; ordering is
/// `(delta, g_from, from)`, matching `SideTrackEdge::operator<` of the original engine.
#[derive(Debug, Clone, Copy)]
pub struct SideTrackEdge {
    pub from: StateId,
    pub op: OperatorId,
    pub to: StateId,
    pub g_from: Cost,
    pub g_to: Cost,
    pub cost_op: Cost,
    pub delta: Cost,
}

impl SideTrackEdge {
    pub fn new(from: StateId, op: OperatorId, to: StateId, g_from: Cost, g_to: Cost, cost_op: Cost) -> Self {
        let delta = g_from + cost_op - g_to;
        SideTrackEdge {
            from,
            op,
            to,
            g_from,
            g_to,
            cost_op,
            delta,
        }
    }

    pub fn fingerprint(&self) -> (StateId, OperatorId) {
        (self.from, self.op)
    }

    /// The `<=` used by the sorted-list ordered insert (§4.2): delta only, not the full
    /// `(delta, g_from, from)` tiebreak used by `Ord` / `create_list_from_set`'s sort. This keeps
    /// a newly-pushed STE with an equal delta after any existing equal-delta entries, matching the
    /// upstream `operator<=`.
    pub fn delta_lte(&self, other: &Self) -> bool {
        self.delta <= other.delta
    }

    pub fn check_delta_nonnegative(&self) -> Result<(), InvariantViolation> {
        if self.delta < 0 {
            Err(InvariantViolation::NegativeDelta {
                from: self.from,
                op: self.op,
                to: self.to,
                delta: self.delta,
            })
        } else {
            Ok(())
        }
    }
}

impl PartialEq for SideTrackEdge {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.op == other.op && self.to == other.to
    }
}
impl Eq for SideTrackEdge {}

impl PartialOrd for SideTrackEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SideTrackEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delta
            .cmp(&other.delta)
            .then(self.g_from.cmp(&other.g_from))
            .then(self.from.cmp(&other.from))
    }
}

/// A shared handle to an STE body. Sorted lists hold clones of the `Rc`, so re-sorting or taking
/// a persistent snapshot (see [`crate::path_graph::PathGraphNode`]) never copies the body.
pub type SteHandle = Rc<SideTrackEdge>;

/// Per-state incoming side-track edges: `H_in(s)` of the spec.
///
/// `set` upserts by fingerprint and is the source of truth; `sorted_list` is a derived,
/// delta-ordered view excluding the single tree edge, rebuilt by [`HinList::create_list_from_set`]
/// whenever the state is (re)closed. While `node_closed` is false the sorted list is undefined
/// (spec §3 invariant) and must not be read.
#[derive(Default)]
pub struct HinList {
    set: HashMap<(StateId, OperatorId), SteHandle>,
    sorted_list: im::Vector<SteHandle>,
    pub node_closed: bool,
}

impl HinList {
    pub fn upsert(&mut self, ste: SideTrackEdge) {
        self.set.insert(ste.fingerprint(), Rc::new(ste));
    }

    pub fn get(&self, from: StateId, op: OperatorId) -> Option<&SteHandle> {
        self.set.get(&(from, op))
    }

    pub fn is_empty_set(&self) -> bool {
        self.set.is_empty()
    }

    /// `update_ste_delta` (§4.2): recomputes every STE's delta from the current g-values of its
    /// endpoints, then reinserts it into the set (so the fingerprint-keyed map stays consistent).
    pub fn update_ste_delta(&mut self, to: StateId, search_space: &mut SearchSpace) {
        let g_to = search_space.g(to);
        let stale: Vec<SideTrackEdge> = self.set.values().map(|h| **h).collect();
        self.set.clear();
        for mut ste in stale {
            ste.g_from = search_space.g(ste.from);
            ste.g_to = g_to;
            ste.delta = ste.g_from + ste.cost_op - ste.g_to;
            self.upsert(ste);
        }
    }

    /// `create_list_from_set` (§4.2): rebuilds the sorted list from the set, excluding the tree
    /// edge `(parent, creating_op)`, sorted ascending by `(delta, g_from, from)`.
    pub fn create_list_from_set(&mut self, tree_edge: Option<(StateId, OperatorId)>) {
        debug_assert!(self.node_closed);
        let mut entries: Vec<SteHandle> = self
            .set
            .values()
            .filter(|h| Some(h.fingerprint()) != tree_edge)
            .cloned()
            .collect();
        entries.sort();
        self.sorted_list = entries.into_iter().collect();
    }

    /// `push_back_ste_handle_to_sorted_list` (§4.2): ordered insert keeping the `<=` stability of
    /// the original (a new STE with equal delta to an existing one is inserted after it).
    pub fn push_back_sorted(&mut self, ste: SideTrackEdge) {
        let pos = self.sorted_list.iter().take_while(|h| h.delta_lte(&ste)).count();
        self.sorted_list.insert(pos, Rc::new(ste));
    }

    pub fn sorted_len(&self) -> usize {
        self.sorted_list.len()
    }

    pub fn root(&self) -> Option<&SteHandle> {
        self.sorted_list.get(0)
    }

    /// A cheap, structurally-shared snapshot of the sorted list, for a [`crate::path_graph::PathGraphNode`]
    /// to hold a stable "iterator" into.
    pub fn snapshot(&self) -> im::Vector<SteHandle> {
        self.sorted_list.clone()
    }
}

/// Per-state `HinList`s, keyed by [`StateId`].
pub type HinLists = RefVec<StateId, HinList>;

pub fn ensure_hinlist(lists: &mut HinLists, s: StateId) {
    lists.fill_up_to(s, HinList::default);
}
