//! §4.3: the path-graph walker. `HtreeList` is the per-state root-STE list (one entry per
//! ancestor on the tree path whose `HinList` is non-empty and within the current threshold);
//! `PathGraphNode` is a single Eppstein heap entry, a pair of positions into a frozen
//! `HtreeList`/`HinList` snapshot plus a parent pointer.

use crate::errors::InvariantViolation;
use crate::search_space::SearchSpace;
use crate::side_track_edge::{HinLists, SteHandle};
use crate::task::{Cost, OperatorId, StateId};
use kstar_collections::RefVec;
use std::rc::Rc;

/// §4.3.1: per-state list of root STEs, one per ancestor on the tree path to this state whose
/// `HinList` is non-empty, ordered by delta. `stable` tracks whether the most recent rebuild
/// displaced an existing entry (a cheaper root STE for some ancestor appeared); `updated_iter`
/// is the outer-loop iteration the list was last rebuilt at, so `build_htree_list` can skip
/// redundant rebuilds within the same Eppstein burst.
#[derive(Default)]
pub struct HtreeList {
    roots: im::Vector<SteHandle>,
    pub stable: bool,
    pub updated_iter: i64,
}

impl HtreeList {
    pub fn clear(&mut self) {
        self.roots = im::Vector::new();
        self.stable = false;
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn snapshot(&self) -> im::Vector<SteHandle> {
        self.roots.clone()
    }

    /// Inserts `handle` (the root STE of some ancestor's `HinList`), keeping at most one entry
    /// per ancestor (identified by `handle.to`) and the sorted-by-delta invariant. Returns
    /// whether an existing entry for the same ancestor was displaced, which is the signal the
    /// caller uses to mark the list unstable.
    pub fn insert_or_replace(&mut self, handle: SteHandle) -> bool {
        let mut existing_same_ancestor = None;
        for (i, h) in self.roots.iter().enumerate() {
            if h == &handle {
                return false;
            }
            if h.to == handle.to {
                existing_same_ancestor = Some(i);
                break;
            }
        }
        let mut erased = false;
        if let Some(i) = existing_same_ancestor {
            self.roots.remove(i);
            erased = true;
        }
        let pos = self.roots.iter().take_while(|h| h.delta_lte(&handle)).count();
        self.roots.insert(pos, handle);
        erased
    }
}

pub type HtreeLists = RefVec<StateId, HtreeList>;

pub fn ensure_htreelist(lists: &mut HtreeLists, s: StateId) {
    lists.fill_up_to(s, HtreeList::default);
}

/// Rebuilds `HtreeLists[s]` from the `HinList` root of every ancestor on the tree path to `s`
/// (§4.3.1). A no-op if the list was already rebuilt during `current_outer_iter`.
///
/// `min_f_open_list` is `None` when the A* open list is empty (in which case every candidate root
/// is admitted unconditionally, mirroring `open_list->empty()` short-circuiting the threshold
/// check upstream).
#[allow(clippy::too_many_arguments)]
pub fn build_htree_list(
    s: StateId,
    search_space: &SearchSpace,
    hin_lists: &HinLists,
    htree_lists: &mut HtreeLists,
    c_star: Cost,
    min_f_open_list: Option<Cost>,
    restart_eppstein: bool,
    current_outer_iter: i64,
) {
    ensure_htreelist(htree_lists, s);
    if htree_lists[s].updated_iter == current_outer_iter {
        return;
    }

    let path = search_space.tree_path_to(s);
    htree_lists[s].clear();
    htree_lists[s].stable = true;
    for ancestor in path {
        let root = match hin_lists.get(ancestor).and_then(|list| list.root()) {
            Some(root) => root.clone(),
            None => continue,
        };
        let admit = match min_f_open_list {
            None => true,
            Some(min_f) => {
                if restart_eppstein {
                    root.delta + c_star <= min_f
                } else {
                    root.delta + c_star < min_f
                }
            }
        };
        if admit {
            let erased = htree_lists[s].insert_or_replace(root);
            if erased {
                htree_lists[s].stable = false;
            }
        }
    }
    htree_lists[s].updated_iter = current_outer_iter;
}

/// A single node of the (lazily generated) Eppstein path graph: a frozen pair of positions, one
/// into an `HtreeList` snapshot and one into the `HinList` snapshot the selected root points at.
///
/// `path_value` is the total cost above the optimum that taking every active deviation on the
/// root-to-`self` chain adds; ordering the Eppstein open list by ascending `path_value` extracts
/// plans in non-decreasing cost order (§4.3.3, §8 I-MONO).
pub struct PathGraphNode {
    pub sid_htree: StateId,
    htree_snapshot: im::Vector<SteHandle>,
    it_htreelist: usize,
    hin_snapshot: im::Vector<SteHandle>,
    it_hinlist: usize,
    pub parent: Option<Rc<PathGraphNode>>,
    pub by_crossing_arc: bool,
    pub ste_delta: Cost,
    pub edge_value: Cost,
    pub path_value: Cost,
    pub creation_time: u64,
}

impl PathGraphNode {
    #[allow(clippy::too_many_arguments)]
    fn new(
        sid_htree: StateId,
        htree_snapshot: im::Vector<SteHandle>,
        it_htreelist: usize,
        hin_snapshot: im::Vector<SteHandle>,
        it_hinlist: usize,
        parent: Option<Rc<PathGraphNode>>,
        by_crossing_arc: bool,
        creation_time: u64,
    ) -> Result<Self, InvariantViolation> {
        let ste_delta = hin_snapshot[it_hinlist].delta;
        let mut edge_value = ste_delta;
        if !by_crossing_arc {
            if let Some(p) = &parent {
                edge_value -= p.ste_delta;
            }
        }
        let mut path_value = edge_value;
        if let Some(p) = &parent {
            path_value += p.path_value;
        }
        if path_value < 0 {
            return Err(InvariantViolation::NegativePathValue(path_value));
        }
        Ok(PathGraphNode {
            sid_htree,
            htree_snapshot,
            it_htreelist,
            hin_snapshot,
            it_hinlist,
            parent,
            by_crossing_arc,
            ste_delta,
            edge_value,
            path_value,
            creation_time,
        })
    }

    /// The STE this node currently points at: `*it_hinlist` of the original.
    pub fn current_ste(&self) -> &SteHandle {
        &self.hin_snapshot[self.it_hinlist]
    }

    fn is_root_of_hinlist(&self) -> bool {
        self.it_hinlist == 0
    }

    fn is_last_of_htreelist(&self) -> bool {
        self.it_htreelist + 1 == self.htree_snapshot.len()
    }

    fn is_last_of_hinlist(&self) -> bool {
        self.it_hinlist + 1 == self.hin_snapshot.len()
    }
}

/// Seeds the Eppstein search at the goal state (§4.3.1's `initialize_eppstein`): the root of
/// `HtreeLists[goal]`, which points at the cheapest root STE among all ancestors on the optimal
/// tree path. `None` if the goal has no side-track edges at all (the optimal plan is the only
/// plan).
pub fn goal_root(
    goal: StateId,
    htree_lists: &HtreeLists,
    hin_lists: &HinLists,
    creation_time: u64,
) -> Result<Option<Rc<PathGraphNode>>, InvariantViolation> {
    let htree = match htree_lists.get(goal) {
        Some(h) if !h.is_empty() => h,
        _ => return Ok(None),
    };
    let htree_snapshot = htree.snapshot();
    let sid_hin = htree_snapshot[0].to;
    let hin_snapshot = hin_lists
        .get(sid_hin)
        .expect("root STE's `to` state must have a non-empty HinList")
        .snapshot();
    debug_assert_eq!(&hin_snapshot[0], &htree_snapshot[0]);
    let node = PathGraphNode::new(goal, htree_snapshot, 0, hin_snapshot, 0, None, false, creation_time)?;
    Ok(Some(Rc::new(node)))
}

/// Generates the (up to three) children of `pn` per §4.3.2: a "right" sibling within the same
/// `HtreeList` (only from a root position), a "down" sibling within the same `HinList`, and a
/// "cross" child that jumps to the predecessor `pn`'s STE points back at.
///
/// Every child is built eagerly (this is the "lazy path graph" of Eppstein's algorithm applied
/// to one already-popped node, not lazy generation of the whole graph); the caller filters by
/// `target_cost_bound` unless `ignore_quality` is set, matching the upstream
/// `generate_eppstein_children`.
#[allow(clippy::too_many_arguments)]
pub fn generate_children(
    pn: &Rc<PathGraphNode>,
    search_space: &SearchSpace,
    hin_lists: &HinLists,
    htree_lists: &mut HtreeLists,
    c_star: Cost,
    min_f_open_list: Option<Cost>,
    restart_eppstein: bool,
    current_outer_iter: i64,
    ignore_quality: bool,
    target_cost_bound: Cost,
    next_creation_time: &mut u64,
) -> Result<Vec<Rc<PathGraphNode>>, InvariantViolation> {
    build_htree_list(
        pn.sid_htree,
        search_space,
        hin_lists,
        htree_lists,
        c_star,
        min_f_open_list,
        restart_eppstein,
        current_outer_iter,
    );

    let mut children = Vec::new();
    let mut admit = |node: PathGraphNode, children: &mut Vec<Rc<PathGraphNode>>| {
        if ignore_quality || node.path_value + c_star <= target_cost_bound {
            children.push(Rc::new(node));
        }
    };

    // Right: pn sits on the root of its HinList, and the HtreeList it was drawn from has a next
    // candidate ancestor.
    if pn.is_root_of_hinlist() && !pn.is_last_of_htreelist() {
        let ch_htree_it = pn.it_htreelist + 1;
        let ch_sid_hin = pn.htree_snapshot[ch_htree_it].to;
        let ch_hin_snapshot = hin_lists
            .get(ch_sid_hin)
            .expect("htree root's `to` state must have a non-empty HinList")
            .snapshot();
        let ch = PathGraphNode::new(
            pn.sid_htree,
            pn.htree_snapshot.clone(),
            ch_htree_it,
            ch_hin_snapshot,
            0,
            Some(Rc::clone(pn)),
            false,
            *next_creation_time,
        )?;
        *next_creation_time += 1;
        admit(ch, &mut children);
    }

    // Down: the next STE within the same HinList.
    if !pn.is_last_of_hinlist() {
        let ch = PathGraphNode::new(
            pn.sid_htree,
            pn.htree_snapshot.clone(),
            pn.it_htreelist,
            pn.hin_snapshot.clone(),
            pn.it_hinlist + 1,
            Some(Rc::clone(pn)),
            false,
            *next_creation_time,
        )?;
        *next_creation_time += 1;
        admit(ch, &mut children);
    }

    // Cross: jump to the predecessor the current STE deviates from.
    let sid_from = pn.current_ste().from;
    build_htree_list(
        sid_from,
        search_space,
        hin_lists,
        htree_lists,
        c_star,
        min_f_open_list,
        restart_eppstein,
        current_outer_iter,
    );
    if let Some(from_htree) = htree_lists.get(sid_from) {
        if !from_htree.is_empty() {
            let htree_snapshot = from_htree.snapshot();
            let ch_sid_hin = htree_snapshot[0].to;
            let hin_snapshot = hin_lists
                .get(ch_sid_hin)
                .expect("htree root's `to` state must have a non-empty HinList")
                .snapshot();
            let ch = PathGraphNode::new(
                sid_from,
                htree_snapshot,
                0,
                hin_snapshot,
                0,
                Some(Rc::clone(pn)),
                true,
                *next_creation_time,
            )?;
            *next_creation_time += 1;
            admit(ch, &mut children);
        }
    }

    Ok(children)
}

/// Operators on the tree path strictly between `ancestor` and `descendant` (both inclusive of
/// the edges crossed), in `ancestor -> descendant` chronological order. `ancestor` must actually
/// lie on `descendant`'s tree path, which the path-graph construction guarantees for every
/// segment boundary this is called with.
fn tree_ops_between(search_space: &SearchSpace, ancestor: StateId, descendant: StateId) -> Vec<OperatorId> {
    let full = search_space.tree_plan_to(descendant);
    let prefix_len = search_space.tree_plan_to(ancestor).len();
    full[prefix_len..].to_vec()
}

/// §4.3.4: walks `leaf`'s parent chain collecting the STEs whose contribution is active (a node
/// is active iff it is `leaf` itself, or its child on the walk was reached by a crossing arc),
/// then stitches tree-path fragments between consecutive active deviations to recover the full
/// operator sequence from `initial_state` to `goal_state`.
pub fn decode_plan(
    leaf: &Rc<PathGraphNode>,
    search_space: &SearchSpace,
    initial_state: StateId,
    goal_state: StateId,
) -> Vec<OperatorId> {
    let mut active_deviations: Vec<SteHandle> = Vec::new();
    let mut active = true;
    let mut current = Some(Rc::clone(leaf));
    while let Some(node) = current {
        if active {
            active_deviations.push(node.current_ste().clone());
        }
        active = node.by_crossing_arc;
        current = node.parent.clone();
    }

    // `active_deviations` was built leaf-first; the deviation nearest the goal is the last one
    // pushed, so we walk it in reverse (mirroring the upstream stack's pop order).
    let mut plan = Vec::new();
    let mut prev_from: Option<StateId> = None;
    for (i, ste) in active_deviations.iter().rev().enumerate() {
        let segment_end = if i == 0 { goal_state } else { prev_from.unwrap() };
        let mut segment = tree_ops_between(search_space, ste.to, segment_end);
        segment.reverse();
        plan.extend(segment);
        plan.push(ste.op);
        prev_from = Some(ste.from);
    }
    if let Some(pf) = prev_from {
        if pf != initial_state {
            let mut segment = tree_ops_between(search_space, initial_state, pf);
            segment.reverse();
            plan.extend(segment);
        }
    }
    plan.reverse();
    plan
}
