//! §4.1: the A* driver. `step_astar` expands one state per call, threading the shortest-path
//! tree (via [`SearchSpace`]) and the per-state [`HinList`]s the path-graph walker consumes.

use crate::errors::InvariantViolation;
use crate::evaluator::{EvalResult, Evaluator};
use crate::open_list::{EvalContext, OpenList};
use crate::pruning::PruningMethod;
use crate::search_space::SearchSpace;
use crate::side_track_edge::{ensure_hinlist, HinLists, SideTrackEdge};
use crate::symmetry::SymmetryCollaborator;
use crate::task::{Cost, OperatorId, StateId, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstarStatus {
    InProgress,
    /// The first goal state was reached; its cost is `C*`.
    Solved { goal: StateId, cost: Cost },
    /// The open list emptied without finding a goal.
    Failed,
}

/// Bundles the collaborators `step_astar` needs, plus the handful of flags the engine loop reads
/// back to decide when to switch to Eppstein (§4.4).
pub struct AstarDriver {
    pub open_list: Box<dyn OpenList>,
    pub evaluator: Box<dyn Evaluator>,
    pub pruning: Box<dyn PruningMethod>,
    pub symmetry: Option<Box<dyn SymmetryCollaborator>>,
    /// Set for the remainder of the current burst once a reopen occurs; the engine resets it at
    /// the start of every burst.
    pub reopen_occurred: bool,
    /// Set when `switch_on_goal` is enabled and a successor reaching the goal is generated after
    /// the first goal was already found.
    pub goal_node_generated: bool,
}

impl AstarDriver {
    pub fn new(open_list: Box<dyn OpenList>, evaluator: Box<dyn Evaluator>, pruning: Box<dyn PruningMethod>) -> Self {
        AstarDriver {
            open_list,
            evaluator,
            pruning,
            symmetry: None,
            reopen_occurred: false,
            goal_node_generated: false,
        }
    }

    pub fn initialize(&mut self, task: &dyn Task, search_space: &mut SearchSpace) {
        let initial = task.initial_state();
        self.evaluator.notify_initial_state(initial);
        let h = self.evaluator.evaluate(initial, 0);
        search_space.open_initial(initial);
        if !h.is_dead_end() {
            self.open_list.insert(EvalContext {
                state: initial,
                g: 0,
                h: eval_to_h(h),
                preferred: true,
            });
        }
        self.pruning.initialize(task);
    }
}

fn eval_to_h(r: EvalResult) -> Option<Cost> {
    match r {
        EvalResult::Estimate(h) => Some(h),
        EvalResult::DeadEnd => None,
    }
}

/// One A* expansion (§4.1). `switch_on_goal` and `first_goal_reached` are read-only inputs;
/// `target_cost_bound` prunes successor generation exactly as the engine's quality bound does
/// once it is known (`INFINITE_COST` before the first goal is found disables the prune).
#[allow(clippy::too_many_arguments)]
pub fn step_astar(
    driver: &mut AstarDriver,
    task: &dyn Task,
    search_space: &mut SearchSpace,
    hin_lists: &mut HinLists,
    first_goal_reached: bool,
    target_cost_bound: Cost,
    hard_bound: Cost,
    switch_on_goal: bool,
) -> Result<AstarStatus, InvariantViolation> {
    let s = loop {
        let id = match driver.open_list.remove_min() {
            Some(id) => id,
            None => return Ok(AstarStatus::Failed),
        };
        if search_space.get(id).is_closed() {
            continue;
        }
        let g = search_space.g(id);

        if driver.evaluator.is_lazy() {
            if search_space.get(id).is_dead_end() {
                continue;
            }
            if let Some(old) = driver.evaluator.cached_estimate(id) {
                let new = driver.evaluator.evaluate(id, g);
                let ctx = EvalContext { state: id, g, h: eval_to_h(new), preferred: false };
                if driver.open_list.is_dead_end(&ctx) {
                    search_space.mark_dead_end(id);
                    continue;
                }
                if new != old {
                    driver.open_list.insert(ctx);
                    continue;
                }
            }
        }
        search_space.close(id);
        break id;
    };

    ensure_hinlist(hin_lists, s);
    hin_lists[s].node_closed = true;
    if !driver.reopen_occurred {
        let tree_edge = search_space.get(s).tree_edge.map(|e| (e.parent, e.creating_op));
        hin_lists[s].update_ste_delta(s, search_space);
        hin_lists[s].create_list_from_set(tree_edge);
    }

    if !first_goal_reached && task.goal_test(s) {
        let cost = search_space.g(s);
        return Ok(AstarStatus::Solved { goal: s, cost });
    }

    let mut ops = task.generate_applicable_ops(s);
    driver.pruning.prune_operators(s, &mut ops);
    let g_s = search_space.g(s);

    for op in ops {
        let cost_op = task.operator_cost(op);
        if g_s + cost_op > target_cost_bound || g_s + cost_op >= hard_bound {
            continue;
        }

        let succ = task.get_successor_state(s, op);
        let succ = match &driver.symmetry {
            // Only OSS canonicalizes successors before insertion; DKS leaves the state space
            // un-canonicalized and detects duplicates via operator permutations instead (§6).
            Some(sym) if sym.mode() == crate::symmetry::SymmetryMode::Oss => sym.canonicalize(succ),
            _ => succ,
        };

        if first_goal_reached && switch_on_goal && task.goal_test(succ) {
            driver.goal_node_generated = true;
        }

        driver.evaluator.notify_state_transition(s, succ);

        if search_space.get(succ).is_dead_end() {
            continue;
        }

        let succ_g = g_s + cost_op;

        if search_space.get(succ).is_new() {
            let h = driver.evaluator.evaluate(succ, succ_g);
            let ctx = EvalContext { state: succ, g: succ_g, h: eval_to_h(h), preferred: false };
            if driver.open_list.is_dead_end(&ctx) {
                search_space.mark_dead_end(succ);
                continue;
            }
            search_space.open(succ, s, op, succ_g);
            driver.open_list.insert(ctx);

            ensure_hinlist(hin_lists, succ);
            hin_lists[succ].upsert(SideTrackEdge::new(s, op, succ, g_s, succ_g, cost_op));
        } else if search_space.g(succ) > succ_g {
            if search_space.get(succ).is_closed() {
                driver.reopen_occurred = true;
            }
            search_space.reopen(succ, s, op, succ_g);
            let h = driver.evaluator.evaluate(succ, succ_g);
            driver.open_list.insert(EvalContext { state: succ, g: succ_g, h: eval_to_h(h), preferred: false });

            ensure_hinlist(hin_lists, succ);
            hin_lists[succ].upsert(SideTrackEdge::new(s, op, succ, g_s, succ_g, cost_op));
            hin_lists[succ].node_closed = false;
        } else {
            let existing_g_to = search_space.g(succ);
            let ste = SideTrackEdge::new(s, op, succ, g_s, existing_g_to, cost_op);
            ste.check_delta_nonnegative()?;
            ensure_hinlist(hin_lists, succ);
            hin_lists[succ].upsert(ste);
            if !driver.reopen_occurred && hin_lists[succ].node_closed {
                hin_lists[succ].push_back_sorted(ste);
            }
        }
    }

    Ok(AstarStatus::InProgress)
}

/// Rebuilds every `HinList` from scratch after a reopen (§4.4 step 2): recomputes δ for the
/// closed states (open states keep `node_closed = false`, their sorted list stays undefined), and
/// leaves `HtreeList`s to the caller (they're simply cleared, not rebuilt, by the engine).
pub fn rebuild_hinlists_after_reopen(hin_lists: &mut HinLists, search_space: &mut SearchSpace, initial_state: StateId) {
    let len = hin_lists.len();
    for raw in 0..len {
        let s = StateId::from(raw as u32);
        let node = match search_space.get_opt(s) {
            Some(n) => n.clone(),
            None => continue,
        };
        hin_lists[s].node_closed = s == initial_state;
        if node.is_closed() {
            hin_lists[s].node_closed = true;
            hin_lists[s].update_ste_delta(s, search_space);
            let tree_edge = node.tree_edge.map(|e| (e.parent, e.creating_op));
            hin_lists[s].create_list_from_set(tree_edge);
        }
    }
}
