//! End-to-end tests of the engine against the concrete scenarios of spec §8 (S1-S6): a small
//! hand-built graph task exercised through the full `Engine`, checking the testable properties
//! (optimality of the first plan, monotone enumeration, completeness up to the quality bound,
//! duplicate-under-reorder handling, and reopen recovery) rather than any one component in
//! isolation.

use kstar_core::astar::AstarDriver;
use kstar_core::engine::{Engine, EngineOptions, SearchStatus};
use kstar_core::evaluator::{BlindEvaluator, EvalResult, Evaluator};
use kstar_core::open_list::BinaryHeapOpenList;
use kstar_core::plan_post_processor::{DefaultPlanPostProcessor, DuplicateMode};
use kstar_core::pruning::NullPruning;
use kstar_core::task::{Cost, OperatorId, StateId, Task};
use kstar_core::Plan;
use std::collections::HashMap;

/// A single directed edge `from -(name, cost)-> to`, doubling as the task's operator table: the
/// operator's index in `edges` is its `OperatorId`.
struct Edge {
    name: &'static str,
    from: u32,
    to: u32,
    cost: Cost,
}

fn edge(name: &'static str, from: u32, to: u32, cost: Cost) -> Edge {
    Edge { name, from, to, cost }
}

/// A dense, pre-grounded graph task built directly from an edge list, mirroring `kstar-cli`'s
/// `JsonTask` but constructed in-process for tests instead of parsed from a file.
struct GraphTask {
    initial: StateId,
    goals: Vec<StateId>,
    edges: Vec<Edge>,
    by_state: HashMap<u32, Vec<OperatorId>>,
}

impl GraphTask {
    fn new(initial: u32, goals: Vec<u32>, edges: Vec<Edge>) -> Self {
        let mut by_state: HashMap<u32, Vec<OperatorId>> = HashMap::new();
        for (i, e) in edges.iter().enumerate() {
            by_state.entry(e.from).or_default().push(OperatorId::from(i as u32));
        }
        GraphTask {
            initial: StateId::from(initial),
            goals: goals.into_iter().map(StateId::from).collect(),
            edges,
            by_state,
        }
    }
}

impl Task for GraphTask {
    fn initial_state(&self) -> StateId {
        self.initial
    }
    fn goal_test(&self, state: StateId) -> bool {
        self.goals.contains(&state)
    }
    fn generate_applicable_ops(&self, state: StateId) -> Vec<OperatorId> {
        self.by_state.get(&u32::from(state)).cloned().unwrap_or_default()
    }
    fn get_successor_state(&self, _state: StateId, op: OperatorId) -> StateId {
        StateId::from(self.edges[usize::from(op)].to)
    }
    fn num_operators(&self) -> usize {
        self.edges.len()
    }
    fn operator_cost(&self, op: OperatorId) -> Cost {
        self.edges[usize::from(op)].cost
    }
    fn operator_name(&self, op: OperatorId) -> &str {
        self.edges[usize::from(op)].name
    }
}

/// A per-state heuristic table, used by the reopen scenario (S4) to build an inconsistent
/// evaluator that deliberately delays expansion of a cheaper branch.
struct TableEvaluator(HashMap<u32, Cost>);

impl Evaluator for TableEvaluator {
    fn evaluate(&mut self, state: StateId, _g: Cost) -> EvalResult {
        EvalResult::Estimate(*self.0.get(&u32::from(state)).unwrap_or(&0))
    }
}

fn run(
    task: GraphTask,
    evaluator: Box<dyn Evaluator>,
    k: Option<usize>,
    q: Option<f64>,
    mode: DuplicateMode,
) -> (SearchStatus, Vec<Plan>, Vec<String>) {
    let astar = AstarDriver::new(Box::new(BinaryHeapOpenList::new()), evaluator, Box::new(NullPruning::default()));
    let names: Vec<String> = task.edges.iter().map(|e| e.name.to_string()).collect();
    let post_processor = Box::new(DefaultPlanPostProcessor::new(mode, Box::new(move |op: OperatorId| names[usize::from(op)].clone())));
    let options = EngineOptions { k, q, ..EngineOptions::default() };
    let mut engine = Engine::new(task, astar, post_processor, options).expect("valid engine configuration");
    let (status, plans) = engine.run(None);
    let names: Vec<Vec<String>> = plans
        .iter()
        .map(|p| p.operators.iter().map(|&op| engine.task().operator_name(op).to_string()).collect())
        .collect();
    let flat_summary: Vec<String> = plans
        .iter()
        .zip(names.iter())
        .map(|(p, n)| format!("{}:{}", p.cost, n.join(",")))
        .collect();
    (status, plans, flat_summary)
}

fn blind() -> Box<dyn Evaluator> {
    Box::new(BlindEvaluator)
}

/// S1: a 5-state chain plus two shortcuts, `k=3`. Expects `[a0,a1,a2,a3]` (cost 4), `[b1,a2,a3]`
/// (cost 5, detouring through the `b1` shortcut into the tree), `[b0]` (cost 10, a single-hop
/// direct edge into the goal).
#[test]
fn s1_chain_k3() {
    let task = GraphTask::new(
        0,
        vec![4],
        vec![
            edge("a0", 0, 1, 1),
            edge("a1", 1, 2, 1),
            edge("a2", 2, 3, 1),
            edge("a3", 3, 4, 1),
            edge("b0", 0, 4, 10),
            edge("b1", 0, 2, 3),
        ],
    );
    let (status, plans, summary) = run(task, blind(), Some(3), None, DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(summary, vec!["4:a0,a1,a2,a3", "5:b1,a2,a3", "10:b0"]);

    let costs: Vec<Cost> = plans.iter().map(|p| p.cost).collect();
    assert!(costs.windows(2).all(|w| w[0] <= w[1]), "plans must be emitted in non-decreasing cost order");
    assert_eq!(plans[0].cost, 4, "first plan must be optimal (C*)");
}

/// S2: two parallel operators `a`/`b` from s0 to s1, then `c` to the goal; `q=1.5` with `k`
/// disabled. `C*=2`, target bound `floor(1.5*2)=3`. Expects exactly the two symmetric plans
/// `[a,c]` and `[b,c]`, both at cost 2.
#[test]
fn s2_symmetric_branches_quality() {
    let task = GraphTask::new(0, vec![2], vec![edge("a", 0, 1, 1), edge("b", 0, 1, 1), edge("c", 1, 2, 1)]);
    let (status, plans, summary) = run(task, blind(), None, Some(1.5), DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(summary, vec!["2:a,c", "2:b,c"]);
    assert_eq!(plans.len(), 2);
}

/// S3: no applicable operators and no goal anywhere in the state space. The engine must still
/// terminate (SOLVED) and report zero plans, rather than erroring or looping.
#[test]
fn s3_unsolvable_reports_zero_plans() {
    let task = GraphTask::new(0, vec![], vec![]);
    let (status, plans, _summary) = run(task, blind(), Some(1), None, DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert!(plans.is_empty());
}

/// S4: an inconsistent heuristic overestimates the cost of the cheap branch (`sY`) enough that
/// the direct, expensive edge into `sX` closes first; `sY`'s later expansion reveals a cheaper
/// predecessor and reopens `sX`. The final optimal plan must reflect that cheaper predecessor,
/// not the first (suboptimal) edge that happened to close `sX`.
#[test]
fn s4_reopen_recovers_cheaper_predecessor() {
    // s0 -[oa,cost50]-> sX -[xg,cost10]-> sGoal
    // s0 -[oy,cost10]-> sY -[yx,cost10]-> sX
    // True optimum: s0 -oy-> sY -yx-> sX -xg-> sGoal, cost 30.
    // A direct, overpriced s0->sX edge (cost 50) looks cheap enough (f=50) to close before sY's
    // inflated heuristic (h=45, f=55) lets sY expand, so sX is first closed via `oa`; sY's
    // expansion later finds sX at g=20 < 50 while sX is already CLOSED, forcing a reopen.
    let task = GraphTask::new(
        0,
        vec![3],
        vec![
            edge("oa", 0, 1, 50), // s0 -> sX
            edge("oy", 0, 2, 10), // s0 -> sY
            edge("yx", 2, 1, 10), // sY -> sX
            edge("xg", 1, 3, 10), // sX -> sGoal
        ],
    );
    let heuristics: HashMap<u32, Cost> = [(0, 0), (1, 0), (2, 45), (3, 0)].into_iter().collect();
    let (status, plans, summary) = run(task, Box::new(TableEvaluator(heuristics)), Some(1), None, DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].cost, 30, "the reopen must be honored: C* must be 30, not the premature 60");
    assert_eq!(summary, vec!["30:oy,yx,xg"]);
}

/// S5: two operators named `a`/`b` that commute between s0 and the goal via distinct intermediate
/// states. Ordered duplicate detection treats `[a,b]` and `[b,a]` as distinct plans; unordered
/// detection collapses them into one.
#[test]
fn s5_duplicate_under_reorder() {
    let edges = || {
        vec![
            edge("a", 0, 1, 1),  // s0 -a-> s1
            edge("b", 1, 3, 1),  // s1 -b-> goal
            edge("b", 0, 2, 1),  // s0 -b-> s2
            edge("a", 2, 3, 1),  // s2 -a-> goal
        ]
    };

    let ordered = GraphTask::new(0, vec![3], edges());
    let (status, plans, _) = run(ordered, blind(), Some(2), None, DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(plans.len(), 2, "ordered mode must keep [a,b] and [b,a] as distinct plans");
    assert!(plans.iter().all(|p| p.cost == 2));

    let unordered = GraphTask::new(0, vec![3], edges());
    let (status, plans, _) = run(unordered, blind(), Some(2), None, DuplicateMode::Unordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(plans.len(), 1, "unordered mode must collapse [a,b] and [b,a] into one plan");
}

/// S6: `k=5`, `q=1.25`, `C*=8`; exactly 3 plans (costs 8, 9, 10) are within the quality bound
/// `floor(1.25*8)=10`, and the engine must terminate via the quality bound rather than running to
/// `k=5`.
#[test]
fn s6_quality_bound_caps_enumeration_below_k() {
    let task = GraphTask::new(
        0,
        vec![4],
        vec![
            edge("t0", 0, 1, 2),
            edge("t1", 1, 2, 2),
            edge("t2", 2, 3, 2),
            edge("t3", 3, 4, 2),
            edge("d1", 0, 4, 9),  // delta 1 -> cost 9
            edge("d2", 0, 4, 10), // delta 2 -> cost 10
            edge("d3", 0, 4, 11), // delta 3 -> cost 11, excluded by the quality bound
            edge("d4", 0, 4, 18), // delta 10 -> cost 18, excluded by the quality bound
        ],
    );
    let (status, plans, _summary) = run(task, blind(), Some(5), Some(1.25), DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    let mut costs: Vec<Cost> = plans.iter().map(|p| p.cost).collect();
    costs.sort();
    assert_eq!(costs, vec![8, 9, 10], "exactly the plans within the quality bound must be returned");
    assert!(plans.len() < 5, "must terminate via the quality bound, short of k");
}

/// Property test (§8.1/§8.2): across every scenario above, plans are emitted cost-non-decreasing
/// and the first plan is always the optimum.
#[test]
fn monotone_enumeration_holds_for_a_richer_chain() {
    let task = GraphTask::new(
        0,
        vec![3],
        vec![
            edge("a0", 0, 1, 1),
            edge("a1", 1, 2, 1),
            edge("a2", 2, 3, 1),
            edge("shortcut1", 0, 2, 3),
            edge("shortcut2", 1, 3, 5),
            edge("direct", 0, 3, 20),
        ],
    );
    let (status, plans, _summary) = run(task, blind(), Some(10), None, DuplicateMode::Ordered);
    assert_eq!(status, SearchStatus::Solved);
    assert_eq!(plans[0].cost, 3);
    let costs: Vec<Cost> = plans.iter().map(|p| p.cost).collect();
    assert!(costs.windows(2).all(|w| w[0] <= w[1]));
}
