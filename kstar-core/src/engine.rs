//! §4.4: the engine loop that interleaves A* bursts with Eppstein extraction bursts and enforces
//! the *k*/*q* termination criteria.

use crate::astar::{rebuild_hinlists_after_reopen, step_astar, AstarDriver, AstarStatus};
use crate::errors::ConfigError;
use crate::path_graph::{self, ensure_htreelist, HtreeLists, PathGraphNode};
use crate::plan::Plan;
use crate::plan_post_processor::PlanPostProcessor;
use crate::search_space::SearchSpace;
use crate::side_track_edge::HinLists;
use crate::task::{Cost, StateId, Task, INFINITE_COST};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use env_param::EnvParam;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default interval between intermediate-progress log lines, in seconds. Not exposed as a CLI
/// flag since it only affects logging verbosity, not search behavior.
static REPORT_PERIOD_SECS: EnvParam<u64> = EnvParam::new("KSTAR_REPORT_PERIOD_SECS", "540");

/// CLI-facing knobs (§6): everything the outer loop needs beyond the collaborators themselves.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// `k`: target plan count. `None` disables the count criterion (the C++ original's `k < 1`).
    pub k: Option<usize>,
    /// `q`: target quality ratio. `None` (or `< 1.0`) disables the quality criterion.
    pub q: Option<f64>,
    pub openlist_inc_percent_lb: u32,
    pub openlist_inc_percent_ub: u32,
    pub switch_on_goal: bool,
    pub restart_eppstein: bool,
    pub allow_greedy_k_plans_selection: bool,
    pub report_period: Duration,
    /// The hard cost bound (`bound` in the original; usually `INFINITE_COST`).
    pub hard_bound: Cost,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            k: None,
            q: None,
            openlist_inc_percent_lb: 1,
            openlist_inc_percent_ub: 5,
            switch_on_goal: false,
            restart_eppstein: true,
            allow_greedy_k_plans_selection: false,
            report_period: Duration::from_secs(REPORT_PERIOD_SECS.get()),
            hard_bound: INFINITE_COST,
        }
    }
}

impl EngineOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        let ignore_k = self.k.map(|k| k < 1).unwrap_or(true);
        let ignore_quality = self.q.map(|q| q < 1.0).unwrap_or(true);
        if ignore_k && ignore_quality {
            return Err(ConfigError::NoTerminationCriterion);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    InProgress,
    Solved,
    Timeout,
}

enum EppsteinStatus {
    InProgress,
    Solved,
    /// Cede control back to A*; the current top of the heap was not consumed.
    Failed,
}

/// Heap entry ordering a [`PathGraphNode`] by ascending `path_value`, ties broken by ascending
/// (earliest) `creation_time` (§3, Ordering).
struct EppsteinEntry(Rc<PathGraphNode>);

impl PartialEq for EppsteinEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.path_value == other.0.path_value && self.0.creation_time == other.0.creation_time
    }
}
impl Eq for EppsteinEntry {}
impl PartialOrd for EppsteinEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for EppsteinEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.path_value.cmp(&other.0.path_value).then(self.0.creation_time.cmp(&other.0.creation_time))
    }
}

/// The top-k planner, generic over the planning task it searches.
pub struct Engine<T: Task> {
    task: T,
    search_space: SearchSpace,
    hin_lists: HinLists,
    htree_lists: HtreeLists,
    astar: AstarDriver,
    post_processor: Box<dyn PlanPostProcessor>,
    options: EngineOptions,

    outer_step_iter: i64,
    initial_state: StateId,
    goal_state: Option<StateId>,
    first_goal_reached: bool,
    optimal_cost: Cost,
    target_cost_bound: Cost,
    ignore_k: bool,
    ignore_quality: bool,
    number_of_plans: usize,
    min_f_open_list: Option<Cost>,
    eppstein_thr: Cost,
    eppstein_heap: BinaryHeap<Reverse<EppsteinEntry>>,
    goal_root: Option<Rc<PathGraphNode>>,
    pending_decode: Vec<Rc<PathGraphNode>>,
    next_creation_time: u64,
    expanded: u64,
    step_astar_iter_after_reopen: u64,

    start: Instant,
    previous_report_at: Instant,
    previous_number_of_plans: usize,
}

impl<T: Task> Engine<T> {
    pub fn new(task: T, astar: AstarDriver, post_processor: Box<dyn PlanPostProcessor>, options: EngineOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let ignore_k = options.k.map(|k| k < 1).unwrap_or(true);
        let ignore_quality = options.q.map(|q| q < 1.0).unwrap_or(true);
        let now = Instant::now();
        Ok(Engine {
            initial_state: task.initial_state(),
            task,
            search_space: SearchSpace::new(),
            hin_lists: HinLists::default(),
            htree_lists: HtreeLists::default(),
            astar,
            post_processor,
            options,
            outer_step_iter: 0,
            goal_state: None,
            first_goal_reached: false,
            optimal_cost: INFINITE_COST,
            target_cost_bound: INFINITE_COST,
            ignore_k,
            ignore_quality,
            number_of_plans: 0,
            min_f_open_list: None,
            eppstein_thr: -1,
            eppstein_heap: BinaryHeap::new(),
            goal_root: None,
            pending_decode: Vec::new(),
            next_creation_time: 0,
            expanded: 0,
            step_astar_iter_after_reopen: 0,
            start: now,
            previous_report_at: now,
            previous_number_of_plans: 0,
        })
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn initialize(&mut self) {
        tracing::info!(k = ?self.options.k, q = ?self.options.q, "initializing top-k search");
        self.astar.initialize(&self.task, &mut self.search_space);
    }

    /// Runs the engine to completion (or until `deadline` elapses), returning the decoded plans
    /// in emission order (non-decreasing cost, §8 I-MONO).
    pub fn run(&mut self, deadline: Option<Duration>) -> (SearchStatus, Vec<Plan>) {
        self.initialize();
        let mut status = SearchStatus::InProgress;
        while status == SearchStatus::InProgress {
            status = self.step();
            if let Some(d) = deadline {
                if self.start.elapsed() >= d {
                    status = SearchStatus::Timeout;
                }
            }
        }
        (status, self.decode_pending_plans())
    }

    fn threshold_admits_extraction(&self) -> bool {
        if self.options.restart_eppstein {
            self.eppstein_thr + self.optimal_cost <= self.min_f_open_list.unwrap_or(INFINITE_COST)
        } else {
            self.eppstein_thr + self.optimal_cost < self.min_f_open_list.unwrap_or(INFINITE_COST)
        }
    }

    /// One outer iteration: an A* burst, a reopen-triggered rebuild if needed, then an Eppstein
    /// burst (§4.4).
    fn step(&mut self) -> SearchStatus {
        self.astar.reopen_occurred = false;
        self.astar.goal_node_generated = false;
        self.outer_step_iter += 1;

        if !self.astar.open_list.is_empty() {
            self.min_f_open_list = self.astar.open_list.peek_min_f();
            let mut step_astar_iter: u64 = 0;
            self.step_astar_iter_after_reopen = 0;

            let target_steps_low = (self.expanded as f64 * self.options.openlist_inc_percent_lb as f64 / 100.0).floor().max(1.0) as u64;
            let target_steps_upper = (self.expanded as f64 * self.options.openlist_inc_percent_ub as f64 / 100.0).floor().max(1.0) as u64;

            loop {
                let astar_status = match step_astar(
                    &mut self.astar,
                    &self.task,
                    &mut self.search_space,
                    &mut self.hin_lists,
                    self.first_goal_reached,
                    self.target_cost_bound,
                    self.options.hard_bound,
                    self.options.switch_on_goal,
                ) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(error = %e, "internal invariant violated during A* expansion");
                        return SearchStatus::Timeout;
                    }
                };
                step_astar_iter += 1;
                self.step_astar_iter_after_reopen += 1;
                if !matches!(astar_status, AstarStatus::Failed) {
                    self.expanded += 1;
                }
                self.min_f_open_list = self.astar.open_list.peek_min_f();

                match astar_status {
                    AstarStatus::Solved { goal, cost } => {
                        self.goal_state = Some(goal);
                        self.optimal_cost = cost;
                        self.first_goal_reached = true;
                        tracing::info!(cost, iter = self.outer_step_iter, "optimal plan found");
                        if !self.ignore_quality {
                            self.target_cost_bound = (self.options.q.unwrap() * self.optimal_cost as f64).floor() as Cost;
                        } else {
                            self.target_cost_bound = self.options.hard_bound;
                        }
                        self.number_of_plans = 1;
                        self.post_processor.add_plan_if_necessary(&Plan::new(cost, self.search_space.tree_plan_to(goal)));
                        if !self.ignore_k && self.number_of_plans >= self.options.k.unwrap() {
                            tracing::info!(plans = self.number_of_plans, "terminating: plan count reached during first A* burst");
                            return SearchStatus::Solved;
                        }
                    }
                    AstarStatus::Failed => {
                        if !self.first_goal_reached {
                            self.number_of_plans = 0;
                            tracing::info!("A* exhausted the open list with no goal: task is unsolvable");
                            return SearchStatus::Solved;
                        }
                        break;
                    }
                    AstarStatus::InProgress => {}
                }

                if self.first_goal_reached {
                    if !self.ignore_quality && self.target_cost_bound < self.min_f_open_list.unwrap_or(INFINITE_COST) {
                        break;
                    }
                    if !self.ignore_k {
                        if step_astar_iter == target_steps_upper as u64 || (self.options.switch_on_goal && self.astar.goal_node_generated) {
                            break;
                        }
                        if !self.astar.reopen_occurred {
                            if self.eppstein_thr >= 0 {
                                if self.threshold_admits_extraction() {
                                    break;
                                }
                            } else if step_astar_iter >= target_steps_low {
                                break;
                            }
                        } else if self.step_astar_iter_after_reopen >= target_steps_low {
                            if self.eppstein_thr < 0 || self.threshold_admits_extraction() {
                                break;
                            }
                        }
                    }
                }

                if self.astar.open_list.is_empty() {
                    break;
                }
            }
        }

        if self.astar.reopen_occurred {
            tracing::debug!("reopen occurred this burst: rebuilding HinLists and clearing HtreeLists");
            rebuild_hinlists_after_reopen(&mut self.hin_lists, &mut self.search_space, self.initial_state);
            self.htree_lists = HtreeLists::default();
            self.eppstein_heap.clear();
            self.goal_root = None;
        }

        self.initialize_eppstein();

        if !self.eppstein_heap.is_empty() {
            loop {
                match self.step_eppstein() {
                    EppsteinStatus::Solved => {
                        tracing::info!(plans = self.number_of_plans, iter = self.outer_step_iter, "step_eppstein: target met");
                        return SearchStatus::Solved;
                    }
                    EppsteinStatus::Failed => break,
                    EppsteinStatus::InProgress => {}
                }
            }
        }

        if self.eppstein_heap.is_empty() {
            if self.astar.open_list.is_empty() {
                tracing::info!(plans = self.number_of_plans, "terminating: both queues exhausted");
                return SearchStatus::Solved;
            }
            if !self.ignore_quality && self.target_cost_bound < self.min_f_open_list.unwrap_or(INFINITE_COST) {
                tracing::info!(plans = self.number_of_plans, "terminating: quality bound below A* lower bound");
                return SearchStatus::Solved;
            }
        }

        self.report_intermediate_plans();
        SearchStatus::InProgress
    }

    /// Seeds (or confirms) `goal_root` at the current goal state (§4.3.1's `initialize_eppstein`).
    fn initialize_eppstein(&mut self) {
        let goal = match self.goal_state {
            Some(g) => g,
            None => return,
        };

        path_graph::build_htree_list(
            goal,
            &self.search_space,
            &self.hin_lists,
            &mut self.htree_lists,
            self.optimal_cost,
            self.min_f_open_list,
            self.options.restart_eppstein,
            self.outer_step_iter,
        );

        if !self.options.restart_eppstein && !self.eppstein_heap.is_empty() {
            return;
        }

        self.eppstein_heap.clear();
        self.pending_decode.clear();
        self.goal_root = None;
        self.number_of_plans = 1;
        self.post_processor.clear();
        // `clear()` also forgets the optimal plan registered at goal-discovery time (outside this
        // function); re-seed it so every reseed keeps plan #1 in the accepted set.
        self.post_processor
            .add_plan_if_necessary(&Plan::new(self.optimal_cost, self.search_space.tree_plan_to(goal)));

        ensure_htreelist(&mut self.htree_lists, goal);
        match path_graph::goal_root(goal, &self.htree_lists, &self.hin_lists, self.next_creation_time) {
            Ok(Some(root)) => {
                self.next_creation_time += 1;
                self.goal_root = Some(Rc::clone(&root));
                let admit = if self.astar.open_list.is_empty() {
                    true
                } else if self.options.restart_eppstein {
                    root.path_value + self.optimal_cost <= self.min_f_open_list.unwrap_or(INFINITE_COST)
                } else {
                    root.path_value + self.optimal_cost < self.min_f_open_list.unwrap_or(INFINITE_COST)
                };
                if admit {
                    self.eppstein_heap.push(Reverse(EppsteinEntry(root)));
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "invariant violated while seeding the Eppstein heap"),
        }
    }

    fn step_eppstein(&mut self) -> EppsteinStatus {
        let top = match self.eppstein_heap.peek() {
            Some(Reverse(entry)) => Rc::clone(&entry.0),
            None => return EppsteinStatus::Failed,
        };

        let children = match path_graph::generate_children(
            &top,
            &self.search_space,
            &self.hin_lists,
            &mut self.htree_lists,
            self.optimal_cost,
            self.min_f_open_list,
            self.options.restart_eppstein,
            self.outer_step_iter,
            self.ignore_quality,
            self.target_cost_bound,
            &mut self.next_creation_time,
        ) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "invariant violated while generating Eppstein children");
                return EppsteinStatus::Failed;
            }
        };

        if self.options.restart_eppstein {
            self.eppstein_thr = top.path_value;
        } else {
            for ch in &children {
                self.eppstein_thr = self.eppstein_thr.max(ch.path_value);
            }
        }

        let thr_gt_bound = if !self.options.restart_eppstein {
            self.optimal_cost + self.eppstein_thr >= self.min_f_open_list.unwrap_or(INFINITE_COST)
        } else if self.options.allow_greedy_k_plans_selection && !self.ignore_quality {
            self.optimal_cost + self.eppstein_thr > self.target_cost_bound
        } else {
            self.optimal_cost + self.eppstein_thr > self.min_f_open_list.unwrap_or(INFINITE_COST)
        };

        if !self.astar.open_list.is_empty() && thr_gt_bound {
            return EppsteinStatus::Failed;
        }

        self.eppstein_heap.pop();

        if top.path_value + self.optimal_cost <= self.target_cost_bound {
            if self.post_processor.decode_plans_upfront() {
                let ops = path_graph::decode_plan(&top, &self.search_space, self.initial_state, self.goal_state.unwrap());
                let plan = Plan::new(self.optimal_cost + top.path_value, ops);
                self.number_of_plans += self.post_processor.add_plan_if_necessary(&plan);
            } else {
                self.pending_decode.push(Rc::clone(&top));
                self.number_of_plans += 1;
            }
            for ch in children {
                self.eppstein_heap.push(Reverse(EppsteinEntry(ch)));
            }
        }

        if !self.ignore_k && self.number_of_plans >= self.options.k.unwrap_or(usize::MAX) {
            return EppsteinStatus::Solved;
        }
        if !self.ignore_quality && self.target_cost_bound < self.optimal_cost + self.eppstein_thr {
            return EppsteinStatus::Solved;
        }
        EppsteinStatus::InProgress
    }

    /// Decodes every plan stashed by `step_eppstein` when `decode_plans_upfront()` is false,
    /// registering each with the post-processor and returning the accepted set in extraction
    /// order (still non-decreasing cost, since extraction order already is).
    fn decode_pending_plans(&mut self) -> Vec<Plan> {
        let goal = match self.goal_state {
            Some(g) => g,
            None => return Vec::new(),
        };
        if !self.post_processor.decode_plans_upfront() {
            for node in std::mem::take(&mut self.pending_decode) {
                let ops = path_graph::decode_plan(&node, &self.search_space, self.initial_state, goal);
                let plan = Plan::new(self.optimal_cost + node.path_value, ops);
                self.post_processor.add_plan_if_necessary(&plan);
            }
        }
        self.post_processor.accepted_plans()
    }

    fn report_intermediate_plans(&mut self) {
        if self.previous_report_at.elapsed() >= self.options.report_period && self.number_of_plans > self.previous_number_of_plans {
            tracing::info!(iter = self.outer_step_iter, plans = self.number_of_plans, "intermediate progress");
            self.previous_number_of_plans = self.number_of_plans;
            self.previous_report_at = Instant::now();
        }
    }
}
