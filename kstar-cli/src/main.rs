//! Command-line front-end for the top-k / top-quality planner core.
//!
//! Task parsing and grounding are out of scope for `kstar_core` (see `kstar_core::task`), so this
//! binary reads a minimal JSON task description instead of PDDL: a dense, pre-grounded state
//! graph with integer state ids. This is enough to exercise the full engine end to end without
//! pulling in a PDDL front end.

use anyhow::{Context, Result};
use kstar_core::astar::AstarDriver;
use kstar_core::engine::{Engine, EngineOptions};
use kstar_core::evaluator::BlindEvaluator;
use kstar_core::open_list::BinaryHeapOpenList;
use kstar_core::plan_manager::{FilePlanManager, PlanManager};
use kstar_core::plan_post_processor::{DefaultPlanPostProcessor, DuplicateMode};
use kstar_core::pruning::NullPruning;
use kstar_core::task::{Cost, OperatorId, StateId, Task};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use structopt::StructOpt;

/// K* search (eager): finds the `k` cheapest plans (or every plan within a `q` quality bound) for
/// a pre-grounded planning task.
#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "kstar", rename_all = "kebab-case")]
struct Opt {
    /// Path to the task's JSON description.
    problem: PathBuf,

    /// Number of plans, default -1 (disabled).
    #[structopt(long, default_value = "-1")]
    k: i64,
    /// Quality bound; if 0.0, quality is not checked.
    #[structopt(long, default_value = "0.0")]
    q: f64,
    #[structopt(long, default_value = "1")]
    openlist_inc_percent_lb: u32,
    #[structopt(long, default_value = "5")]
    openlist_inc_percent_ub: u32,
    /// Switch to Eppstein extraction as soon as A* regenerates the goal.
    #[structopt(long)]
    switch_on_goal: bool,
    /// Disable restarting Eppstein from the goal's HtreeList each burst (default: restart,
    /// i.e. extract plans more eagerly with strict threshold comparisons).
    #[structopt(long)]
    no_restart_eppstein: bool,
    /// Don't dump plan files as they're found.
    #[structopt(long)]
    no_dump_plans: bool,
    /// Report the number of plans found so far, every this many seconds.
    #[structopt(long, default_value = "540")]
    report_period: u64,
    /// Treat reorderings of the same plan as duplicates.
    #[structopt(long)]
    find_unordered_plans: bool,
    /// Allow returning any k out of the top-q plans (skips the strict `delta + C* <= target_cost_bound` gate).
    #[structopt(long)]
    allow_greedy_k_plans_selection: bool,
    /// A path to dump the full accepted plan set as a single JSON document.
    #[structopt(long)]
    json_file_to_dump: Option<PathBuf>,
    /// A regex of action names whose relative order is preserved by duplicate detection; all
    /// other actions are treated as an unordered multiset.
    #[structopt(long)]
    preserve_orders_actions_regex: Option<String>,

    /// Logging level: one of "error", "warn", "info", "debug", "trace".
    #[structopt(short, long, default_value = "info")]
    log_level: tracing::Level,
}

#[derive(Debug, Deserialize)]
struct JsonOperator {
    name: String,
    from: u32,
    to: u32,
    cost: Cost,
}

#[derive(Debug, Deserialize)]
struct JsonTaskFile {
    initial: u32,
    goals: Vec<u32>,
    operators: Vec<JsonOperator>,
}

/// A dense, pre-grounded task: operators applicable in state `s` are exactly those whose `from`
/// equals `s`.
struct JsonTask {
    initial: StateId,
    goals: Vec<StateId>,
    operators: Vec<JsonOperator>,
    by_state: Vec<Vec<OperatorId>>,
}

impl JsonTask {
    fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading task file {}", path.display()))?;
        let file: JsonTaskFile = serde_json::from_str(&text).context("parsing task JSON")?;
        let num_states = file
            .operators
            .iter()
            .flat_map(|op| [op.from, op.to])
            .chain(file.goals.iter().copied())
            .chain(std::iter::once(file.initial))
            .max()
            .map(|m| m as usize + 1)
            .unwrap_or(1);
        let mut by_state = vec![Vec::new(); num_states];
        for (i, op) in file.operators.iter().enumerate() {
            by_state[op.from as usize].push(OperatorId::from(i as u32));
        }
        Ok(JsonTask {
            initial: StateId::from(file.initial),
            goals: file.goals.into_iter().map(StateId::from).collect(),
            operators: file.operators,
            by_state,
        })
    }
}

impl Task for JsonTask {
    fn initial_state(&self) -> StateId {
        self.initial
    }

    fn goal_test(&self, state: StateId) -> bool {
        self.goals.contains(&state)
    }

    fn generate_applicable_ops(&self, state: StateId) -> Vec<OperatorId> {
        self.by_state[usize::from(state)].clone()
    }

    fn get_successor_state(&self, _state: StateId, op: OperatorId) -> StateId {
        StateId::from(self.operators[usize::from(op)].to)
    }

    fn num_operators(&self) -> usize {
        self.operators.len()
    }

    fn operator_cost(&self, op: OperatorId) -> Cost {
        self.operators[usize::from(op)].cost
    }

    fn operator_name(&self, op: OperatorId) -> &str {
        &self.operators[usize::from(op)].name
    }
}

fn main() -> Result<()> {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));

    let opt: Opt = Opt::from_args();

    let subscriber = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::Uptime::from(std::time::Instant::now()))
        .with_max_level(opt.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let task = JsonTask::load(&opt.problem)?;

    let astar = AstarDriver::new(Box::new(BinaryHeapOpenList::new()), Box::new(BlindEvaluator), Box::new(NullPruning::default()));

    let mode = match &opt.preserve_orders_actions_regex {
        Some(pattern) => DuplicateMode::PreserveMatching(Regex::new(pattern).context("compiling preserve_orders_actions_regex")?),
        None if opt.find_unordered_plans => DuplicateMode::Unordered,
        None => DuplicateMode::Ordered,
    };
    let names: Vec<String> = task.operators.iter().map(|op| op.name.clone()).collect();
    let post_processor = Box::new(DefaultPlanPostProcessor::new(mode, Box::new(move |op: OperatorId| names[usize::from(op)].clone())));

    let options = EngineOptions {
        k: if opt.k < 1 { None } else { Some(opt.k as usize) },
        q: if opt.q < 1.0 { None } else { Some(opt.q) },
        openlist_inc_percent_lb: opt.openlist_inc_percent_lb,
        openlist_inc_percent_ub: opt.openlist_inc_percent_ub,
        switch_on_goal: opt.switch_on_goal,
        restart_eppstein: !opt.no_restart_eppstein,
        allow_greedy_k_plans_selection: opt.allow_greedy_k_plans_selection,
        report_period: std::time::Duration::from_secs(opt.report_period),
        ..EngineOptions::default()
    };

    let mut engine = Engine::new(task, astar, post_processor, options).context("invalid engine configuration")?;
    let (status, plans) = engine.run(None);
    tracing::info!(?status, plans = plans.len(), "search finished");

    if !opt.no_dump_plans {
        let task = engine.task();
        let mut manager = FilePlanManager::new("found_plans", "sas_plan");
        let mut manager = if let Some(json_path) = &opt.json_file_to_dump {
            manager.with_json_file(json_path)
        } else {
            manager
        };
        for (i, plan) in plans.iter().enumerate() {
            manager.write_plan(i + 1, plan, task)?;
        }
        manager.write_json(&plans, task)?;
    }

    Ok(())
}
