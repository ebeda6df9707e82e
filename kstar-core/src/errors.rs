//! Error taxonomy (§7): configuration errors are surfaced immediately; invariant violations are
//! fatal bugs, never expected to fire outside debug builds; timeouts are a distinct, recoverable
//! status rather than an error (see [`crate::engine::SearchStatus`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither a plan count (k) nor a quality bound (q) is enabled; at least one is required")]
    NoTerminationCriterion,
    #[error("lazy evaluator {0} does not cache its estimates, which step_astar's revalidation requires")]
    LazyEvaluatorDoesNotCache(String),
    #[error("symmetry mode {0:?} is incompatible with restart_eppstein={1}")]
    IncompatibleSymmetryOption(crate::symmetry::SymmetryMode, bool),
}

/// Violation of an internal invariant the engine asserts continuously (§7): every STE delta is
/// non-negative, every `PathGraphNode::path_value` is non-negative, and every decoded plan
/// reaches a goal state. Surfacing these as a typed error (rather than only `debug_assert!`)
/// lets release builds fail loudly instead of silently returning a wrong plan.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("negative delta {delta} on side-track edge ({from:?}, {op:?}, {to:?})")]
    NegativeDelta {
        from: crate::task::StateId,
        op: crate::task::OperatorId,
        to: crate::task::StateId,
        delta: crate::task::Cost,
    },
    #[error("negative path_value {0} on an Eppstein node")]
    NegativePathValue(crate::task::Cost),
    #[error("decoded plan does not reach a goal state")]
    PlanDoesNotReachGoal,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("I/O error while persisting plans: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize plans to JSON: {0}")]
    Json(#[from] serde_json::Error),
}
