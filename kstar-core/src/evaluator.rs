//! The evaluator collaborator: heuristic estimates used to order the A* open list.
//!
//! Full heuristic implementations (h^add, landmark counting, pattern databases, ...) are out of
//! scope for this crate; this module only fixes the interface the A* driver programs against,
//! plus a minimal blind evaluator used in tests and as a degenerate default (uniform-cost search).

use crate::task::{Cost, StateId};

/// Result of evaluating a state: either a finite estimate or a proof of dead-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalResult {
    Estimate(Cost),
    DeadEnd,
}

impl EvalResult {
    pub fn is_dead_end(self) -> bool {
        matches!(self, EvalResult::DeadEnd)
    }
}

/// A heuristic evaluator, queried with the current `g` value of the state being scored.
///
/// `is_lazy` marks evaluators whose estimate is computed from a cheap proxy at insertion time and
/// must be revalidated (recomputed) when the node is popped off the open list, mirroring the
/// "lazy evaluator" path of the A* driver (see `step_astar`'s precondition in the spec). A lazy
/// evaluator must cache its last estimate so the driver can detect whether revalidation changed
/// it; see [`LazyEvaluator::cached_estimate`].
pub trait Evaluator {
    fn evaluate(&mut self, state: StateId, g: Cost) -> EvalResult;

    fn is_lazy(&self) -> bool {
        false
    }

    /// Called once, before the first `evaluate`, when the initial state is seen (§6: the
    /// evaluator "may be path-dependent and notified on initial-state seen and on state
    /// transitions").
    fn notify_initial_state(&mut self, _state: StateId) {}

    /// Called on every state transition A* generates, for evaluators whose estimate depends on
    /// the path taken rather than only on the state reached.
    fn notify_state_transition(&mut self, _parent: StateId, _child: StateId) {}

    /// The estimate this evaluator handed out the last time it was queried for `state`, if it
    /// caches. `step_astar`'s revalidation of lazy evaluators requires this to return `Some` for
    /// any `state` that was previously inserted into the open list; see
    /// [`LazyEvaluator`], a marker for evaluators that uphold that contract.
    fn cached_estimate(&self, _state: StateId) -> Option<EvalResult> {
        None
    }
}

/// Marker for evaluators that uphold the `cached_estimate` contract `is_lazy` promises. Nothing
/// beyond `Evaluator` is required structurally; this exists so configuration validation
/// (`ConfigError::LazyEvaluatorDoesNotCache`) has a trait to check against at wiring time.
pub trait LazyEvaluator: Evaluator {}

/// Blind evaluator: `h = 0` everywhere. Turns A* into plain uniform-cost (Dijkstra) search.
///
/// Useful for tests of the core search/Eppstein machinery where the heuristic's quality is
/// irrelevant to what's being tested, and as the simplest possible f-evaluator.
#[derive(Default)]
pub struct BlindEvaluator;

impl Evaluator for BlindEvaluator {
    fn evaluate(&mut self, _state: StateId, _g: Cost) -> EvalResult {
        EvalResult::Estimate(0)
    }
}
