//! The task collaborator: a classical planning task as seen by the search engine.
//!
//! Grounding, PDDL parsing, and state representation are explicitly out of scope (they live
//! upstream, in whatever front-end constructs a [`Task`] implementation). The engine only needs
//! the handful of operations below to drive A* and to decode plans.

use kstar_collections::create_ref_type;

create_ref_type!(StateId);
create_ref_type!(OperatorId);

/// Non-negative operator costs, and path/delta values accumulated from them.
///
/// Signed so that arithmetic such as `g_from + cost_op - g_to` (an STE's delta) can be computed
/// without first proving non-negativity; callers assert `>= 0` where the spec requires it.
pub type Cost = i64;

/// Sentinel for "unreachable" / "no bound". Kept well clear of overflow so that `C* + bound`
/// arithmetic never wraps.
pub const INFINITE_COST: Cost = Cost::MAX / 4;

/// A classical planning task: initial state, goal test, and operator application.
///
/// Implementations are expected to be cheap to query repeatedly (the A* driver calls
/// `generate_applicable_operators` once per expansion) and to hand out stable [`StateId`]s, i.e.
/// the same state always maps to the same id for the lifetime of the engine.
pub trait Task {
    fn initial_state(&self) -> StateId;

    fn goal_test(&self, state: StateId) -> bool;

    /// Operators applicable in `state`, before any pruning is applied.
    fn generate_applicable_ops(&self, state: StateId) -> Vec<OperatorId>;

    /// The state reached by applying `op` in `state`. Only called for operators returned by
    /// `generate_applicable_ops`.
    fn get_successor_state(&self, state: StateId, op: OperatorId) -> StateId;

    fn num_operators(&self) -> usize;

    fn operator_cost(&self, op: OperatorId) -> Cost;

    fn operator_name(&self, op: OperatorId) -> &str;
}
