//! The pruning-method collaborator: operator-level pruning applied before expansion.
//!
//! Concrete pruning strategies (stubborn sets, landmark-based pruning, ...) are out of scope;
//! this module fixes the interface and a null default that prunes nothing.

use crate::task::{OperatorId, StateId, Task};

pub trait PruningMethod {
    fn initialize(&mut self, task: &dyn Task);

    /// Filters `ops` in place, removing operators that pruning rules out at `state`.
    fn prune_operators(&mut self, state: StateId, ops: &mut Vec<OperatorId>);

    /// True iff pruning has ever actually discarded an operator. Used by the engine to decide,
    /// after the first goal, whether it is safe to disable pruning and skip reorder-based plan
    /// extension (§6, Pruning collaborator).
    fn was_pruned(&self) -> bool;

    fn was_pruning_disabled(&self) -> bool;

    fn disable_pruning(&mut self);
}

/// Prunes nothing, ever. The engine's default when no pruning method is configured.
#[derive(Default)]
pub struct NullPruning {
    disabled: bool,
}

impl PruningMethod for NullPruning {
    fn initialize(&mut self, _task: &dyn Task) {}

    fn prune_operators(&mut self, _state: StateId, _ops: &mut Vec<OperatorId>) {}

    fn was_pruned(&self) -> bool {
        false
    }

    fn was_pruning_disabled(&self) -> bool {
        self.disabled
    }

    fn disable_pruning(&mut self) {
        self.disabled = true;
    }
}
