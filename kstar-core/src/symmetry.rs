//! The (optional) structural-symmetry collaborator.
//!
//! Canonicalization, operator-permutation group computation, and the bliss graph-automorphism
//! backend are all out of scope (§1): this module only fixes the surface the A* driver and plan
//! decoder need when a symmetry reduction is plugged in.
//!
//! Two reduction modes are distinguished, matching the upstream planner:
//! - OSS (orbit-space search): successor states are canonicalized before insertion, so the search
//!   explores one representative per orbit.
//! - DKS (detect-and-keep-smallest or similar duplicate-pruning schemes): states are left
//!   un-canonicalized, but operator permutations are used to detect duplicates and to re-expand
//!   plans over the original (non-canonical) operator sequence.
use crate::task::{OperatorId, StateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryMode {
    Oss,
    Dks,
}

/// A single step of the permutation trace used to map a plan decoded over canonical states back
/// onto the original operator sequence.
#[derive(Debug, Clone, Copy)]
pub struct PermutedOperator {
    pub original: OperatorId,
    pub applied: OperatorId,
}

pub trait SymmetryCollaborator {
    fn mode(&self) -> SymmetryMode;

    /// Canonical representative of `state`, used by the A* driver before inserting a successor
    /// (OSS mode only).
    fn canonicalize(&self, state: StateId) -> StateId;

    /// Maps a plan decoded over canonical/surrogate states back to the concrete operator
    /// sequence that is actually applicable from the real initial state.
    fn translate_plan(&self, plan: &[OperatorId]) -> Vec<PermutedOperator>;
}
