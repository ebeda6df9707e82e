//! The plan post-processor collaborator: duplicate detection (and, upstream, symmetric-plan
//! extension and reorder enumeration, both out of scope here — see §1).
//!
//! The engine hands every decoded [`Plan`] to `add_plan_if_necessary`, which is responsible for
//! deciding whether the plan is actually new (under some notion of plan equivalence) and, if so,
//! registering it. The notion of equivalence is the one piece of this collaborator that is in
//! scope: §6 names three canonical forms, selected by [`DuplicateMode`].
//!
//! Full reordering-enumeration and symmetry-based plan extension (turning one canonical plan into
//! several concrete ones) are out of scope; [`PlanPostProcessor::extend_plan`] defaults to
//! returning the plan unchanged, and a caller that wires in a real extender is expected to
//! override it.

use crate::errors::EngineError;
use crate::plan::Plan;
use crate::plan_manager::PlanManager;
use crate::symmetry::SymmetryCollaborator;
use crate::task::{OperatorId, Task};
use regex::Regex;
use std::collections::HashSet;

/// Canonical form used to decide whether two plans are "the same" plan.
pub enum DuplicateMode {
    /// Plans are distinct iff their operator sequences differ (`find_unordered_plans = false`).
    Ordered,
    /// Plans are distinct iff their operator multisets differ (`find_unordered_plans = true`).
    Unordered,
    /// Hybrid: operators whose name matches `regex` keep their relative order in the canonical
    /// key; all others are treated as an unordered multiset. This is the
    /// `preserve_orders_actions_regex` option.
    PreserveMatching(Regex),
}

pub trait PlanPostProcessor {
    /// Registers `plan` if no equivalent plan has been seen before.
    ///
    /// Returns the number of genuinely new plans contributed (usually 0 or 1; an extending
    /// post-processor may contribute more than one concrete plan per canonical plan).
    fn add_plan_if_necessary(&mut self, plan: &Plan) -> usize;

    /// Expands a canonical plan into the concrete plans it represents. The default processor
    /// performs no reordering/symmetry extension and returns `plan` unchanged.
    fn extend_plan(&self, plan: Plan) -> Vec<Plan> {
        vec![plan]
    }

    fn clear(&mut self);

    fn decode_plans_upfront(&self) -> bool {
        false
    }

    fn is_dump_plans(&self) -> bool {
        true
    }

    /// Every plan accepted so far, in acceptance order. The engine calls this once at the end of
    /// a run to hand the caller the final plan set.
    fn accepted_plans(&self) -> Vec<Plan> {
        Vec::new()
    }

    /// Persists the accepted plans through `manager`, if `is_dump_plans()`. The default writes
    /// every accepted plan as file `<n>` (1-based) plus the JSON document, when configured.
    fn save_plans(&self, manager: &mut dyn PlanManager, task: &dyn Task) -> Result<(), EngineError> {
        if !self.is_dump_plans() {
            return Ok(());
        }
        let plans = self.accepted_plans();
        for (i, plan) in plans.iter().enumerate() {
            manager.write_plan(i + 1, plan, task)?;
        }
        manager.write_json(&plans, task)?;
        Ok(())
    }
}

fn canonical_key(plan: &Plan, mode: &DuplicateMode, name_of: &dyn Fn(OperatorId) -> String) -> Vec<String> {
    match mode {
        DuplicateMode::Ordered => plan.operators.iter().map(|&op| name_of(op)).collect(),
        DuplicateMode::Unordered => {
            let mut names: Vec<String> = plan.operators.iter().map(|&op| name_of(op)).collect();
            names.sort();
            names
        }
        DuplicateMode::PreserveMatching(re) => {
            // Operators matching the regex keep their position (tagged with their index so that
            // two plans only coincide if the matching operators appear in the same relative
            // order); everything else collapses into an unordered bucket.
            let mut ordered = Vec::new();
            let mut unordered = Vec::new();
            for (idx, &op) in plan.operators.iter().enumerate() {
                let name = name_of(op);
                if re.is_match(&name) {
                    ordered.push(format!("#{idx}:{name}"));
                } else {
                    unordered.push(name);
                }
            }
            unordered.sort();
            ordered.extend(unordered);
            ordered
        }
    }
}

/// The in-scope plan post-processor: deduplicates plans per [`DuplicateMode`], optionally passing
/// each plan through a [`SymmetryCollaborator`] first so that symmetric duplicates (differing only
/// by an operator permutation) are also collapsed.
pub struct DefaultPlanPostProcessor {
    mode: DuplicateMode,
    symmetry: Option<Box<dyn SymmetryCollaborator>>,
    seen: HashSet<Vec<String>>,
    accepted: Vec<Plan>,
    name_of: Box<dyn Fn(OperatorId) -> String>,
}

impl DefaultPlanPostProcessor {
    pub fn new(mode: DuplicateMode, name_of: Box<dyn Fn(OperatorId) -> String>) -> Self {
        DefaultPlanPostProcessor {
            mode,
            symmetry: None,
            seen: HashSet::new(),
            accepted: Vec::new(),
            name_of,
        }
    }

    pub fn with_symmetry(mut self, symmetry: Box<dyn SymmetryCollaborator>) -> Self {
        self.symmetry = Some(symmetry);
        self
    }

    pub fn accepted_plans(&self) -> &[Plan] {
        &self.accepted
    }
}

impl PlanPostProcessor for DefaultPlanPostProcessor {
    fn add_plan_if_necessary(&mut self, plan: &Plan) -> usize {
        let translated;
        let plan_for_key = if let Some(sym) = &self.symmetry {
            let ops: Vec<OperatorId> = sym.translate_plan(&plan.operators).into_iter().map(|p| p.original).collect();
            translated = Plan::new(plan.cost, ops);
            &translated
        } else {
            plan
        };
        let key = canonical_key(plan_for_key, &self.mode, &*self.name_of);
        if self.seen.insert(key) {
            self.accepted.push(plan.clone());
            1
        } else {
            0
        }
    }

    fn clear(&mut self) {
        self.seen.clear();
        self.accepted.clear();
    }

    fn accepted_plans(&self) -> Vec<Plan> {
        self.accepted.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::OperatorId;

    fn op(i: u32) -> OperatorId {
        OperatorId::from(i)
    }

    fn processor(mode: DuplicateMode) -> DefaultPlanPostProcessor {
        DefaultPlanPostProcessor::new(mode, Box::new(|op: OperatorId| format!("op{}", op.to_u32())))
    }

    #[test]
    fn ordered_mode_treats_reorderings_as_distinct() {
        let mut pp = processor(DuplicateMode::Ordered);
        let p1 = Plan::new(2, vec![op(0), op(1)]);
        let p2 = Plan::new(2, vec![op(1), op(0)]);
        assert_eq!(pp.add_plan_if_necessary(&p1), 1);
        assert_eq!(pp.add_plan_if_necessary(&p2), 1);
        assert_eq!(pp.add_plan_if_necessary(&p1), 0);
    }

    #[test]
    fn unordered_mode_collapses_reorderings() {
        let mut pp = processor(DuplicateMode::Unordered);
        let p1 = Plan::new(2, vec![op(0), op(1)]);
        let p2 = Plan::new(2, vec![op(1), op(0)]);
        assert_eq!(pp.add_plan_if_necessary(&p1), 1);
        assert_eq!(pp.add_plan_if_necessary(&p2), 0);
    }
}
