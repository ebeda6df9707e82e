//! The plan-manager collaborator (§6, Persisted state): where decoded plans are written to.
//!
//! Real plan writers (readable PDDL-action dumps, DOT export of the explored state space) are out
//! of scope; this module fixes the interface the post-processor's `save_plans` hook programs
//! against, plus a filesystem-backed implementation adequate for the `found_plans/<prefix>.<n>`
//! and single-JSON-document layouts §6 describes.

use crate::errors::EngineError;
use crate::plan::Plan;
use crate::task::Task;
use std::fs;
use std::path::{Path, PathBuf};

pub trait PlanManager {
    /// Persists the `index`-th accepted plan (1-based, matching the `<prefix>.<n>` naming).
    fn write_plan(&mut self, index: usize, plan: &Plan, task: &dyn Task) -> Result<(), EngineError>;

    /// Moves everything written so far into a `done/` sub-directory, if the manager supports
    /// archiving. A no-op for managers that don't.
    fn archive(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Writes the full accepted set as a single `{"plans": [...]}` JSON document, if a target path
    /// was configured. A no-op otherwise.
    fn write_json(&mut self, _plans: &[Plan], _task: &dyn Task) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Writes one plan per file under `dir` (`found_plans/` by convention), named `<prefix>.<n>`, and
/// optionally a JSON document at `json_path`.
pub struct FilePlanManager {
    dir: PathBuf,
    prefix: String,
    json_path: Option<PathBuf>,
}

impl FilePlanManager {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        FilePlanManager {
            dir: dir.into(),
            prefix: prefix.into(),
            json_path: None,
        }
    }

    pub fn with_json_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_path = Some(path.into());
        self
    }

    fn plan_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", self.prefix, index))
    }
}

impl PlanManager for FilePlanManager {
    fn write_plan(&mut self, index: usize, plan: &Plan, task: &dyn Task) -> Result<(), EngineError> {
        fs::create_dir_all(&self.dir)?;
        let mut body = format!("; cost = {}\n", plan.cost);
        for &op in &plan.operators {
            body.push_str(task.operator_name(op));
            body.push('\n');
        }
        fs::write(self.plan_path(index), body)?;
        Ok(())
    }

    fn archive(&mut self) -> Result<(), EngineError> {
        let done: &Path = &self.dir.join("done");
        fs::create_dir_all(done)?;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                let dest = done.join(path.file_name().unwrap());
                fs::rename(&path, dest)?;
            }
        }
        Ok(())
    }

    fn write_json(&mut self, plans: &[Plan], task: &dyn Task) -> Result<(), EngineError> {
        let Some(json_path) = &self.json_path else {
            return Ok(());
        };
        let doc = serde_json::json!({
            "plans": plans.iter().map(|p| p.to_json(task)).collect::<Vec<_>>(),
        });
        fs::write(json_path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Cost, OperatorId, StateId};

    struct ToyTask;
    impl Task for ToyTask {
        fn initial_state(&self) -> StateId {
            StateId::from(0u32)
        }
        fn goal_test(&self, state: StateId) -> bool {
            state == StateId::from(1u32)
        }
        fn generate_applicable_ops(&self, _state: StateId) -> Vec<OperatorId> {
            vec![OperatorId::from(0u32)]
        }
        fn get_successor_state(&self, _state: StateId, _op: OperatorId) -> StateId {
            StateId::from(1u32)
        }
        fn num_operators(&self) -> usize {
            1
        }
        fn operator_cost(&self, _op: OperatorId) -> Cost {
            1
        }
        fn operator_name(&self, _op: OperatorId) -> &str {
            "move"
        }
    }

    #[test]
    fn writes_one_file_per_plan_and_archives() {
        let tmp = std::env::temp_dir().join(format!("kstar-test-plan-manager-{:?}", std::thread::current().id()));
        let _ = fs::remove_dir_all(&tmp);
        let mut mgr = FilePlanManager::new(&tmp, "plan");
        let task = ToyTask;
        let plan = Plan::new(1, vec![OperatorId::from(0u32)]);
        mgr.write_plan(1, &plan, &task).unwrap();
        assert!(tmp.join("plan.1").exists());
        mgr.archive().unwrap();
        assert!(tmp.join("done").join("plan.1").exists());
        fs::remove_dir_all(&tmp).ok();
    }
}
