//! The decoded output of a search: a sequence of operators from the initial state to a goal.

use crate::task::{Cost, OperatorId, Task};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub cost: Cost,
    pub operators: Vec<OperatorId>,
}

impl Plan {
    pub fn new(cost: Cost, operators: Vec<OperatorId>) -> Self {
        Plan { cost, operators }
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn to_json(&self, task: &dyn Task) -> JsonPlan {
        JsonPlan {
            cost: self.cost,
            actions: self.operators.iter().map(|&op| task.operator_name(op).to_string()).collect(),
        }
    }
}

/// Serializable representation of a plan, matching the `{cost, actions}` shape of the dumped
/// JSON document (§6, Persisted state).
#[derive(Debug, Clone, Serialize)]
pub struct JsonPlan {
    pub cost: Cost,
    pub actions: Vec<String>,
}
