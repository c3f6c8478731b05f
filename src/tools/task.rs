//! Terminal actions: the task is done, or cannot be done

use crate::{tools::Tool,
            trajectory::{BrowserAction, TrajectoryItem}};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskReasonParams {
    /// Why the task ends here
    pub reason: String,
}

#[derive(Default)]
pub struct TaskCompleteTool;

impl Tool for TaskCompleteTool {
    type Params = TaskReasonParams;

    fn name(&self) -> &str {
        "task_complete"
    }

    fn description(&self) -> &str {
        "Declare that the user's task has been completed"
    }

    fn into_item(&self, params: TaskReasonParams) -> TrajectoryItem {
        BrowserAction::TaskComplete { reason: params.reason }.into()
    }
}

#[derive(Default)]
pub struct TaskNotPossibleTool;

impl Tool for TaskNotPossibleTool {
    type Params = TaskReasonParams;

    fn name(&self) -> &str {
        "task_not_possible"
    }

    fn description(&self) -> &str {
        "Declare that it is not possible to complete the user's task"
    }

    fn into_item(&self, params: TaskReasonParams) -> TrajectoryItem {
        BrowserAction::TaskNotPossible { reason: params.reason }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_items() {
        let done = TaskCompleteTool.into_item(TaskReasonParams { reason: "ordered".into() });
        let impossible = TaskNotPossibleTool.into_item(TaskReasonParams { reason: "sold out".into() });
        assert!(done.should_handoff());
        assert!(impossible.should_handoff());
        assert_eq!(impossible.text(), "action: task_not_possible(reason=\"sold out\")");
    }
}
