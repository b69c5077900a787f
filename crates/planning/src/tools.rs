//! Planning tools — the model's interface to the plan store.
//!
//! All three tools hold a shared handle to the same [`PlanningStore`] the
//! orchestration loop configured, so a call applies to whichever
//! conversation the loop marked current before the send.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use serde_json::Value;

use crate::plan::{Plan, PlanStepStatus};
use crate::store::PlanningStore;

pub struct CreatePlanTool {
    store: Arc<PlanningStore>,
}

impl CreatePlanTool {
    pub fn new(store: Arc<PlanningStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreatePlanTool {
    fn name(&self) -> &str {
        "create_plan"
    }

    fn description(&self) -> &str {
        "Create a step-by-step plan for a complex, multi-step task. Use when the request cannot \
         be answered with a single tool call. Pass \"steps\" (array of step titles). Call this \
         first before other tools for essays, research, or multi-part tasks."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "steps": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["steps"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(
            r#"<tool_call>{"name":"create_plan","args":{"steps":["Research topic","Draft outline","Write sections"]}}</tool_call>"#,
        )
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("steps([...])")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let Some(steps_arg) = args.get("steps") else {
            return Ok("Error: missing \"steps\" argument. Pass an array of step titles, e.g. \
                       {\"steps\": [\"Step 1\", \"Step 2\"]}."
                .to_string());
        };
        let Some(plan) = Plan::from_arg(steps_arg) else {
            return Ok("Error: \"steps\" must be a non-empty array of strings.".to_string());
        };

        let steps = plan.steps.clone();
        if !self.store.set_plan(plan) {
            return Ok("Error: no active chat is set; cannot create a plan.".to_string());
        }
        let lines: Vec<String> = steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. [pending] {}", i + 1, step.title))
            .collect();
        Ok(format!(
            "Plan created with {} step(s):\n{}",
            steps.len(),
            lines.join("\n")
        ))
    }
}

pub struct GetPlanTool {
    store: Arc<PlanningStore>,
}

impl GetPlanTool {
    pub fn new(store: Arc<PlanningStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetPlanTool {
    fn name(&self) -> &str {
        "get_plan"
    }

    fn description(&self) -> &str {
        "Get the current plan for this chat (numbered steps and status). No args. Use to see \
         progress before continuing or before calling update_step."
    }

    fn schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("no args")
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        let Some(plan) = self.store.plan() else {
            return Ok("No plan set for this chat. Use create_plan first to break the task into \
                       steps."
                .to_string());
        };
        if plan.steps.is_empty() {
            return Ok("Plan has no steps.".to_string());
        }
        let lines: Vec<String> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. [{}] {}", i + 1, step.status.as_str(), step.title))
            .collect();
        Ok(format!("Current plan:\n{}", lines.join("\n")))
    }
}

pub struct UpdateStepTool {
    store: Arc<PlanningStore>,
}

impl UpdateStepTool {
    pub fn new(store: Arc<PlanningStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateStepTool {
    fn name(&self) -> &str {
        "update_step"
    }

    fn description(&self) -> &str {
        "Update a plan step's status. Use when you start or finish a step. Pass step_index \
         (1-based) and status (pending, in_progress, completed, error). Mark the active step \
         completed before answering when a plan exists. Use error when a step fails."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "step_index": { "type": "integer" },
                "status": {
                    "type": "string",
                    "enum": ["pending", "in_progress", "completed", "error"]
                }
            },
            "required": ["step_index", "status"]
        })
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("step_index,status")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let Some(plan) = self.store.plan() else {
            return Ok("No plan set. Use create_plan first.".to_string());
        };

        let index_arg = args
            .get("step_index")
            .or_else(|| args.get("stepIndex"))
            .or_else(|| args.get("index"));
        let Some(index) = index_arg.and_then(Value::as_i64) else {
            return Ok("Error: missing or invalid \"step_index\" (1-based integer).".to_string());
        };
        if index < 1 || index as usize > plan.steps.len() {
            return Ok(format!(
                "Error: step_index {index} out of range (plan has {count} steps, use 1 to {count}).",
                count = plan.steps.len()
            ));
        }

        let status_arg = args.get("status").and_then(Value::as_str).unwrap_or("");
        let Some(status) = PlanStepStatus::parse(status_arg) else {
            return Ok(
                "Error: status must be one of: pending, in_progress, completed, error.".to_string(),
            );
        };

        self.store.update_step(index as usize - 1, status);
        Ok(format!("Step {index} set to {}.", status.as_str()))
    }
}
