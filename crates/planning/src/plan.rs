//! Plan and PlanStep value types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl PlanStepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parse a status string, accepting the synonyms models actually emit.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" | "in progress" => Some(Self::InProgress),
            "completed" | "complete" | "done" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    pub status: PlanStepStatus,
}

impl PlanStep {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: PlanStepStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    /// Build a plan from a `create_plan` steps argument. Accepts an array of
    /// strings, an array of objects carrying `title`/`name`/`step`, or a
    /// single `\n`/`,`/`;`-separated string. Blank entries are dropped;
    /// returns `None` when nothing usable remains.
    pub fn from_arg(steps_arg: &Value) -> Option<Self> {
        let titles: Vec<String> = match steps_arg {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => ["title", "name", "step"]
                        .iter()
                        .find_map(|key| obj.get(*key).and_then(Value::as_str))
                        .map(|s| s.trim().to_string()),
                    Value::String(s) => Some(s.trim().to_string()),
                    other => Some(other.to_string().trim().to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Value::String(s) => s
                .split(['\n', ',', ';'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => return None,
        };
        if titles.is_empty() {
            return None;
        }
        Some(Self::new(titles.into_iter().map(PlanStep::new).collect()))
    }
}
