//! The plan store — plans keyed by conversation, one lock over everything.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use crate::plan::{Plan, PlanStepStatus};

#[derive(Default)]
struct StoreState {
    current_chat: Option<String>,
    plans: HashMap<String, Plan>,
}

/// Thread-safe store for plans keyed by conversation identifier.
///
/// The orchestration loop sets the current chat before each send so that
/// planning tools — whose calls carry only a name and args — apply to the
/// active conversation. Every operation takes the single internal mutex, so
/// read-then-write sequences (look up plan, mutate step) cannot interleave
/// with a concurrent mutation or observer read.
#[derive(Default)]
pub struct PlanningStore {
    state: Mutex<StoreState>,
}

impl PlanningStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation identifiers are path-like; canonicalize so equivalent
    /// spellings collide. Falls back to the raw identifier when
    /// canonicalization fails (e.g. the path doesn't exist).
    fn plan_key(key: &str) -> String {
        match std::fs::canonicalize(Path::new(key)) {
            Ok(canonical) => canonical.to_string_lossy().into_owned(),
            Err(_) => key.to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // A poisoned lock means a panic mid-mutation; plans are advisory
        // state, so keep serving rather than propagate the poison.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the conversation key for subsequent unqualified operations.
    /// `None` deactivates planning until the next send.
    pub fn set_current_chat(&self, key: Option<&str>) {
        self.lock().current_chat = key.map(String::from);
    }

    /// The plan for the current chat, or `None` if no chat or no plan.
    pub fn plan(&self) -> Option<Plan> {
        let state = self.lock();
        let key = state.current_chat.as_deref()?;
        state.plans.get(&Self::plan_key(key)).cloned()
    }

    /// Replace the plan for the current chat. Returns false (and stores
    /// nothing) when no current chat is set — callers report that as a
    /// failure, not a silent success.
    pub fn set_plan(&self, plan: Plan) -> bool {
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref() else {
            return false;
        };
        let key = Self::plan_key(key);
        debug!(steps = plan.steps.len(), "storing plan");
        state.plans.insert(key, plan);
        true
    }

    /// The plan for a specific conversation (e.g. for a UI observer).
    pub fn plan_for(&self, key: &str) -> Option<Plan> {
        self.lock().plans.get(&Self::plan_key(key)).cloned()
    }

    /// Remove the plan for a conversation (e.g. when it is deleted). Clears
    /// the current-chat pointer if it referenced that conversation.
    pub fn remove_plan(&self, key: &str) {
        let mut state = self.lock();
        let key = Self::plan_key(key);
        state.plans.remove(&key);
        if state
            .current_chat
            .as_deref()
            .is_some_and(|current| Self::plan_key(current) == key)
        {
            state.current_chat = None;
        }
    }

    /// Move plan state from one conversation key to another (e.g. after a
    /// rename), updating the current-chat pointer if it referenced the old
    /// key. No-op when the source has no plan or both keys canonicalize to
    /// the same entry.
    pub fn migrate_plan(&self, from_key: &str, to_key: &str) {
        let mut state = self.lock();
        let old_key = Self::plan_key(from_key);
        let new_key = Self::plan_key(to_key);
        if old_key == new_key {
            return;
        }
        if let Some(plan) = state.plans.remove(&old_key) {
            state.plans.insert(new_key, plan);
        }
        if state
            .current_chat
            .as_deref()
            .is_some_and(|current| Self::plan_key(current) == old_key)
        {
            state.current_chat = Some(to_key.to_string());
        }
    }

    /// Update the status of the step at `index` (0-based) in the current
    /// chat's plan. No-op when there is no current chat, no plan, or the
    /// index is out of range — callers detect that via [`Self::plan`].
    pub fn update_step(&self, index: usize, status: PlanStepStatus) {
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref().map(Self::plan_key) else {
            return;
        };
        let Some(plan) = state.plans.get_mut(&key) else {
            return;
        };
        if let Some(step) = plan.steps.get_mut(index) {
            step.status = status;
        }
    }

    /// Retitle the step at `index` (0-based). Bounds-checked no-op.
    pub fn update_step_title(&self, index: usize, title: &str) {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return;
        }
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref().map(Self::plan_key) else {
            return;
        };
        let Some(plan) = state.plans.get_mut(&key) else {
            return;
        };
        if let Some(step) = plan.steps.get_mut(index) {
            step.title = trimmed.to_string();
        }
    }

    /// Insert a new pending step at `index` (0-based, may equal len).
    /// Bounds-checked no-op.
    pub fn insert_step(&self, index: usize, title: &str) {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return;
        }
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref().map(Self::plan_key) else {
            return;
        };
        let Some(plan) = state.plans.get_mut(&key) else {
            return;
        };
        if index <= plan.steps.len() {
            plan.steps.insert(index, crate::plan::PlanStep::new(trimmed));
        }
    }

    /// Remove the step at `index` (0-based). Bounds-checked no-op.
    pub fn remove_step(&self, index: usize) {
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref().map(Self::plan_key) else {
            return;
        };
        let Some(plan) = state.plans.get_mut(&key) else {
            return;
        };
        if index < plan.steps.len() {
            plan.steps.remove(index);
        }
    }

    /// Clear the plan for the current chat only.
    pub fn clear_plan(&self) {
        let mut state = self.lock();
        let Some(key) = state.current_chat.as_deref().map(Self::plan_key) else {
            return;
        };
        state.plans.remove(&key);
    }

    /// Human-readable numbered status lines for the current chat's plan.
    pub fn plan_summary(&self) -> Option<String> {
        self.plan()
            .filter(|p| !p.steps.is_empty())
            .map(|p| format_plan_summary(&p))
    }

    /// Summary for a specific conversation key.
    pub fn plan_summary_for(&self, key: &str) -> Option<String> {
        self.plan_for(key)
            .filter(|p| !p.steps.is_empty())
            .map(|p| format_plan_summary(&p))
    }

    /// Summary plus the update-protocol block for the current chat.
    pub fn plan_summary_with_update_instructions(&self) -> Option<String> {
        self.plan()
            .filter(|p| !p.steps.is_empty())
            .map(|p| format_summary_with_update_instructions(&p))
    }

    /// Summary plus the update-protocol block for a specific key (used for
    /// follow-up prompts).
    pub fn plan_summary_with_update_instructions_for(&self, key: &str) -> Option<String> {
        self.plan_for(key)
            .filter(|p| !p.steps.is_empty())
            .map(|p| format_summary_with_update_instructions(&p))
    }
}

fn format_plan_summary(plan: &Plan) -> String {
    let lines: Vec<String> = plan
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. [{}] {}", i + 1, step.status.as_str(), step.title))
        .collect();
    format!("Current plan:\n{}", lines.join("\n"))
}

fn format_summary_with_update_instructions(plan: &Plan) -> String {
    let summary = format_plan_summary(plan);
    let active_idx = plan
        .steps
        .iter()
        .position(|s| s.status != PlanStepStatus::Completed);

    let (active_step_line, remaining_steps_line) = match active_idx {
        Some(idx) => {
            let active_line = format!("Active step now: {}. {}", idx + 1, plan.steps[idx].title);
            let remaining_count = plan.steps.len() - idx;
            let remaining_line = if remaining_count > 1 {
                let pending: Vec<String> =
                    (idx + 2..=plan.steps.len()).map(|i| i.to_string()).collect();
                format!(
                    "Steps {} are still pending. Complete step {} with update_step(completed), \
                     then respond to the user and continue to step {}.",
                    pending.join(" and "),
                    idx + 1,
                    idx + 2
                )
            } else {
                "Do not stop until all steps are completed.".to_string()
            };
            (active_line, remaining_line)
        }
        None => (
            "Active step now: all steps completed.".to_string(),
            String::new(),
        ),
    };

    let protocol_block = match active_idx {
        Some(idx) => format!(
            "Plan update protocol (REQUIRED when plan is active):\n\
             1. Before doing work on a step, call update_step with {{\"step_index\": {step}, \"status\": \"in_progress\"}}.\n\
             2. After completing that step's output, call update_step with {{\"step_index\": {step}, \"status\": \"completed\"}}.\n\
             3. Then respond to the user in natural language.\n\
             Use statuses: pending, in_progress, completed, error.",
            step = idx + 1
        ),
        None => "Plan update protocol: Use statuses pending, in_progress, completed, error."
            .to_string(),
    };

    let remaining = if remaining_steps_line.is_empty() {
        String::new()
    } else {
        format!("{remaining_steps_line}\n")
    };
    format!("{summary}\n\n{active_step_line}\n{remaining}\n{protocol_block}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStep;

    fn plan_of(titles: &[&str]) -> Plan {
        Plan::new(titles.iter().map(|t| PlanStep::new(*t)).collect())
    }

    #[test]
    fn set_plan_requires_current_chat() {
        let store = PlanningStore::new();
        assert!(!store.set_plan(plan_of(&["A"])));
        store.set_current_chat(Some("/chats/one.md"));
        assert!(store.set_plan(plan_of(&["A"])));
        assert_eq!(store.plan().unwrap().steps.len(), 1);
    }

    #[test]
    fn plans_are_scoped_per_chat() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A"]));
        store.set_current_chat(Some("/chats/two.md"));
        assert!(store.plan().is_none());
        store.set_plan(plan_of(&["B", "C"]));
        assert_eq!(store.plan_for("/chats/one.md").unwrap().steps.len(), 1);
        assert_eq!(store.plan_for("/chats/two.md").unwrap().steps.len(), 2);
    }

    #[test]
    fn deactivating_current_chat_disables_plan_access() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A"]));
        store.set_current_chat(None);
        assert!(store.plan().is_none());
        assert!(!store.set_plan(plan_of(&["B"])));
    }

    #[test]
    fn update_step_out_of_range_is_noop() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A"]));
        store.update_step(5, PlanStepStatus::Completed);
        assert_eq!(store.plan().unwrap().steps[0].status, PlanStepStatus::Pending);
    }

    #[test]
    fn insert_and_remove_step_bounds_checked() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A", "C"]));

        store.insert_step(1, "B");
        let plan = store.plan().unwrap();
        assert_eq!(
            plan.steps.iter().map(|s| s.title.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );

        store.insert_step(99, "X");
        assert_eq!(store.plan().unwrap().steps.len(), 3);

        store.remove_step(1);
        assert_eq!(store.plan().unwrap().steps.len(), 2);
        store.remove_step(99);
        assert_eq!(store.plan().unwrap().steps.len(), 2);
    }

    #[test]
    fn update_step_title_trims() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A"]));
        store.update_step_title(0, "  Renamed  ");
        assert_eq!(store.plan().unwrap().steps[0].title, "Renamed");
    }

    #[test]
    fn migrate_then_remove_leaves_no_trace() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/old.md"));
        store.set_plan(plan_of(&["A"]));

        store.migrate_plan("/chats/old.md", "/chats/new.md");
        assert!(store.plan_for("/chats/old.md").is_none());
        assert!(store.plan_for("/chats/new.md").is_some());
        // Pointer followed the rename.
        assert!(store.plan().is_some());

        store.remove_plan("/chats/new.md");
        assert!(store.plan_for("/chats/old.md").is_none());
        assert!(store.plan_for("/chats/new.md").is_none());
        assert!(store.plan().is_none());
    }

    #[test]
    fn migrate_preserves_step_state() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/old.md"));
        store.set_plan(plan_of(&["A", "B"]));
        store.update_step(0, PlanStepStatus::Completed);

        store.migrate_plan("/chats/old.md", "/chats/new.md");
        let plan = store.plan_for("/chats/new.md").unwrap();
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
    }

    #[test]
    fn migrate_without_source_plan_is_noop() {
        let store = PlanningStore::new();
        store.migrate_plan("/chats/none.md", "/chats/new.md");
        assert!(store.plan_for("/chats/new.md").is_none());
    }

    #[test]
    fn summary_formats_numbered_status_lines() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["Research", "Write"]));
        store.update_step(0, PlanStepStatus::InProgress);

        let summary = store.plan_summary().unwrap();
        assert!(summary.starts_with("Current plan:\n"));
        assert!(summary.contains("1. [in_progress] Research"));
        assert!(summary.contains("2. [pending] Write"));
    }

    #[test]
    fn summary_with_instructions_names_active_step() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["Research", "Write", "Review"]));
        store.update_step(0, PlanStepStatus::Completed);

        let text = store.plan_summary_with_update_instructions().unwrap();
        assert!(text.contains("Active step now: 2. Write"));
        assert!(text.contains("Steps 3 are still pending."));
        assert!(text.contains(r#"{"step_index": 2, "status": "in_progress"}"#));
        assert!(text.contains(r#"{"step_index": 2, "status": "completed"}"#));
    }

    #[test]
    fn summary_with_instructions_all_completed() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A"]));
        store.update_step(0, PlanStepStatus::Completed);

        let text = store.plan_summary_with_update_instructions().unwrap();
        assert!(text.contains("Active step now: all steps completed."));
    }

    #[test]
    fn summary_last_step_active_warns_not_to_stop() {
        let store = PlanningStore::new();
        store.set_current_chat(Some("/chats/one.md"));
        store.set_plan(plan_of(&["A", "B"]));
        store.update_step(0, PlanStepStatus::Completed);

        let text = store.plan_summary_with_update_instructions().unwrap();
        assert!(text.contains("Do not stop until all steps are completed."));
    }

    #[test]
    fn summary_none_without_plan() {
        let store = PlanningStore::new();
        assert!(store.plan_summary().is_none());
        store.set_current_chat(Some("/chats/one.md"));
        assert!(store.plan_summary().is_none());
        assert!(store.plan_summary_with_update_instructions_for("/chats/one.md").is_none());
    }
}
