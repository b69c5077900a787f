//! Built-in tool implementations for Hearth.
//!
//! Tools give the model the ability to act: do arithmetic, convert units,
//! search the web, pull a Wikipedia summary, fetch a page's main text, and
//! manage the per-conversation plan.

pub mod calculator;
pub mod fetch_page;
pub mod unit_conversion;
pub mod web_search;
pub mod wikipedia;

use std::sync::Arc;

use hearth_core::tool::ToolRegistry;
use hearth_planning::{CreatePlanTool, GetPlanTool, PlanningStore, UpdateStepTool};

pub use calculator::CalculatorTool;
pub use fetch_page::FetchPageTool;
pub use unit_conversion::UnitConversionTool;
pub use web_search::{DuckDuckGoClient, WebSearchResult, WebSearchTool};
pub use wikipedia::WikipediaTool;

/// Create the default tool registry: the built-in tools plus the planning
/// tools bound to the given store.
pub fn default_registry(planning: Arc<PlanningStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(UnitConversionTool));
    registry.register(Arc::new(WebSearchTool::new()));
    registry.register(Arc::new(WikipediaTool::new()));
    registry.register(Arc::new(FetchPageTool::new()));
    registry.register(Arc::new(CreatePlanTool::new(planning.clone())));
    registry.register(Arc::new(GetPlanTool::new(planning.clone())));
    registry.register(Arc::new(UpdateStepTool::new(planning)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_registers_everything() {
        let registry = default_registry(Arc::new(PlanningStore::new()));
        assert_eq!(
            registry.names(),
            vec![
                "calculator",
                "create_plan",
                "fetch_page",
                "get_plan",
                "unit_conversion",
                "update_step",
                "web_search",
                "wikipedia",
            ]
        );
    }

    #[test]
    fn instructions_advertise_planning_protocol() {
        let registry = default_registry(Arc::new(PlanningStore::new()));
        let instructions = registry.instructions_for_prompt();
        assert!(instructions.contains("create_plan"));
        assert!(instructions.contains("update_step"));
        assert!(instructions.contains("<tool_call>"));
    }
}
