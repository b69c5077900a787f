//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the model act: search the web, do arithmetic, manage
//! a plan, fetch a page. The model requests them by emitting tool-call
//! markup in its output; the orchestration loop resolves the name here and
//! feeds the result back as conversation text.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ToolError;

/// Argument bag for a tool invocation, as recovered from model output.
///
/// Values are whatever the parser extracted: strings, numbers, booleans,
/// nested lists and maps. Each tool validates and coerces the keys it
/// expects and returns a descriptive error string on mismatch.
pub type ToolArgs = serde_json::Map<String, Value>;

/// A structured tool request extracted from model output. Transient — built
/// by the parser, consumed by dispatch, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: ToolArgs,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// The core Tool trait.
///
/// `execute` returns the text injected back into the conversation. Expected
/// user-input problems (missing argument, bad expression) are returned as
/// formatted `"Error: …"` strings so the model can recover; `Err(ToolError)`
/// is reserved for genuinely unexpected faults, which the orchestration loop
/// converts into an error result rather than aborting the turn.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model calls this tool by (e.g. "web_search").
    fn name(&self) -> &str;

    /// Prompt text describing when to use this tool and what args to pass.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters. Advisory only — the
    /// parser never validates against it.
    fn schema(&self) -> Value;

    /// A one-line canonical call example for the prompt's examples block.
    fn example_call(&self) -> Option<&str> {
        None
    }

    /// A compact parameter hint for the prompt's reference block.
    fn compact_hint(&self) -> Option<&str> {
        None
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: &ToolArgs) -> std::result::Result<String, ToolError>;
}

/// A registry of named tools.
///
/// The orchestration loop uses this to:
/// 1. Render the tool-instruction text for the system prompt
/// 2. Look up and execute tools when the model requests them
///
/// Tools are kept sorted by name so the rendered instructions are
/// deterministic.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn unregister(&mut self, name: &str) {
        self.tools.remove(name);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Instructions for the model describing available tools and the exact
    /// call format. This is the canonical model-facing contract: the tagged
    /// `<tool_call>` form is the only format advertised; every other form
    /// the parser accepts exists purely for robustness against deviation.
    pub fn instructions_for_prompt(&self) -> String {
        let available = self.names().join(", ");
        let descriptions = self.description_block();
        let reference = self.reference_block();

        let mut examples = vec!["Examples (use these formats):".to_string()];
        for tool in self.tools.values() {
            if let Some(example) = tool.example_call() {
                examples.push(format!("{}: {}", tool.name(), example));
            }
        }
        let examples_block = examples.join("\n");

        format!(
            "You are an assistant. For general questions, greetings, or conceptual questions \
             (e.g. describe, explain, compare, discuss, what is X) answer in plain text and do NOT \
             output any <tool_call>. Only call tools when the user explicitly needs a calculation, \
             search, conversion, to look something up, or a multi-step task (essay, report, \
             research). For multi-step tasks call create_plan first with concrete steps, then use \
             other tools and update_step as you go.\n\
             \n\
             When you do need a tool, output ONLY valid <tool_call> lines in this format: \
             <tool_call>{{\"name\":\"...\",\"args\":{{...}}}}</tool_call> JSON.\n\
             \n\
             {examples_block}\n\
             \n\
             Tool descriptions (use these to decide when to call a tool and what args to pass):\n\
             {descriptions}\n\
             \n\
             Reference: {reference}\n\
             \n\
             After receiving \"Result of <tool>: ...\" in the conversation, respond in natural \
             language to the user (e.g. \"The answer is 104\" or a one- to two-sentence summary of \
             search results). Do not just echo the raw result or say \"None\" without using the \
             content.\n\
             \n\
             Available: {available}. Valid JSON, double quotes."
        )
    }

    /// One `name: description` line per tool, sorted by name.
    pub fn description_block(&self) -> String {
        self.tools
            .values()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One `name: compact-hint` line per tool that provides one.
    pub fn reference_block(&self) -> String {
        self.tools
            .values()
            .filter_map(|t| t.compact_hint().map(|h| format!("{}: {}", t.name(), h)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        fn example_call(&self) -> Option<&str> {
            Some(r#"<tool_call>{"name":"echo","args":{"text":"..."}}</tool_call>"#)
        }
        fn compact_hint(&self) -> Option<&str> {
            Some("text")
        }
        async fn execute(&self, args: &ToolArgs) -> std::result::Result<String, ToolError> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(text.to_string())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_names_sorted() {
        struct Named(&'static str);
        #[async_trait]
        impl Tool for Named {
            fn name(&self) -> &str {
                self.0
            }
            fn description(&self) -> &str {
                "test"
            }
            fn schema(&self) -> Value {
                serde_json::json!({})
            }
            async fn execute(&self, _args: &ToolArgs) -> std::result::Result<String, ToolError> {
                Ok(String::new())
            }
        }
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("zeta")));
        registry.register(Arc::new(Named("alpha")));
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn instructions_contain_format_and_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let instructions = registry.instructions_for_prompt();
        assert!(instructions.contains("<tool_call>"));
        assert!(instructions.contains("echo: Echoes back the input"));
        assert!(instructions.contains("Available: echo"));
        assert!(instructions.contains(r#"{"name":"echo","args":{"text":"..."}}"#));
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let tool = registry.get("echo").unwrap();
        let mut args = ToolArgs::new();
        args.insert("text".into(), Value::String("hello world".into()));
        let result = tool.execute(&args).await.unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn unregister_removes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.unregister("echo");
        assert!(registry.get("echo").is_none());
        assert!(registry.is_empty());
    }
}
