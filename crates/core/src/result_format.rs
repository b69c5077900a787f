//! Consistent formatting for tool results injected into the conversation.
//!
//! Tools return raw content; the orchestration loop wraps it as
//! `"Result of <tool>: <content>"` or `"Result of <tool>: Error – <message>"`
//! before appending the synthetic user turn. The en-dash in the error form
//! is a fixed literal — the tool-instruction prompt tells the model to look
//! for exactly these prefixes.

pub struct ToolResultFormat;

impl ToolResultFormat {
    /// Formats a successful tool result for the prompt.
    pub fn result(tool_name: &str, content: &str) -> String {
        format!("Result of {tool_name}: {content}")
    }

    /// Formats a tool error for the prompt.
    pub fn error(tool_name: &str, message: &str) -> String {
        format!("Result of {tool_name}: Error – {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_format() {
        assert_eq!(
            ToolResultFormat::result("calculator", "Result: 42"),
            "Result of calculator: Result: 42"
        );
    }

    #[test]
    fn error_format_uses_en_dash() {
        let formatted = ToolResultFormat::error("web_search", "timed out");
        assert_eq!(formatted, "Result of web_search: Error – timed out");
        assert!(formatted.contains('–'));
    }
}
