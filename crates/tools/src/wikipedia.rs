//! Wikipedia tool — short topic summaries from the REST API, no API key.

use std::time::Duration;

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use serde::Deserialize;
use serde_json::Value;

const SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

pub struct WikipediaTool {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WikipediaTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Use for encyclopedic or well-known topics: history, science, biographies, books, \
         geography. Pass \"query\" or \"title\" in args. Do not use for current events or recent \
         news—use web_search instead."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(r#"<tool_call>{"name":"wikipedia","args":{"query":"..."}}</tool_call>"#)
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("query")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .or_else(|| args.get("title"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if query.is_empty() {
            return Ok("Error: missing \"query\" or \"title\" for wikipedia.".to_string());
        }

        let page_title = query.replace(' ', "_");
        let url = format!("{SUMMARY_ENDPOINT}/{}", encode_path_segment(&page_title));
        let response = match self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(format!("Error: Wikipedia request failed – {e}")),
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(format!("Error: Wikipedia returned {status}. Page may not exist."));
        }
        let summary: SummaryResponse = match response.json().await {
            Ok(summary) => summary,
            Err(e) => return Ok(format!("Error: Wikipedia request failed – {e}")),
        };
        if summary.extract.is_empty() {
            return Ok(
                "Error: could not get summary from Wikipedia (missing or empty extract)."
                    .to_string(),
            );
        }
        let title = if summary.title.is_empty() {
            page_title
        } else {
            summary.title
        };
        Ok(format!("{title}: {}", summary.extract))
    }
}

/// Percent-encode a URL path segment, leaving unreserved characters intact.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_query_is_reported() {
        let tool = WikipediaTool::new();
        let result = tool.execute(&ToolArgs::new()).await.unwrap();
        assert_eq!(result, "Error: missing \"query\" or \"title\" for wikipedia.");
    }

    #[tokio::test]
    async fn blank_query_is_reported() {
        let tool = WikipediaTool::new();
        let mut args = ToolArgs::new();
        args.insert("query".into(), Value::String("   ".into()));
        let result = tool.execute(&args).await.unwrap();
        assert!(result.starts_with("Error: missing"));
    }

    #[test]
    fn encodes_path_segments() {
        assert_eq!(encode_path_segment("Ancient_Egypt"), "Ancient_Egypt");
        assert_eq!(encode_path_segment("C++"), "C%2B%2B");
        assert_eq!(encode_path_segment("Łódź"), "%C5%81%C3%B3d%C5%BA");
    }
}
