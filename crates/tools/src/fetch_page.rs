//! Fetch-page tool — main text extraction from a web page.
//!
//! Fetches up to 5 MB of HTML, then extracts readable text preferring
//! `<main>`, then `<article>`, then `<section>`, then `<body>`. Chrome
//! elements (nav, script, forms, …) are discarded, link text keeps its href
//! in parentheses, and whitespace is collapsed.

use std::time::Duration;

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

pub const DEFAULT_MAX_CHARS: usize = 20_000;
const MAX_RESPONSE_BYTES: usize = 5_000_000;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose entire subtree is noise for a text reader.
const DISCARD_TAGS: &[&str] = &[
    "script", "style", "link", "nav", "header", "footer", "aside", "ins", "iframe", "button",
    "form", "input", "select",
];

pub struct FetchPageTool {
    client: reqwest::Client,
    strip_tags: Regex,
}

impl Default for FetchPageTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchPageTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            strip_tags: Regex::new(r"</?[a-zA-Z][^>]*>").expect("invalid strip regex"),
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<(String, bool), String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| format!("request error: {e}"))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(format!("HTTP {status}"));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("body read error: {e}"))?;
        let truncated = bytes.len() > MAX_RESPONSE_BYTES;
        let slice = &bytes[..bytes.len().min(MAX_RESPONSE_BYTES)];
        Ok((String::from_utf8_lossy(slice).into_owned(), truncated))
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Get main text from a web page. Use when the user gives a URL to analyze or when you need \
         full article text for a URL found via web_search. Pass \"url\" in args. Prefer \
         web_search for broad queries; use fetch_page when you have a specific URL."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string" },
                "max_chars": { "type": "integer" }
            },
            "required": ["url"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(r#"<tool_call>{"name":"fetch_page","args":{"url":"https://..."}}</tool_call>"#)
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("url")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let url = args
            .get("url")
            .or_else(|| args.get("u"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if url.is_empty() {
            return Ok("Error: missing \"url\" argument for fetch_page.".to_string());
        }
        let max_chars = args
            .get("max_chars")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_CHARS);

        let lower = url.to_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Ok("Error: invalid URL. Use http or https only.".to_string());
        }

        let (html, page_truncated) = match self.fetch_html(url).await {
            Ok(fetched) => fetched,
            Err(e) => return Ok(format!("Fetch failed: {e}")),
        };

        let text = extract_semantic_content(&html);
        if text.is_empty() {
            return Ok("No main content found at that URL.".to_string());
        }
        let text = self.strip_tags.replace_all(&text, " ").trim().to_string();

        let mut result = if text.chars().count() <= max_chars {
            text
        } else {
            let clipped: String = text.chars().take(max_chars).collect();
            format!("{clipped} ... [truncated]")
        };
        if page_truncated {
            result.push_str(
                "\n\n[Page was very long; content above is from the first part of the page.]",
            );
        }
        Ok(result)
    }
}

/// Pull readable text from parsed HTML, preferring semantic containers.
pub fn extract_semantic_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in ["main", "article", "section"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let parts: Vec<String> = document
            .select(&selector)
            .map(|el| {
                let mut text = String::new();
                collect_text(el, &mut text);
                text.trim().to_string()
            })
            .filter(|t| !t.is_empty())
            .collect();
        if !parts.is_empty() {
            return collapse_whitespace(&parts.join("\n\n"));
        }
    }

    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            let mut text = String::new();
            collect_text(body, &mut text);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return collapse_whitespace(trimmed);
            }
        }
    }
    String::new()
}

/// Walk an element's subtree collecting text nodes, skipping discard tags
/// and rendering links as `text (href)`.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if DISCARD_TAGS.contains(&tag) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if tag == "a" {
                    let mut inner = String::new();
                    collect_text(child_ref, &mut inner);
                    match el.attr("href").filter(|h| !h.trim().is_empty()) {
                        Some(href) => {
                            out.push_str(&inner);
                            out.push_str(&format!(" ({href})"));
                        }
                        None => out.push_str(&inner),
                    }
                } else {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
