//! Web search tool — DuckDuckGo HTML endpoint, no API key.
//!
//! Scrapes the `html.duckduckgo.com/html/` results page with a pair of
//! tolerant regexes, filters ads, resolves `uddg=` redirect links, and
//! decodes HTML entities. Transient upstream failures (429/403/5xx) retry
//! with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchResult {
    pub title: String,
    pub snippet: Option<String>,
    pub url: String,
}

pub struct DuckDuckGoClient {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay_ms: u64,
    title_link_regexes: Vec<Regex>,
    snippet_regexes: Vec<Regex>,
    decimal_entity: Regex,
    hex_entity: Regex,
}

impl Default for DuckDuckGoClient {
    fn default() -> Self {
        Self::new(2, 500)
    }
}

impl DuckDuckGoClient {
    pub fn new(max_retries: u32, retry_delay_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            max_retries,
            retry_delay_ms,
            title_link_regexes: vec![
                Regex::new(r#"(?i)<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]+)"[^>]*>([^<]+)</a>"#)
                    .expect("invalid title regex"),
                Regex::new(r#"(?i)<a[^>]*href="([^"]+)"[^>]*class="[^"]*result[^"]*"[^>]*>([^<]+)</a>"#)
                    .expect("invalid title regex"),
            ],
            snippet_regexes: vec![
                Regex::new(r#"(?i)<a[^>]*class="[^"]*result__snippet[^"]*"[^>]*>([^<]+)</a>"#)
                    .expect("invalid snippet regex"),
                Regex::new(r#"(?i)<span[^>]*class="[^"]*result__snippet[^"]*"[^>]*>([^<]+)</span>"#)
                    .expect("invalid snippet regex"),
            ],
            decimal_entity: Regex::new(r"&#(\d+);").expect("invalid entity regex"),
            hex_entity: Regex::new(r"(?i)&#x([0-9a-f]+);").expect("invalid entity regex"),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<WebSearchResult>, String> {
        let mut attempt = 0;
        loop {
            match self.search_once(query).await {
                Ok(results) => return Ok(results),
                Err(e) if attempt < self.max_retries => {
                    debug!(attempt, "search attempt failed, retrying: {e}");
                    let backoff = self.retry_delay_ms * 2u64.pow(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn search_once(&self, query: &str) -> Result<Vec<WebSearchResult>, String> {
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query)])
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
            return Err(format!("DuckDuckGo search failed with HTTP {status}"));
        }
        let html = response
            .text()
            .await
            .map_err(|e| format!("body read error: {e}"))?;
        Ok(self.parse_html_results(&html))
    }

    /// Extract results from the DuckDuckGo HTML. The first regex that finds
    /// anything wins (the second is a looser fallback for markup drift).
    pub fn parse_html_results(&self, html: &str) -> Vec<WebSearchResult> {
        let mut results: Vec<WebSearchResult> = Vec::new();
        for regex in &self.title_link_regexes {
            for capture in regex.captures_iter(html) {
                let (Some(whole), Some(url_raw), Some(title_raw)) =
                    (capture.get(0), capture.get(1), capture.get(2))
                else {
                    continue;
                };
                let title = self.decode_html_entities(
                    title_raw.as_str().trim().replace(['\n', '\t'], " ").as_str(),
                );
                if title.len() <= 3 {
                    continue;
                }

                let context_before =
                    floor_slice(html, whole.start().saturating_sub(200), whole.start())
                        .to_lowercase();
                if is_ad_result(&context_before) {
                    continue;
                }

                let Some(url) = resolve_result_url(url_raw.as_str()) else {
                    continue;
                };

                let context_after = floor_slice(
                    html,
                    whole.end(),
                    (whole.end() + 500).min(html.len()),
                );
                let snippet = self.snippet_regexes.iter().find_map(|snippet_regex| {
                    snippet_regex.captures(context_after).and_then(|c| {
                        c.get(1).map(|m| {
                            self.decode_html_entities(
                                m.as_str().trim().replace(['\n', '\t'], " ").as_str(),
                            )
                        })
                    })
                });

                if !results.iter().any(|r| r.url == url) {
                    results.push(WebSearchResult {
                        title,
                        snippet,
                        url,
                    });
                }
            }
            if !results.is_empty() {
                break;
            }
        }
        results
    }

    fn decode_html_entities(&self, input: &str) -> String {
        let mut result = input.to_string();
        for (entity, replacement) in [
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&quot;", "\""),
            ("&apos;", "'"),
            ("&nbsp;", " "),
            ("&mdash;", "—"),
            ("&ndash;", "–"),
            ("&hellip;", "…"),
        ] {
            result = result.replace(entity, replacement);
        }
        result = self
            .decimal_entity
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        self.hex_entity
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                u32::from_str_radix(&caps[1], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Normalize a raw result href: skip ad redirects, resolve `uddg=` redirect
/// targets, require http(s).
fn resolve_result_url(raw: &str) -> Option<String> {
    let mut url = raw.to_string();
    let lower = url.to_lowercase();
    if lower.contains("duckduckgo.com/y.js") && lower.contains("ad_domain=") {
        return None;
    }
    if let Some(uddg_idx) = url.find("uddg=") {
        let encoded = url[uddg_idx + 5..]
            .split('&')
            .next()
            .unwrap_or_default();
        url = percent_decode(encoded);
        let lower = url.to_lowercase();
        if lower.contains("duckduckgo.com/y.js") && lower.contains("ad_domain=") {
            return None;
        }
    } else if url.starts_with("/l/") {
        return None;
    }
    if url.starts_with("//") {
        url = format!("https:{url}");
    } else if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }
    Some(url)
}

fn is_ad_result(context: &str) -> bool {
    [
        "class=\"ad\"",
        "class='ad'",
        "class=\"ad-",
        "class=\"sponsored\"",
        "class=\"result--ad\"",
        "class=\"result__ad\"",
        "data-module=\"ad\"",
        "sponsored link",
        "advertisement",
    ]
    .iter()
    .any(|indicator| context.contains(indicator))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if let (Some(hi), Some(lo)) = (
                    bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                    bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
                ) {
                    out.push((hi * 16 + lo) as u8);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Slice on char boundaries, nudging `start` down and `end` up as needed.
fn floor_slice(text: &str, mut start: usize, mut end: usize) -> &str {
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

pub struct WebSearchTool {
    client: DuckDuckGoClient,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: DuckDuckGoClient::default(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Use when the user asks to search the web, look something up, find information, or get \
         current/recent information. Pass \"query\" in args with the search phrase. Prefer this \
         for current events, news, and broad lookups."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(r#"<tool_call>{"name":"web_search","args":{"query":"..."}}</tool_call>"#)
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("query")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .or_else(|| args.get("q"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if query.is_empty() {
            return Ok("Error: missing \"query\" argument for DuckDuckGo search.".to_string());
        }
        match self.client.search(query).await {
            Ok(results) => Ok(format_results(&results, 8)),
            Err(e) => Ok(format!("DuckDuckGo search failed: {e}")),
        }
    }
}

fn format_results(results: &[WebSearchResult], max: usize) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }
    results
        .iter()
        .take(max)
        .enumerate()
        .map(|(i, result)| {
            let snippet = result
                .snippet
                .as_deref()
                .map(|s| format!(" - {s}"))
                .unwrap_or_default();
            format!("{}. {}{snippet} ({})", i + 1, result.title, result.url)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r##"
        <div class="result">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&rut=abc">The Rust Programming Language</a>
            <a class="result__snippet" href="#">A language empowering everyone &amp; more.</a>
        </div>
        <div class="result">
            <a class="result__a" href="https://doc.rust-lang.org/book/">The Book &#8211; Learn Rust</a>
        </div>
    "##;

    #[test]
    fn parses_results_and_resolves_redirects() {
        let client = DuckDuckGoClient::default();
        let results = client.parse_html_results(SAMPLE_HTML);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("A language empowering everyone & more.")
        );
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].title, "The Book – Learn Rust");
    }

    #[test]
    fn filters_ad_results() {
        let html = r#"
            <div class="result--ad"><span class="sponsored link">x</span>
            <a class="result__a" href="https://ads.example/landing">Sponsored Thing Offer</a></div>
        "#;
        let client = DuckDuckGoClient::default();
        assert!(client.parse_html_results(html).is_empty());
    }

    #[test]
    fn skips_ad_redirect_urls() {
        assert!(resolve_result_url("https://duckduckgo.com/y.js?ad_domain=x.com&u3=z").is_none());
        assert!(resolve_result_url("/l/?kh=1").is_none());
        assert_eq!(
            resolve_result_url("//example.com/page").as_deref(),
            Some("https://example.com/page")
        );
        assert!(resolve_result_url("javascript:alert(1)").is_none());
    }

    #[test]
    fn percent_decode_handles_plus_and_hex() {
        assert_eq!(percent_decode("a%20b+c"), "a b c");
        assert_eq!(
            percent_decode("https%3A%2F%2Fexample.com"),
            "https://example.com"
        );
        assert_eq!(percent_decode("broken%2"), "broken%2");
    }

    #[test]
    fn entity_decoding() {
        let client = DuckDuckGoClient::default();
        assert_eq!(
            client.decode_html_entities("a &amp; b &#65; &#x42;"),
            "a & b A B"
        );
    }

    #[test]
    fn dedupes_by_url() {
        let html = r#"
            <a class="result__a" href="https://example.com/">First Title Here</a>
            <a class="result__a" href="https://example.com/">Second Title Here</a>
        "#;
        let client = DuckDuckGoClient::default();
        assert_eq!(client.parse_html_results(html).len(), 1);
    }

    #[test]
    fn format_results_numbered() {
        let results = vec![
            WebSearchResult {
                title: "One".into(),
                snippet: Some("first".into()),
                url: "https://one.example".into(),
            },
            WebSearchResult {
                title: "Two".into(),
                snippet: None,
                url: "https://two.example".into(),
            },
        ];
        let formatted = format_results(&results, 8);
        assert_eq!(
            formatted,
            "1. One - first (https://one.example)\n2. Two (https://two.example)"
        );
    }

    #[test]
    fn format_results_empty() {
        assert_eq!(format_results(&[], 8), "No results found.");
    }

    #[tokio::test]
    async fn missing_query_is_reported() {
        let tool = WebSearchTool::new();
        let result = tool.execute(&ToolArgs::new()).await.unwrap();
        assert_eq!(
            result,
            "Error: missing \"query\" argument for DuckDuckGo search."
        );
    }
}
