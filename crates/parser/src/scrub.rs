//! Scrubbing — removing tool-call markup before text reaches a human.
//!
//! Applies the same recognizers as the parse cascade to strip matched spans
//! while leaving all other text intact. Complete `<tool_call>…</tool_call>`
//! blocks are removed wherever they appear; an incomplete trailing block is
//! clipped so partial markup never flashes in the UI during streaming.

use serde_json::Value;

use crate::cascade::{parse_json_tool_call, CLOSE_TAG, LABELED_QUOTED_STRING_TOOLS, OPEN_TAG};
use crate::json::{extract_json_object, extract_quoted_string, find_ignore_ascii_case, label_start};

/// The placeholder line streamed while a follow-up generation is pending.
pub(crate) const GENERATING_PLACEHOLDER: &str = "_Generating response…_";

/// Remove all recognized tool-call markup from `text`.
///
/// Never fails: the strip passes are all total, and any span that doesn't
/// fully match a recognized form is left as-is.
pub fn scrub(text: &str) -> String {
    let mut result = strip_tagged(text);
    result = strip_plan_array(&result);
    result = strip_labeled_json(&result);
    result = strip_labeled_quoted(&result);
    result = strip_bare_json(&result);
    result = result.replace(GENERATING_PLACEHOLDER, "");
    result.trim().to_string()
}

/// Remove complete `<tool_call>…</tool_call>` blocks; clip an incomplete
/// trailing block (after salvaging a balanced JSON object if one is there).
fn strip_tagged(text: &str) -> String {
    let mut out = String::new();
    let mut search_start = 0;
    loop {
        let Some(rel) = text[search_start..].find(OPEN_TAG) else {
            out.push_str(&text[search_start..]);
            break;
        };
        let open = search_start + rel;
        out.push_str(&text[search_start..open]);
        let content_start = open + OPEN_TAG.len();
        match text[content_start..].find(CLOSE_TAG) {
            Some(rel_close) => {
                search_start = content_start + rel_close + CLOSE_TAG.len();
            }
            None => match extract_json_object(text, content_start) {
                Some((_, end)) => search_start = end,
                // Broken partial block at the end of the stream: clip it.
                None => break,
            },
        }
    }
    out.trim().to_string()
}

/// Remove the first `create_plan: […]` shorthand block.
fn strip_plan_array(text: &str) -> String {
    let marker = "create_plan";
    let Some(marker_idx) = find_ignore_ascii_case(text, marker) else {
        return text.to_string();
    };
    let after = &text[marker_idx + marker.len()..];
    let Some(colon) = after.find(':') else {
        return text.to_string();
    };
    if !after[..colon].trim().is_empty() {
        return text.to_string();
    }
    let bytes = after.as_bytes();
    let mut scan = colon + 1;
    while scan < after.len() && bytes[scan].is_ascii_whitespace() {
        scan += 1;
    }
    if scan >= after.len() || bytes[scan] != b'[' {
        return text.to_string();
    }
    let mut depth = 0usize;
    let mut i = scan;
    while i < after.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    let prefix = &text[..marker_idx];
                    let block_end = marker_idx + marker.len() + i + 1;
                    let suffix = text.get(block_end..).unwrap_or("");
                    return format!("{prefix}{suffix}").trim().to_string();
                }
            }
            _ => {}
        }
        i += 1;
    }
    text.to_string()
}

/// Remove `label: {json}` blocks where the label matches the object's own
/// `name` field, repeatedly until none remain.
fn strip_labeled_json(text: &str) -> String {
    let mut result = text.to_string();
    while let Some((remove_start, remove_end)) = find_labeled_json_block(&result) {
        result = format!("{}{}", &result[..remove_start], &result[remove_end..]);
    }
    result
}

fn find_labeled_json_block(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < text.len() {
        let rel = text[i..].find(':')?;
        let colon = i + rel;
        let after_colon = colon + 1;
        let mut json_start = after_colon;
        while json_start < text.len() && bytes[json_start].is_ascii_whitespace() {
            json_start += 1;
        }
        if json_start < text.len() && bytes[json_start] == b'{' {
            if let Some((object, object_end)) = extract_json_object(text, json_start) {
                if let Ok(parsed) = serde_json::from_str::<Value>(&object) {
                    let name = parsed.get("name").and_then(Value::as_str).unwrap_or("");
                    let lstart = label_start(text, colon);
                    if !name.is_empty() && &text[lstart..colon] == name {
                        return Some((widen_to_preceding_newline(bytes, lstart), object_end));
                    }
                }
            }
        }
        i = after_colon;
    }
    None
}

/// Remove `toolname: "value"` blocks for the known single-argument tools,
/// repeatedly until none remain.
fn strip_labeled_quoted(text: &str) -> String {
    let mut result = text.to_string();
    while let Some((remove_start, remove_end)) = find_labeled_quoted_block(&result) {
        result = format!("{}{}", &result[..remove_start], &result[remove_end..]);
    }
    result
}

fn find_labeled_quoted_block(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < text.len() {
        let rel = text[i..].find(':')?;
        let colon = i + rel;
        let after_colon = colon + 1;
        let mut quote_start = after_colon;
        while quote_start < text.len() && bytes[quote_start].is_ascii_whitespace() {
            quote_start += 1;
        }
        if quote_start < text.len() && bytes[quote_start] == b'"' {
            if let Some((_, end)) = extract_quoted_string(text, quote_start) {
                let lstart = label_start(text, colon);
                let label = &text[lstart..colon];
                if LABELED_QUOTED_STRING_TOOLS
                    .iter()
                    .any(|(tool, _)| *tool == label)
                {
                    return Some((widen_to_preceding_newline(bytes, lstart), end));
                }
            }
        }
        i = after_colon;
    }
    None
}

fn widen_to_preceding_newline(bytes: &[u8], start: usize) -> usize {
    if start > 0 && (bytes[start - 1] == b'\n' || bytes[start - 1] == b'\r') {
        start - 1
    } else {
        start
    }
}

/// Remove bare `{"name": …}` objects that actually parse as tool calls.
fn strip_bare_json(text: &str) -> String {
    let mut out = String::new();
    let mut search_start = 0;
    while search_start < text.len() {
        let Some(rel) = text[search_start..].find('{') else {
            out.push_str(&text[search_start..]);
            break;
        };
        let brace = search_start + rel;
        let after_brace = text[brace + 1..].trim_start();
        if !after_brace.starts_with("\"name\"") && !after_brace.starts_with("\"Name\"") {
            out.push_str(&text[search_start..=brace]);
            search_start = brace + 1;
            continue;
        }
        let stripped = extract_json_object(text, brace)
            .and_then(|(object, end)| parse_json_tool_call(&object).map(|_| end));
        match stripped {
            Some(end) => {
                out.push_str(&text[search_start..brace]);
                search_start = end;
            }
            None => {
                out.push_str(&text[search_start..=brace]);
                search_start = brace + 1;
            }
        }
    }
    out.trim().to_string()
}
