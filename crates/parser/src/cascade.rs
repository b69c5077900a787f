//! The recognizer cascade.
//!
//! Recognizers run in fixed priority order and the first one that yields a
//! non-empty result wins. The tagged and structured-tag forms may return
//! several calls per response (document order); the shorthand and bare forms
//! return at most one call — they exist only as single-call fallbacks.

use hearth_core::{ToolArgs, ToolCall};
use serde_json::Value;
use tracing::debug;

use crate::json::{
    extract_json_object, extract_quoted_string, find_ignore_ascii_case, label_start, lenient_json,
    normalize_unicode_quotes, normalize_value, strip_non_printable_ascii,
};

pub(crate) const OPEN_TAG: &str = "<tool_call>";
pub(crate) const CLOSE_TAG: &str = "</tool_call>";

/// Tools that accept a single quoted string; tool name → argument key.
pub(crate) const LABELED_QUOTED_STRING_TOOLS: &[(&str, &str)] = &[
    ("web_search", "query"),
    ("wikipedia", "query"),
    ("fetch_page", "url"),
];

/// Extract all tool calls from raw model output.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let normalized = normalize_unicode_quotes(text);

    let mut results = parse_tagged(&normalized);
    if results.is_empty() {
        results = parse_structured_tags(&normalized);
    }
    if results.is_empty() {
        results.extend(parse_plan_array(&normalized));
    }
    if results.is_empty() {
        results.extend(parse_labeled_json(&normalized));
    }
    if results.is_empty() {
        results.extend(parse_labeled_quoted_string(&normalized));
    }
    if results.is_empty() {
        results.extend(parse_bare_json(&normalized));
    }

    if !results.is_empty() {
        debug!(
            count = results.len(),
            tools = ?results.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "parsed tool calls"
        );
    }
    results
}

/// Tagged form: `<tool_call>{json}</tool_call>`. A missing closing tag
/// (stream truncated) falls back to extracting exactly one balanced JSON
/// object after the opening tag.
fn parse_tagged(text: &str) -> Vec<ToolCall> {
    let mut results = Vec::new();
    let mut search_start = 0;
    while let Some(rel) = text[search_start..].find(OPEN_TAG) {
        let open = search_start + rel;
        let content_start = open + OPEN_TAG.len();
        let (content, next_start) = match text[content_start..].find(CLOSE_TAG) {
            Some(rel_close) => {
                let close = content_start + rel_close;
                (
                    text[content_start..close].trim().to_string(),
                    close + CLOSE_TAG.len(),
                )
            }
            None => match extract_json_object(text, content_start) {
                Some(extracted) => extracted,
                None => break,
            },
        };
        if let Some(call) = parse_json_tool_call(&content) {
            results.push(call);
        }
        search_start = next_start;
    }
    results
}

/// Structured-tag form: an XML-ish call inside the same outer delimiters,
/// naming the tool and each argument as its own tag pair:
/// `<tool_call><function_name>n</function_name><query>v</query></tool_call>`.
fn parse_structured_tags(text: &str) -> Vec<ToolCall> {
    let mut results = Vec::new();
    let mut search_start = 0;
    loop {
        let Some(rel) = text[search_start..].find(OPEN_TAG) else {
            break;
        };
        let content_start = search_start + rel + OPEN_TAG.len();
        let Some(rel_close) = text[content_start..].find(CLOSE_TAG) else {
            break;
        };
        let close = content_start + rel_close;
        let inner = text[content_start..close].trim();
        search_start = close + CLOSE_TAG.len();

        let Some(name) =
            extract_tag_content(inner, "function_name").or_else(|| extract_tag_content(inner, "name"))
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let mut args = ToolArgs::new();
        let mut i = 0;
        while i < inner.len() {
            let Some(tag_start) = inner[i..].find('<').map(|r| i + r) else {
                break;
            };
            let Some(tag_end) = inner[tag_start..].find('>').map(|r| tag_start + r) else {
                break;
            };
            let tag_name = inner[tag_start + 1..tag_end].trim();
            if tag_name.is_empty() || tag_name.starts_with('/') {
                i = tag_end + 1;
                continue;
            }
            let close_tag = format!("</{tag_name}>");
            let value_start = tag_end + 1;
            let Some(value_end) = inner[value_start..].find(&close_tag).map(|r| value_start + r)
            else {
                i = tag_end + 1;
                continue;
            };
            let value = inner[value_start..value_end].trim();
            if tag_name != "function_name" && tag_name != "name" {
                args.insert(tag_name.to_string(), Value::String(value.to_string()));
            }
            i = value_end + close_tag.len();
        }
        results.push(ToolCall::new(name, args));
    }
    results
}

fn extract_tag_content(inner: &str, tag_name: &str) -> Option<String> {
    let open = format!("<{tag_name}>");
    let close = format!("</{tag_name}>");
    let start = inner.find(&open)?;
    let content_start = start + open.len();
    let end = inner[content_start..].find(&close)? + content_start;
    Some(inner[content_start..end].trim().to_string())
}

/// Plan-creation shorthand: `create_plan: [ … ]` with no JSON wrapper.
/// Array elements may be plain strings or objects carrying a `step` field.
fn parse_plan_array(text: &str) -> Option<ToolCall> {
    let marker = "create_plan";
    let marker_idx = find_ignore_ascii_case(text, marker)?;
    let after = &text[marker_idx + marker.len()..];
    let colon = after.find(':')?;
    if !after[..colon].trim().is_empty() {
        return None;
    }
    let bytes = after.as_bytes();
    let mut scan = colon + 1;
    while scan < after.len() && bytes[scan].is_ascii_whitespace() {
        scan += 1;
    }
    if scan >= after.len() {
        return None;
    }
    // Allow an optional "steps" label before the array
    // (e.g. `create_plan: steps["A", "B"]`).
    if after.len() >= scan + 5 && after[scan..scan + 5].eq_ignore_ascii_case("steps") {
        scan += 5;
        while scan < after.len() && (bytes[scan].is_ascii_whitespace() || bytes[scan] == b'=') {
            scan += 1;
        }
    }
    if scan >= after.len() || bytes[scan] != b'[' {
        return None;
    }

    let mut depth = 0usize;
    let mut i = scan;
    while i < after.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return plan_call_from_array(&after[scan..=i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn plan_call_from_array(slice: &str) -> Option<ToolCall> {
    let parsed: Value = serde_json::from_str(&lenient_json(slice)).ok()?;
    let items = parsed.as_array()?;
    let mut steps = Vec::new();
    for item in items {
        let step = match item {
            Value::String(s) => s.trim().to_string(),
            Value::Object(obj) => obj
                .get("step")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            other => other.to_string().trim().to_string(),
        };
        if !step.is_empty() {
            steps.push(Value::String(step));
        }
    }
    if steps.is_empty() {
        return None;
    }
    let mut args = ToolArgs::new();
    args.insert("steps".into(), Value::Array(steps));
    Some(ToolCall::new("create_plan", args))
}

/// Labeled-JSON shorthand: `label: {json}`. If the object carries its own
/// `name`, the embedded call wins; otherwise the label is the tool name and
/// the object's fields are the arguments directly.
fn parse_labeled_json(text: &str) -> Option<ToolCall> {
    let bytes = text.as_bytes();
    let mut search_start = 0;
    while let Some(rel) = text[search_start..].find(':') {
        let colon = search_start + rel;
        let after_colon = colon + 1;
        let mut json_start = after_colon;
        while json_start < text.len() && bytes[json_start].is_ascii_whitespace() {
            json_start += 1;
        }
        if json_start >= text.len() || bytes[json_start] != b'{' {
            search_start = after_colon;
            continue;
        }
        let Some((object, object_end)) = extract_json_object(text, json_start) else {
            search_start = after_colon;
            continue;
        };
        if let Some(call) = parse_json_tool_call(&object) {
            return Some(call);
        }
        // No "name"/"args" wrapper: the label itself names the tool and the
        // object's fields are the arguments (e.g. `create_plan: {"steps":[…]}`).
        let label = text[label_start(text, colon)..colon].trim();
        if !label.is_empty() {
            if let Ok(Value::Object(map)) =
                serde_json::from_str::<Value>(&lenient_json(object.trim()))
            {
                let mut args = ToolArgs::new();
                for (key, value) in map {
                    if !value.is_null() {
                        args.insert(key, normalize_value(value));
                    }
                }
                if !args.is_empty() {
                    return Some(ToolCall::new(label, normalize_steps(args)));
                }
            }
        }
        search_start = object_end;
    }
    None
}

/// Labeled-quoted-string shorthand: `web_search: "query text"` for the small
/// fixed set of single-argument tools.
fn parse_labeled_quoted_string(text: &str) -> Option<ToolCall> {
    let bytes = text.as_bytes();
    let mut search_start = 0;
    while let Some(rel) = text[search_start..].find(':') {
        let colon = search_start + rel;
        let after_colon = colon + 1;
        let mut quote_start = after_colon;
        while quote_start < text.len() && bytes[quote_start].is_ascii_whitespace() {
            quote_start += 1;
        }
        if quote_start >= text.len() || bytes[quote_start] != b'"' {
            search_start = after_colon;
            continue;
        }
        let Some((value, _end)) = extract_quoted_string(text, quote_start) else {
            search_start = after_colon;
            continue;
        };
        let label = &text[label_start(text, colon)..colon];
        let Some((_, arg_key)) = LABELED_QUOTED_STRING_TOOLS
            .iter()
            .find(|(tool, _)| *tool == label)
        else {
            search_start = after_colon;
            continue;
        };
        let mut args = ToolArgs::new();
        args.insert(arg_key.to_string(), Value::String(value));
        return Some(ToolCall::new(label, args));
    }
    None
}

/// Bare JSON form: `{"name": …, …}` with no wrapper and no label. Only
/// recognized when the first key after `{` is literally `"name"` — the
/// deliberate (and deliberately permissive) guard against matching
/// unrelated JSON in the response.
fn parse_bare_json(text: &str) -> Option<ToolCall> {
    let mut search_start = 0;
    while search_start < text.len() {
        let Some(rel) = text[search_start..].find('{') else {
            break;
        };
        let brace = search_start + rel;
        let after_brace = text[brace + 1..].trim_start();
        if !after_brace.starts_with("\"name\"") && !after_brace.starts_with("\"Name\"") {
            search_start = brace + 1;
            continue;
        }
        let Some((object, object_end)) = extract_json_object(text, brace) else {
            search_start = brace + 1;
            continue;
        };
        if let Some(call) = parse_json_tool_call(&object) {
            return Some(call);
        }
        search_start = object_end;
    }
    None
}

/// Parse one candidate JSON span as a `{"name": …, "args": {…}}` call.
///
/// Top-level keys other than `name`/`args` merge into the arguments (some
/// models flatten), `args` keys winning on conflict. Retries once with
/// non-printable ASCII stripped. Malformed JSON yields `None` — the caller
/// drops that one candidate and moves on.
pub(crate) fn parse_json_tool_call(content: &str) -> Option<ToolCall> {
    try_parse_call(content).or_else(|| try_parse_call(&strip_non_printable_ascii(content)))
}

fn try_parse_call(raw: &str) -> Option<ToolCall> {
    let lenient = lenient_json(raw.trim());
    let parsed: Value = match serde_json::from_str(&lenient) {
        Ok(value) => value,
        // Trailing garbage after the object (stray closing braces, prose):
        // parse just the first balanced object.
        Err(_) => {
            let (object, _) = extract_json_object(&lenient, 0)?;
            serde_json::from_str(&object).ok()?
        }
    };
    let obj = parsed.as_object()?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            obj.get("Name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })?
        .to_string();

    let mut args = ToolArgs::new();
    if let Some(Value::Object(args_obj)) = obj.get("args") {
        for (key, value) in args_obj {
            if !value.is_null() {
                args.insert(key.clone(), normalize_value(value.clone()));
            }
        }
    }
    for (key, value) in obj {
        if key == "name" || key == "Name" || key == "args" {
            continue;
        }
        if args.contains_key(key) || value.is_null() {
            continue;
        }
        args.insert(key.clone(), normalize_value(value.clone()));
    }
    Some(ToolCall::new(name, normalize_steps(args)))
}

/// Normalize a `steps` argument: a list of step objects becomes a list of
/// step strings by pulling one of `title`/`name`/`step` from each object.
pub(crate) fn normalize_steps(mut args: ToolArgs) -> ToolArgs {
    let Some(Value::Array(items)) = args.get("steps") else {
        return args;
    };
    let mut steps = Vec::new();
    for item in items {
        let step = match item {
            Value::Object(obj) => ["title", "name", "step"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            Value::String(s) => s.trim().to_string(),
            _ => String::new(),
        };
        if !step.is_empty() {
            steps.push(Value::String(step));
        }
    }
    if !steps.is_empty() {
        args.insert("steps".into(), Value::Array(steps));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_returns_empty() {
        assert!(parse_tool_calls("").is_empty());
    }

    #[test]
    fn no_tool_call_returns_empty() {
        assert!(parse_tool_calls("Just some text and no tool_call.").is_empty());
    }

    #[test]
    fn single_tagged_call() {
        let text = r#"Here is the result: <tool_call>{"name": "get_plan", "args": {}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_plan");
        assert!(calls[0].args.is_empty());
    }

    #[test]
    fn tagged_call_with_args() {
        let text = r#"<tool_call>{"name": "web_search", "args": {"query": "weather"}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].args["query"], json!("weather"));
    }

    #[test]
    fn multiple_tagged_calls_in_document_order() {
        let text = "<tool_call>{\"name\": \"get_plan\", \"args\": {}}</tool_call>\nand\n<tool_call>{\"name\": \"web_search\", \"args\": {\"q\": \"test\"}}</tool_call>";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "get_plan");
        assert_eq!(calls[1].name, "web_search");
        assert_eq!(calls[1].args["q"], json!("test"));
    }

    #[test]
    fn malformed_json_skips_that_call() {
        let text = r#"<tool_call>{"name": "calendar", "args": }</tool_call>"#;
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn missing_closing_tag_parses_one_call() {
        let text = r#"prefix <tool_call>{"name":"fetch_page","args":{"url":"https://a.example"}}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "fetch_page");
        assert_eq!(calls[0].args["url"], json!("https://a.example"));
    }

    #[test]
    fn missing_closing_tag_with_trailing_text() {
        let text = r#" <tool_call>{"name":"x","args":{}} more text"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "x");
    }

    #[test]
    fn structured_tag_form() {
        let text = "<tool_call>\n<function_name>web_search</function_name>\n<query>rust 1.88</query>\n</tool_call>";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].args["query"], json!("rust 1.88"));
    }

    #[test]
    fn plan_array_shorthand() {
        let text = r#"create_plan:  [{"step":"Identify the rules.","index":0}, {"step":"Explain the exceptions.","index":1}]"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "create_plan");
        assert_eq!(
            calls[0].args["steps"],
            json!(["Identify the rules.", "Explain the exceptions."])
        );
    }

    #[test]
    fn plan_array_shorthand_with_steps_prefix() {
        let text = r#"create_plan: steps["Research", "Write"]"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["steps"], json!(["Research", "Write"]));
    }

    #[test]
    fn labeled_json_with_embedded_name() {
        let text = r#"read_attached_file: {"name":"read_attached_file","args":{"index":1,"part":1}}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_attached_file");
        assert_eq!(calls[0].args["index"], json!(1));
        assert_eq!(calls[0].args["part"], json!(1));
    }

    #[test]
    fn labeled_json_with_newline_after_label() {
        let text = "read_attached_file:\n{\"name\":\"read_attached_file\",\"args\":{\"index\":1,\"part\":1}}";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_attached_file");
    }

    #[test]
    fn labeled_json_label_becomes_tool_name() {
        let text = r#"create_plan: {"steps":["Research","Write"]}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "create_plan");
        assert_eq!(calls[0].args["steps"], json!(["Research", "Write"]));
    }

    #[test]
    fn labeled_quoted_string_web_search() {
        let text = r#"web_search: "old and new kingdom dates for ancient egypt""#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(
            calls[0].args["query"],
            json!("old and new kingdom dates for ancient egypt")
        );
    }

    #[test]
    fn labeled_quoted_string_wikipedia() {
        let text = r#"wikipedia: "Ancient Egypt""#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "wikipedia");
        assert_eq!(calls[0].args["query"], json!("Ancient Egypt"));
    }

    #[test]
    fn labeled_quoted_string_unknown_tool_ignored() {
        let text = r#"note: "not a tool call""#;
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn bare_json_call() {
        let text = r#"Here you go: {"name":"web_search","args":{"query":"weather today"}}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].args["query"], json!("weather today"));
    }

    #[test]
    fn labeled_json_embedded_name_wins_over_label() {
        let text = r#"config: {"mode":"fast","name":"x"}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "x");
        assert_eq!(calls[0].args["mode"], json!("fast"));
    }

    #[test]
    fn bare_json_requires_name_as_first_key() {
        let text = r#"totals {"mode":"fast","count":2} done"#;
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn trailing_comma_tolerated() {
        let text = r#"<tool_call>{"name":"calculator","args":{"expression":"2+2"},}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "calculator");
    }

    #[test]
    fn exact_calculator_call() {
        let text = r#"<tool_call>{"name":"calculator","args":{"expression":"15*12"}}</tool_call>"#;
        assert_eq!(text.len(), 74);
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "calculator");
        assert_eq!(calls[0].args["expression"], json!("15*12"));
    }

    #[test]
    fn smart_quotes_normalized() {
        let text = "<tool_call>{\u{201C}name\u{201D}:\u{201C}calculator\u{201D},\u{201C}args\u{201D}:{\u{201C}expression\u{201D}:\u{201C}15*12\u{201D}}}</tool_call>";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "calculator");
        assert_eq!(calls[0].args["expression"], json!("15*12"));
    }

    #[test]
    fn cascade_priority_tagged_beats_bare() {
        // A bare-JSON-looking fragment inside the tagged call's own
        // arguments must not produce a second call.
        let text = r#"<tool_call>{"name":"outer","args":{"payload":{"name":"inner"}}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "outer");
    }

    #[test]
    fn top_level_params_merge_into_args() {
        let text = r#"<tool_call>{"name":"create_plan","steps":["A","B"]}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["steps"], json!(["A", "B"]));
    }

    #[test]
    fn whole_floats_collapse_to_integers() {
        let text = r#"<tool_call>{"name":"unit_conversion","args":{"value":5.0,"from_unit":"miles","to_unit":"km"}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls[0].args["value"], json!(5));
    }

    #[test]
    fn steps_objects_normalize_by_title_name_step() {
        let text = r#"<tool_call>{"name":"create_plan","args":{"steps":[{"title":"A"},{"name":"B"},{"step":"C"}]}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls[0].args["steps"], json!(["A", "B", "C"]));
    }

    #[test]
    fn round_trip_tagged_render() {
        let args = json!({"query": "rust", "top_k": 3});
        let rendered = format!(
            "<tool_call>{}</tool_call>",
            json!({"name": "web_search", "args": args})
        );
        let calls = parse_tool_calls(&rendered);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].args["query"], json!("rust"));
        assert_eq!(calls[0].args["top_k"], json!(3));
    }
}
