//! Lenient JSON machinery shared by the recognizers.
//!
//! Everything here scans byte positions but only ever compares or slices at
//! ASCII delimiters, so multi-byte UTF-8 content passes through untouched.

use serde_json::Value;

/// Replace Unicode double-quote codepoints with ASCII `"` so JSON parsing
/// and balanced-object extraction work on smart-quoted model output.
pub(crate) fn normalize_unicode_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' // LEFT DOUBLE QUOTATION MARK
            | '\u{201D}' // RIGHT DOUBLE QUOTATION MARK
            | '\u{201E}' // DOUBLE LOW-9 QUOTATION MARK
            | '\u{201F}' // DOUBLE HIGH-REVERSED-9 QUOTATION MARK
            | '\u{2033}' // DOUBLE PRIME
            | '\u{2036}' // REVERSED DOUBLE PRIME
            => '"',
            other => other,
        })
        .collect()
}

/// Strip trailing commas before `}` or `]` and normalize quotes, so a
/// strict JSON parser accepts typical model output drift.
pub(crate) fn lenient_json(json: &str) -> String {
    let normalized = normalize_unicode_quotes(json);
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = String::with_capacity(normalized.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Strip control and other non-printable ASCII so stray characters from
/// streaming don't break JSON.
pub(crate) fn strip_non_printable_ascii(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            u >= 0x20 && u != 0x7F
        })
        .collect()
}

/// Extract one balanced `{…}` object starting at or after `start`.
/// Returns the object text and the byte index just past its closing brace.
/// String literals (single- or double-quoted) are skipped with escape
/// handling so braces inside them don't affect the depth count.
pub(crate) fn extract_json_object(text: &str, start: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'{' {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    let object_start = i;
    let mut depth = 1usize;
    i += 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_json_string(text, i)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((text[object_start..=i].to_string(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the byte index after the closing quote, or `None` if the string
/// is unclosed.
fn skip_json_string(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = *bytes.get(start)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Extract a double-quoted string starting exactly at `start`, with `\`
/// escapes resolved. Returns the value and the byte index after the closing
/// quote.
pub(crate) fn extract_quoted_string(text: &str, start: usize) -> Option<(String, usize)> {
    if !text[start..].starts_with('"') {
        return None;
    }
    let mut out = String::new();
    let mut escaped = false;
    for (off, c) in text[start + 1..].char_indices() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((out, start + 1 + off + 1)),
            _ => out.push(c),
        }
    }
    None
}

/// Recursively normalize a parsed value: drop nulls from containers, and
/// collapse float numbers with no fractional part to integers.
pub(crate) fn normalize_value(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                        return Value::Number((f as i64).into());
                    }
                }
            }
            Value::Number(n)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(normalize_value)
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Byte index of the first case-insensitive occurrence of an ASCII needle.
pub(crate) fn find_ignore_ascii_case(text: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || text.len() < needle.len() {
        return None;
    }
    let text_bytes = text.as_bytes();
    let needle_bytes = needle.as_bytes();
    (0..=text_bytes.len() - needle_bytes.len())
        .find(|&i| text_bytes[i..i + needle_bytes.len()].eq_ignore_ascii_case(needle_bytes))
}

/// Scan back from `end` over identifier characters (`[A-Za-z0-9_]`) and
/// return the byte index where the label starts.
pub(crate) fn label_start(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = end;
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    start
}
