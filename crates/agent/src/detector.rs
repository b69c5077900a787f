//! Complex-task detection.
//!
//! A phrase-based heuristic over the latest user message. When it fires, the
//! system prompt gains an addendum instructing the model to call
//! `create_plan` before anything else.

const COMPLEX_PHRASES: &[&str] = &[
    "research and write",
    "research then",
    "research and",
    "write an essay",
    "write a short essay",
    "write a two page",
    "write a 2 page",
    "two page essay",
    " essay ",
    " essay.",
    " essay on",
    " essay about",
    "draft then",
    "draft and",
    "outline then",
    "outline and",
    "step by step",
    "step-by-step",
    "steps to ",
    "steps for ",
    "guide to ",
    "guide for ",
    "how-to ",
    "how to do",
    "walkthrough",
    "tutorial on",
    "tutorial for",
    "multi-page",
    "multi page",
    "multiple steps",
    "several steps",
    "break down ",
    "breakdown of",
    "compare ",
    "compare and",
    "compare the",
    "analyze and summarize",
    "analyze then",
    "analyze and",
    "review and summarize",
    "review and",
    "summarize then",
    "summarize and",
    "summarize the",
    "find and summarize",
    "read and summarize",
    "gather and ",
    "check and report",
    "list then explain",
    "list and explain",
    "research then recommend",
    "recommend and explain",
    "pros and cons",
];

/// True when the message indicates a multi-step or long-form task that
/// should start with `create_plan`.
pub fn is_complex_task(message: Option<&str>) -> bool {
    let Some(message) = message else {
        return false;
    };
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    COMPLEX_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_essay_requests() {
        assert!(is_complex_task(Some("Write an essay about the Nile")));
        assert!(is_complex_task(Some("Research and write a report on otters")));
        assert!(is_complex_task(Some("give me a step-by-step guide")));
        assert!(is_complex_task(Some("compare the old and new kingdoms")));
    }

    #[test]
    fn ignores_simple_questions() {
        assert!(!is_complex_task(Some("What is 2+2?")));
        assert!(!is_complex_task(Some("Hi")));
        assert!(!is_complex_task(Some("")));
        assert!(!is_complex_task(None));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(is_complex_task(Some("PROS AND CONS of remote work")));
    }
}
