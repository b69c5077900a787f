//! Tool-call extraction from raw model output.
//!
//! The model is an unreliable producer: depending on training idiosyncrasies
//! it may emit the canonical tagged format, XML-ish nested tags, labeled
//! shorthand, bare JSON, smart quotes, trailing commas, or a stream cut off
//! mid-object. This crate runs a cascade of recognizers in fixed priority
//! order — the first recognizer that yields anything wins, so a clean
//! intended format is never polluted by an accidental submatch in a weaker
//! fallback.
//!
//! [`parse_tool_calls`] extracts the calls; [`scrub`] removes the same
//! markup from text before it is shown to a human. Both are total: malformed
//! candidates are dropped silently, never propagated as errors.

mod cascade;
mod json;
mod scrub;

pub use cascade::parse_tool_calls;
pub use scrub::scrub;
