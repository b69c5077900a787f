//! Chat-template engine for Hearth.
//!
//! Each model family expects its prompt in an exact token grammar — begin
//! sequences, role headers, end-of-turn markers. The literals here are kept
//! bit-for-bit identical to what the target models' own templates emit,
//! blank lines included: wrong delimiters don't error, they silently degrade
//! generation quality.

pub mod format;
pub mod render;

pub use format::{ChatTemplateFormat, TemplateTokens};
pub use render::render;
