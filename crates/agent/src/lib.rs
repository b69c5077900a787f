//! The orchestration loop — the heart of Hearth.
//!
//! One send runs a bounded cycle:
//!
//! 1. **Build** the system text (tool instructions + retrieved context +
//!    plan status)
//! 2. **Render** the prompt in the model's chat-template grammar
//! 3. **Stream** tokens from the inference engine, forwarding each to the
//!    caller as it arrives
//! 4. **If tool calls**: execute them in order, append the result block as a
//!    synthetic user turn, loop back to step 1
//! 5. **If plain text**: that's the answer
//!
//! The cycle is hard-capped at [`MAX_TURNS`] generations so a model that
//! keeps calling tools always terminates.

pub mod detector;
pub mod orchestrator;

pub use detector::is_complex_task;
pub use orchestrator::{ChatOrchestrator, MAX_TURNS};
