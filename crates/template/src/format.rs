//! Model-family token sets and stop sequences.

use serde::{Deserialize, Serialize};

/// The chat-template families Hearth can render prompts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatTemplateFormat {
    /// Mistral / Ministral instruct: `<s>[INST] … [/INST]`
    Mistral,
    /// Llama 3.x header style: `<|start_header_id|>role<|end_header_id|>`
    Llama3,
    /// ChatML as used by Qwen 2.x: `<|im_start|>role … <|im_end|>`
    Qwen,
    /// ChatML as used by Qwen 3 — same tokens, plus an empty `<think>` block
    /// appended to the assistant cue to skip reasoning emission.
    Qwen3,
    /// Phi-3.1 / Phi-4 style: `<|user|> … <|end|>`
    Phi3,
}

/// The delimiter literals for one family.
///
/// Exactly one of the instruct pair (`instruct_start`/`instruct_end`) or the
/// header pair (`user_header`/`assistant_header`) is populated per family —
/// never both.
#[derive(Debug, Clone, Copy)]
pub struct TemplateTokens {
    pub begin_sequence: Option<&'static str>,
    pub instruct_start: Option<&'static str>,
    pub instruct_end: Option<&'static str>,
    pub end_of_turn: Option<&'static str>,
    pub system_header: Option<&'static str>,
    pub user_header: Option<&'static str>,
    pub assistant_header: Option<&'static str>,
}

impl ChatTemplateFormat {
    pub fn tokens(self) -> TemplateTokens {
        match self {
            Self::Mistral => TemplateTokens {
                begin_sequence: Some("<s>"),
                instruct_start: Some("[INST]"),
                instruct_end: Some("[/INST]"),
                end_of_turn: Some("</s>"),
                system_header: None,
                user_header: None,
                assistant_header: None,
            },
            Self::Llama3 => TemplateTokens {
                begin_sequence: Some("<|begin_of_text|>"),
                instruct_start: None,
                instruct_end: None,
                end_of_turn: Some("<|eot_id|>\n"),
                system_header: Some("<|start_header_id|>system<|end_header_id|>\n\n"),
                user_header: Some("<|start_header_id|>user<|end_header_id|>\n\n"),
                assistant_header: Some("<|start_header_id|>assistant<|end_header_id|>\n\n"),
            },
            Self::Qwen | Self::Qwen3 => TemplateTokens {
                begin_sequence: None,
                instruct_start: None,
                instruct_end: None,
                end_of_turn: Some("<|im_end|>\n"),
                system_header: Some("<|im_start|>system\n"),
                user_header: Some("<|im_start|>user\n"),
                assistant_header: Some("<|im_start|>assistant\n"),
            },
            Self::Phi3 => TemplateTokens {
                begin_sequence: None,
                instruct_start: None,
                instruct_end: None,
                end_of_turn: Some("<|end|>"),
                system_header: Some("<|system|>\n"),
                user_header: Some("<|user|>\n"),
                assistant_header: Some("<|assistant|>\n"),
            },
        }
    }

    /// Sequences at which the inference engine must stop generating.
    pub fn stop_sequences(self) -> Vec<String> {
        let seqs: &[&str] = match self {
            Self::Mistral => &["</s>", "[INST]", "[/INST]"],
            Self::Llama3 => &["<|eot_id|>", "<|eom_id|>"],
            // The truncated "<|im_end|" guards against the engine splitting
            // the marker across its final token.
            Self::Qwen | Self::Qwen3 => &["<|im_end|>", "<|im_end|", "<|im_start|>"],
            Self::Phi3 => &["<|end|>", "<|user|>", "<|system|>", "<|assistant|>"],
        };
        seqs.iter().map(|s| s.to_string()).collect()
    }

    /// Suffix appended after the assistant cue, for reasoning-capable
    /// families where an empty think block skips chain-of-thought by
    /// convention.
    pub(crate) fn assistant_generation_suffix(self) -> Option<&'static str> {
        match self {
            Self::Qwen3 => Some("<think>\n\n</think>\n\n"),
            _ => None,
        }
    }
}
