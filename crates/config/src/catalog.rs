//! The model catalog — the GGUF chat models Hearth knows how to prompt.
//!
//! Each entry records where the quantized weights live, which chat template
//! the model was trained on, and sensible generation defaults. The template
//! binding is the part that matters: pointing a model at the wrong token
//! grammar degrades output silently.

use hearth_template::ChatTemplateFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "ministral-3-3b-instruct")]
    Ministral3bInstruct,
    #[serde(rename = "mistral-7b-instruct-v0.3")]
    Mistral7bInstructV03,
    #[serde(rename = "llama-3.2-1b-instruct")]
    Llama32_1bInstruct,
    #[serde(rename = "qwen3-0.6b-instruct")]
    Qwen3_0_6bInstruct,
    #[serde(rename = "qwen3-4b-instruct")]
    Qwen3_4bInstruct,
    #[serde(rename = "qwen3-8b-instruct")]
    Qwen3_8bInstruct,
    #[serde(rename = "phi-4-mini-instruct")]
    Phi4MiniInstruct,
}

impl ModelId {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ministral3bInstruct => "Ministral 3B Instruct",
            Self::Mistral7bInstructV03 => "Mistral 7B Instruct v0.3",
            Self::Llama32_1bInstruct => "Llama 3.2 1B Instruct",
            Self::Qwen3_0_6bInstruct => "Qwen3 0.6B Instruct",
            Self::Qwen3_4bInstruct => "Qwen3 4B Instruct",
            Self::Qwen3_8bInstruct => "Qwen3 8B Instruct",
            Self::Phi4MiniInstruct => "Phi-4 mini Instruct",
        }
    }
}

/// Everything the engine needs to know about one model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub id: ModelId,
    /// HuggingFace repository carrying the GGUF file.
    pub repository: &'static str,
    pub file_name: &'static str,
    pub local_file_name: &'static str,
    pub chat_template: ChatTemplateFormat,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub context_window: u32,
    pub recommended: bool,
}

pub const DEFAULT_MODEL: ModelId = ModelId::Qwen3_4bInstruct;

/// Look up the catalog entry for a model.
pub fn spec(id: ModelId) -> ModelSpec {
    match id {
        ModelId::Ministral3bInstruct => ModelSpec {
            id,
            repository: "bartowski/mistralai_Ministral-3-3B-Instruct-2512-GGUF",
            file_name: "mistralai_Ministral-3-3B-Instruct-2512-Q4_K_M.gguf",
            local_file_name: "ministral-3-3b-instruct-q4km.gguf",
            chat_template: ChatTemplateFormat::Mistral,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 32_768,
            recommended: false,
        },
        ModelId::Mistral7bInstructV03 => ModelSpec {
            id,
            repository: "bartowski/Mistral-7B-Instruct-v0.3-GGUF",
            file_name: "Mistral-7B-Instruct-v0.3-Q4_K_M.gguf",
            local_file_name: "mistral-7b-instruct-v0.3.gguf",
            chat_template: ChatTemplateFormat::Mistral,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 32_768,
            recommended: false,
        },
        ModelId::Llama32_1bInstruct => ModelSpec {
            id,
            repository: "bartowski/Llama-3.2-1B-Instruct-GGUF",
            file_name: "Llama-3.2-1B-Instruct-Q4_K_M.gguf",
            local_file_name: "llama-3.2-1b-instruct.gguf",
            chat_template: ChatTemplateFormat::Llama3,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 8_192,
            recommended: true,
        },
        ModelId::Qwen3_0_6bInstruct => ModelSpec {
            id,
            repository: "unsloth/Qwen3-0.6B-GGUF",
            file_name: "Qwen3-0.6B-Q4_K_M.gguf",
            local_file_name: "qwen3-0.6b-instruct.gguf",
            chat_template: ChatTemplateFormat::Qwen3,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 32_768,
            recommended: true,
        },
        ModelId::Qwen3_4bInstruct => ModelSpec {
            id,
            repository: "unsloth/Qwen3-4B-GGUF",
            file_name: "Qwen3-4B-Q4_K_M.gguf",
            local_file_name: "qwen3-4b-instruct.gguf",
            chat_template: ChatTemplateFormat::Qwen3,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 32_768,
            recommended: true,
        },
        ModelId::Qwen3_8bInstruct => ModelSpec {
            id,
            repository: "unsloth/Qwen3-8B-GGUF",
            file_name: "Qwen3-8B-Q4_K_M.gguf",
            local_file_name: "qwen3-8b-instruct.gguf",
            chat_template: ChatTemplateFormat::Qwen3,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 32_768,
            recommended: false,
        },
        ModelId::Phi4MiniInstruct => ModelSpec {
            id,
            repository: "bartowski/microsoft_Phi-4-mini-instruct-GGUF",
            file_name: "microsoft_Phi-4-mini-instruct-Q4_K_M.gguf",
            local_file_name: "phi-4-mini-instruct.gguf",
            chat_template: ChatTemplateFormat::Phi3,
            default_max_tokens: 512,
            default_temperature: 0.7,
            context_window: 131_072,
            recommended: false,
        },
    }
}

/// All catalog entries.
pub fn all_models() -> Vec<ModelSpec> {
    [
        ModelId::Ministral3bInstruct,
        ModelId::Mistral7bInstructV03,
        ModelId::Llama32_1bInstruct,
        ModelId::Qwen3_0_6bInstruct,
        ModelId::Qwen3_4bInstruct,
        ModelId::Qwen3_8bInstruct,
        ModelId::Phi4MiniInstruct,
    ]
    .into_iter()
    .map(spec)
    .collect()
}
