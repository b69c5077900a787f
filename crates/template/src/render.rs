//! Prompt rendering — turns + optional system text → model-ready string.

use hearth_core::{Role, Turn};

use crate::format::{ChatTemplateFormat, TemplateTokens};

/// Render an ordered turn list plus optional system text into the exact
/// prompt string the given model family expects.
///
/// Returns the empty string when `turns` is empty. System turns inside
/// `turns` are ignored — system text travels via the `system_text` parameter
/// and is either emitted under the family's system header or, for
/// instruct-style families without one (Mistral), folded into the first user
/// turn. A pure total function: same inputs, same output, no hidden state.
pub fn render(turns: &[Turn], system_text: Option<&str>, format: ChatTemplateFormat) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let system = system_text.filter(|s| !s.is_empty());
    let tokens = format.tokens();
    match format {
        ChatTemplateFormat::Mistral => render_mistral(turns, system, &tokens),
        ChatTemplateFormat::Llama3 => render_llama3(turns, system, &tokens),
        ChatTemplateFormat::Qwen | ChatTemplateFormat::Qwen3 | ChatTemplateFormat::Phi3 => {
            render_header_style(turns, system, &tokens, format.assistant_generation_suffix())
        }
    }
}

/// Mistral instruct: `[INST] … [/INST]` pairs, system text folded into the
/// first user block with a `User:` label.
fn render_mistral(turns: &[Turn], system: Option<&str>, tokens: &TemplateTokens) -> String {
    let bos = tokens.begin_sequence.unwrap_or("");
    let start = tokens.instruct_start.unwrap_or("");
    let end = tokens.instruct_end.unwrap_or("");

    let mut prompt = String::from(bos);
    let mut first = true;
    for turn in turns {
        match turn.role {
            Role::User => {
                if !first {
                    prompt.push_str(end);
                }
                prompt.push_str(start);
                if first && system.is_some() {
                    prompt.push_str(&format!(
                        " User: {}\n\n{}",
                        turn.content,
                        system.unwrap_or("")
                    ));
                } else {
                    prompt.push(' ');
                    prompt.push_str(&turn.content);
                }
                first = false;
            }
            Role::Assistant => {
                prompt.push_str(end);
                prompt.push(' ');
                prompt.push_str(&turn.content);
            }
            // Folded into the first user block above.
            Role::System => {}
        }
    }
    prompt.push_str(end);
    prompt
}

/// Llama 3.x headers. The header literals already end in a blank line and
/// each block adds another — the doubled blank line matches the reference
/// template output for these models exactly.
fn render_llama3(turns: &[Turn], system: Option<&str>, tokens: &TemplateTokens) -> String {
    let bos = tokens.begin_sequence.unwrap_or("");
    let eot = tokens.end_of_turn.unwrap_or("");
    let sys = tokens.system_header.unwrap_or("");
    let usr = tokens.user_header.unwrap_or("");
    let ast = tokens.assistant_header.unwrap_or("");

    let mut prompt = String::from(bos);
    if let Some(system) = system {
        prompt.push_str(&format!("{sys}\n\n{system}{eot}"));
    }
    for turn in turns {
        match turn.role {
            Role::User => prompt.push_str(&format!("{usr}\n\n{}{eot}", turn.content)),
            Role::Assistant => prompt.push_str(&format!("{ast}\n\n{}{eot}", turn.content)),
            Role::System => {}
        }
    }
    prompt.push_str(&format!("{ast}\n\n"));
    prompt
}

/// ChatML-style headers (Qwen, Phi): `header + content + end_of_turn` per
/// block, bare assistant header as the generation cue, optional reasoning
/// suffix after it.
fn render_header_style(
    turns: &[Turn],
    system: Option<&str>,
    tokens: &TemplateTokens,
    assistant_suffix: Option<&str>,
) -> String {
    let eot = tokens.end_of_turn.unwrap_or("");
    let sys = tokens.system_header.unwrap_or("");
    let usr = tokens.user_header.unwrap_or("");
    let ast = tokens.assistant_header.unwrap_or("");

    let mut prompt = String::new();
    if let Some(system) = system {
        prompt.push_str(&format!("{sys}{system}{eot}"));
    }
    for turn in turns {
        match turn.role {
            Role::User => prompt.push_str(&format!("{usr}{}{eot}", turn.content)),
            Role::Assistant => prompt.push_str(&format!("{ast}{}{eot}", turn.content)),
            Role::System => {}
        }
    }
    prompt.push_str(ast);
    if let Some(suffix) = assistant_suffix {
        prompt.push_str(suffix);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mistral_multi_turn() {
        let turns = vec![
            Turn::user("Hello"),
            Turn::assistant("Hi there"),
            Turn::user("How are you?"),
        ];
        let actual = render(
            &turns,
            Some("You are a helpful assistant."),
            ChatTemplateFormat::Mistral,
        );
        let expected = "<s>[INST] User: Hello\n\nYou are a helpful assistant.[/INST] Hi there[/INST][INST] How are you?[/INST]";
        assert_eq!(actual, expected);
    }

    #[test]
    fn mistral_without_system_text() {
        let turns = vec![Turn::user("Hello")];
        let actual = render(&turns, None, ChatTemplateFormat::Mistral);
        assert_eq!(actual, "<s>[INST] Hello[/INST]");
    }

    #[test]
    fn llama3_single_turn() {
        let turns = vec![Turn::user("Hello")];
        let actual = render(
            &turns,
            Some("You are a helpful assistant."),
            ChatTemplateFormat::Llama3,
        );
        let expected = "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n\n\nYou are a helpful assistant.<|eot_id|>\n<|start_header_id|>user<|end_header_id|>\n\n\n\nHello<|eot_id|>\n<|start_header_id|>assistant<|end_header_id|>\n\n\n\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn qwen3_appends_empty_think_block() {
        let turns = vec![Turn::user("What is 2+2?")];
        let actual = render(
            &turns,
            Some("You are a calculator."),
            ChatTemplateFormat::Qwen3,
        );
        let expected = "<|im_start|>system\nYou are a calculator.<|im_end|>\n<|im_start|>user\nWhat is 2+2?<|im_end|>\n<|im_start|>assistant\n<think>\n\n</think>\n\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn qwen_omits_think_block() {
        let turns = vec![Turn::user("Hi")];
        let actual = render(&turns, None, ChatTemplateFormat::Qwen);
        assert_eq!(
            actual,
            "<|im_start|>user\nHi<|im_end|>\n<|im_start|>assistant\n"
        );
    }

    #[test]
    fn phi3_single_turn() {
        let turns = vec![Turn::user("Tell me a joke")];
        let actual = render(
            &turns,
            Some("You are a comedian."),
            ChatTemplateFormat::Phi3,
        );
        let expected =
            "<|system|>\nYou are a comedian.<|end|><|user|>\nTell me a joke<|end|><|assistant|>\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn empty_turns_render_empty_for_every_format() {
        for format in [
            ChatTemplateFormat::Mistral,
            ChatTemplateFormat::Llama3,
            ChatTemplateFormat::Qwen,
            ChatTemplateFormat::Qwen3,
            ChatTemplateFormat::Phi3,
        ] {
            assert_eq!(render(&[], Some("System"), format), "");
        }
    }

    #[test]
    fn render_is_deterministic() {
        let turns = vec![Turn::user("Hello"), Turn::assistant("Hi")];
        let a = render(&turns, Some("Sys"), ChatTemplateFormat::Qwen3);
        let b = render(&turns, Some("Sys"), ChatTemplateFormat::Qwen3);
        assert_eq!(a, b);
    }

    #[test]
    fn system_turns_in_list_are_ignored() {
        let turns = vec![Turn::system("ignored"), Turn::user("Hi")];
        let actual = render(&turns, None, ChatTemplateFormat::Qwen);
        assert!(!actual.contains("ignored"));
        assert!(actual.contains("Hi"));
    }
}
