//! LlmService trait — the abstraction over the inference engine.
//!
//! The engine itself (GGUF loading, tokenization, sampling) is an external
//! collaborator: Hearth only needs a finite token stream for a rendered
//! prompt. The stream is lazy, finite, and not restartable — the loop
//! consumes it exactly once per turn.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LlmError;

/// A black-box token-stream producer.
///
/// Invoking `generate_stream` while unloaded fails the turn with
/// [`LlmError::ModelNotLoaded`] — the only error class that is fatal to a
/// send. Backends are expected to honor `stop_sequences` themselves and to
/// stop at their own token limit; Hearth bounds the interaction by turn
/// count, not by generation time.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Whether a model is currently loaded and ready to generate.
    fn is_loaded(&self) -> bool;

    /// Stream tokens for the given prompt. The receiver yields token strings
    /// in order and closes when generation finishes.
    async fn generate_stream(
        &self,
        prompt: &str,
        max_tokens: u32,
        stop_sequences: &[String],
        temperature: f32,
    ) -> std::result::Result<mpsc::Receiver<String>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal service that streams a fixed reply one word at a time.
    struct FixedReply(&'static str);

    #[async_trait]
    impl LlmService for FixedReply {
        fn is_loaded(&self) -> bool {
            true
        }

        async fn generate_stream(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _stop_sequences: &[String],
            _temperature: f32,
        ) -> std::result::Result<mpsc::Receiver<String>, LlmError> {
            let (tx, rx) = mpsc::channel(8);
            let words: Vec<String> = self.0.split_inclusive(' ').map(String::from).collect();
            tokio::spawn(async move {
                for word in words {
                    if tx.send(word).await.is_err() {
                        break;
                    }
                }
            });
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn stream_yields_tokens_in_order() {
        let service = FixedReply("hello from the model");
        let mut rx = service
            .generate_stream("prompt", 64, &[], 0.7)
            .await
            .unwrap();

        let mut collected = String::new();
        while let Some(token) = rx.recv().await {
            collected.push_str(&token);
        }
        assert_eq!(collected, "hello from the model");
    }
}
