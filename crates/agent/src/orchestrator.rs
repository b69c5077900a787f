//! The bounded conversation loop.

use std::collections::HashSet;
use std::sync::Arc;

use hearth_config::ModelSpec;
use hearth_core::error::{Error, LlmError};
use hearth_core::llm::LlmService;
use hearth_core::result_format::ToolResultFormat;
use hearth_core::retrieval::RetrievalStore;
use hearth_core::tool::ToolRegistry;
use hearth_core::turn::{last_user_content, Turn};
use hearth_parser::parse_tool_calls;
use hearth_planning::PlanningStore;
use hearth_template::render;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::detector::is_complex_task;

/// Hard cap on generation calls per send. Guarantees termination against a
/// model that requests tools on every turn.
pub const MAX_TURNS: usize = 5;

/// How many knowledge-base chunks to retrieve per turn.
const RETRIEVAL_TOP_K: usize = 5;

/// Drives one conversation through generate → parse → execute cycles until
/// the model answers in plain text or [`MAX_TURNS`] is reached.
///
/// Cheap to clone; all collaborators are shared handles. Each conversation
/// runs its own independent loop instance — there is no cross-conversation
/// ordering.
#[derive(Clone)]
pub struct ChatOrchestrator {
    llm: Arc<dyn LlmService>,
    registry: Arc<ToolRegistry>,
    planning: Arc<PlanningStore>,
    knowledge_base: Option<Arc<dyn RetrievalStore>>,
}

impl ChatOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmService>,
        registry: Arc<ToolRegistry>,
        planning: Arc<PlanningStore>,
    ) -> Self {
        Self {
            llm,
            registry,
            planning,
            knowledge_base: None,
        }
    }

    /// Attach a knowledge base for retrieval context and session-result
    /// persistence.
    pub fn with_knowledge_base(mut self, store: Arc<dyn RetrievalStore>) -> Self {
        self.knowledge_base = Some(store);
        self
    }

    /// Run the loop for the given conversation, streaming visible output.
    ///
    /// Returns a receiver of text pieces: model tokens as they arrive, plus
    /// the separator-wrapped tool-result blocks between turns. The receiver
    /// closes when the interaction is finished. Dropping it cancels the loop
    /// between tokens, before the next tool dispatch.
    ///
    /// Fails only with [`LlmError::ModelNotLoaded`]; every other failure
    /// class degrades into conversation text.
    pub async fn generate_reply(
        &self,
        turns: Vec<Turn>,
        model: &ModelSpec,
        system_prompt: Option<String>,
        chat_key: Option<String>,
    ) -> Result<mpsc::Receiver<String>, Error> {
        if !self.llm.is_loaded() {
            return Err(LlmError::ModelNotLoaded("Model is not loaded.".into()).into());
        }
        // Planning tool calls carry no conversation identifier; point the
        // store at this conversation before anything can dispatch.
        self.planning.set_current_chat(chat_key.as_deref());

        let (tx, rx) = mpsc::channel(32);
        let this = self.clone();
        let model = model.clone();
        tokio::spawn(async move {
            this.run_loop(turns, model, system_prompt, chat_key, tx).await;
        });
        Ok(rx)
    }

    async fn run_loop(
        &self,
        mut turns: Vec<Turn>,
        model: ModelSpec,
        system_prompt: Option<String>,
        chat_key: Option<String>,
        tx: mpsc::Sender<String>,
    ) {
        let stop_sequences = model.chat_template.stop_sequences();
        let mut turn_count = 0;

        while turn_count < MAX_TURNS {
            turn_count += 1;
            if turn_count > 1 {
                debug!(turn = turn_count, "follow-up turn (after tool results)");
            }

            let system_text = self
                .build_system_text(&turns, system_prompt.as_deref(), chat_key.as_deref(), turn_count)
                .await;
            let prompt = render(&turns, Some(&system_text), model.chat_template);
            debug!(
                turn = turn_count,
                prompt_len = prompt.len(),
                "rendered prompt"
            );

            if turn_count > 1 {
                for piece in ["\n\n", "_Generating response…_", "\n\n"] {
                    if tx.send(piece.to_string()).await.is_err() {
                        return;
                    }
                }
            }

            let mut stream = match self
                .llm
                .generate_stream(
                    &prompt,
                    model.default_max_tokens,
                    &stop_sequences,
                    model.default_temperature,
                )
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("generation failed mid-conversation: {e}");
                    return;
                }
            };

            let mut full_response = String::new();
            while let Some(token) = stream.recv().await {
                full_response.push_str(&token);
                if tx.send(token).await.is_err() {
                    // Caller cancelled: stop before any tool dispatch.
                    return;
                }
            }

            // A silent model on a follow-up turn shouldn't end the exchange
            // with nothing visible after the results block.
            if full_response.trim().is_empty() && turn_count > 1 {
                if tx
                    .send("\n(Using the results above.)".to_string())
                    .await
                    .is_err()
                {
                    return;
                }
            }

            let calls = parse_tool_calls(&full_response);
            if calls.is_empty() {
                if !full_response.trim().is_empty() {
                    debug!(
                        response_len = full_response.len(),
                        "no tool calls parsed; treating as final answer"
                    );
                }
                return;
            }

            turns.push(Turn::assistant(full_response.clone()));

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                if tx.is_closed() {
                    return;
                }
                let line = match self.registry.get(&call.name) {
                    Some(tool) => match tool.execute(&call.args).await {
                        Ok(output) => ToolResultFormat::result(&call.name, &output),
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "tool execution failed");
                            ToolResultFormat::error(&call.name, &e.to_string())
                        }
                    },
                    None => ToolResultFormat::result(&call.name, "Tool not found."),
                };
                results.push(line);
            }

            let combined = results.join("\n");
            turns.push(Turn::user(combined.clone()));

            if let (Some(key), Some(store)) = (chat_key.as_deref(), self.knowledge_base.as_ref()) {
                if let Err(e) = store.store_session_results(key, &combined).await {
                    warn!("failed to persist session results: {e}");
                }
            }

            for piece in [
                "\n\n---\n\n".to_string(),
                combined,
                "\n\n---\n\n".to_string(),
            ] {
                if tx.send(piece).await.is_err() {
                    return;
                }
            }
        }
    }

    /// Assemble the per-turn system text: caller system prompt, tool
    /// instructions, complexity addendum, retrieved context, and (from the
    /// second turn on) the plan summary with update instructions.
    async fn build_system_text(
        &self,
        turns: &[Turn],
        system_prompt: Option<&str>,
        chat_key: Option<&str>,
        turn_count: usize,
    ) -> String {
        let tool_instructions = self.registry.instructions_for_prompt();
        let mut system_text = match system_prompt {
            Some(sp) => format!("{sp}\n\n{tool_instructions}"),
            None => tool_instructions,
        };

        if is_complex_task(last_user_content(turns)) {
            system_text.push_str(
                "\n\nThis is a multi-step task. You MUST call create_plan first with concrete \
                 steps (e.g. Research topic, Draft outline, Write section 1, …), then use other \
                 tools and update_step as you go.",
            );
        }

        let retrieved = self.retrieve_context(turns, chat_key).await;
        if !retrieved.is_empty() {
            system_text.push_str(&format!(
                "\n\nRetrieved context (use when relevant to answer):\n{retrieved}"
            ));
        }

        if turn_count > 1 {
            if let Some(plan_text) = chat_key
                .and_then(|key| self.planning.plan_summary_with_update_instructions_for(key))
            {
                system_text.push_str(&format!("\n\n{plan_text}"));
            }
        }
        system_text
    }

    /// Retrieval context for the latest user message: session chunks first,
    /// then general chunks, deduplicated by id.
    async fn retrieve_context(&self, turns: &[Turn], chat_key: Option<&str>) -> String {
        let Some(store) = self.knowledge_base.as_ref() else {
            return String::new();
        };
        if !store.has_documents().await {
            return String::new();
        }
        let Some(query) = last_user_content(turns)
            .map(str::trim)
            .filter(|q| !q.is_empty())
        else {
            return String::new();
        };

        let general = match store.retrieve(query, RETRIEVAL_TOP_K).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("retrieval failed: {e}");
                Vec::new()
            }
        };
        let session = match chat_key {
            Some(key) => store.retrieve_for_session(key).await.unwrap_or_default(),
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for chunk in session.into_iter().chain(general) {
            if seen.insert(chunk.id.clone()) {
                lines.push(format!("[{}] {}", chunk.title, chunk.text));
            }
        }
        lines.join("\n\n")
    }
}
