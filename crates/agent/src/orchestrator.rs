//! The Orchestrator: frames the instruction for the model, enforces the
//! two-mode contract, and retries exactly once on a typed format failure.

use std::sync::Arc;

use thiserror::Error;

use leadly_core::{ContextError, ExecutionContext, Instruction, OrchestratorResponse};

use crate::llm::{CompletionClient, LlmError};
use crate::prompt::{build_user_prompt, STRICT_JSON_REMINDER, SYSTEM_PROMPT};
use crate::response::{parse, ResponseError};

/// Low fixed sampling temperature: the model is a translator, not a writer.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

const INSTRUCTION_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    InvalidContext(#[from] ContextError),
    /// Transport/quota/provider failure. Never retried here.
    #[error("language model provider failed")]
    Provider(#[from] LlmError),
    /// The model's output stayed unusable after the strict-JSON retry.
    #[error("model output was unusable after a strict-JSON retry (instruction: {instruction_preview:?})")]
    MalformedOutput {
        instruction_preview: String,
        #[source]
        source: ResponseError,
    },
}

pub struct Orchestrator {
    llm: Arc<dyn CompletionClient>,
    temperature: f32,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm, temperature: DEFAULT_TEMPERATURE }
    }

    pub fn with_temperature(llm: Arc<dyn CompletionClient>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Translate one instruction into a typed response.
    ///
    /// Fails with `InvalidContext` before any model call when the actor id
    /// is missing. Retry eligibility is a type check: only a
    /// `ResponseError` from the parser triggers the single corrective
    /// re-invocation; provider errors surface immediately.
    pub async fn orchestrate(
        &self,
        instruction: &Instruction,
        context: &ExecutionContext,
    ) -> Result<OrchestratorResponse, OrchestrationError> {
        context.ensure_actor()?;

        let user_prompt = build_user_prompt(instruction, context);
        let raw = self.llm.complete(SYSTEM_PROMPT, &user_prompt, self.temperature).await?;

        match parse(&raw) {
            Ok(response) => Ok(response),
            Err(format_error) => {
                tracing::warn!(
                    event_name = "orchestrator.format_retry",
                    actor = %context.actor_id,
                    error = %format_error,
                    "model reply failed the contract, retrying once with a strict-JSON reminder"
                );
                let corrective = format!("{user_prompt}\n\n{STRICT_JSON_REMINDER}");
                let raw = self.llm.complete(SYSTEM_PROMPT, &corrective, self.temperature).await?;
                parse(&raw).map_err(|source| OrchestrationError::MalformedOutput {
                    instruction_preview: preview(&instruction.text),
                    source,
                })
            }
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= INSTRUCTION_PREVIEW_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(INSTRUCTION_PREVIEW_CHARS).collect();
    format!("{truncated}…")
}
