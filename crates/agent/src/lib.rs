//! Command pipeline: natural language in, validated side effects out.
//!
//! This crate is the "brain" of leadly:
//! - **Orchestrator** (`orchestrator`) - frames the instruction for the
//!   model and enforces the two-mode response contract
//! - **Parser** (`response`) - turns raw model text into a typed,
//!   schema-checked `OrchestratorResponse`
//! - **Executor** (`executor`, `handlers`) - runs the validated action list
//!   against the lead store and message senders, one action at a time
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It proposes actions; it never touches
//! the database or a send path. Required-field gating, the protected-segment
//! send suppression, and the budget/segment rules are re-verified inside the
//! handlers regardless of what the model claimed.

pub mod executor;
pub mod handlers;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod response;

pub use executor::{ActionHandler, Executor, HandlerError, HandlerOutcome};
pub use handlers::default_executor;
pub use llm::{
    CompletionClient, FixedTranscriber, LlmError, OpenAiCompatClient, ScriptedCompletionClient,
    SpeechToText,
};
pub use orchestrator::{OrchestrationError, Orchestrator};
pub use response::{parse, ResponseError};
