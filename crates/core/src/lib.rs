pub mod audit;
pub mod config;
pub mod domain;
pub mod policy;
pub mod rules;

pub use audit::{AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::action::{Action, ActionType, ValidationError, ValidatedAction};
pub use domain::command::{
    ActionResult, ContextError, ExecutionContext, ExecutionReport, OrchestratorResponse,
    RenderHint, RenderKind,
};
pub use domain::instruction::{validate_input, Instruction, InstructionContext, InstructionError};
pub use domain::lead::{Lead, LeadDraft, LeadFilter, LeadId, LeadPatch};
pub use domain::message::{
    Communication, CommunicationDirection, CommunicationDraft, MessageChannel, PendingMessage,
    PendingMessageDraft,
};
pub use policy::{DispatchDecision, SendPolicy};
pub use rules::{
    missing_required_fields, segments_for_create, segments_for_update, MissingField,
    HNW_BUDGET_CEILING, HNW_SEGMENT,
};
