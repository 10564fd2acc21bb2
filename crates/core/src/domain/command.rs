//! Request-scoped values flowing through one command: the two-mode
//! orchestrator response, per-action results, and the execution context.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::action::{Action, ActionType};

/// How the caller should render an execute-mode result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Table,
    Cards,
    Graph,
    Notice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderHint {
    pub kind: RenderKind,
    pub summary: String,
}

/// The model's answer, already discriminated on `mode`.
///
/// Exactly one of the two variants is ever populated: a clarification
/// carries no actions, and an execute response carries at least one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OrchestratorResponse {
    NeedsClarification {
        explanation: String,
        missing_fields: Vec<String>,
        question: String,
    },
    Execute {
        explanation: String,
        actions: Vec<Action>,
        render: RenderHint,
    },
}

impl OrchestratorResponse {
    pub fn is_clarification(&self) -> bool {
        matches!(self, Self::NeedsClarification { .. })
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Execute { .. })
    }
}

/// Outcome of one action: order-preserving and 1:1 with the action list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_type: ActionType,
    pub data: Option<serde_json::Value>,
    pub message: String,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn succeeded(
        action_type: ActionType,
        data: Option<serde_json::Value>,
        message: impl Into<String>,
    ) -> Self {
        Self { success: true, action_type, data, message: message.into(), error: None }
    }

    pub fn failed(
        action_type: ActionType,
        message: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            action_type,
            data: None,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub overall_success: bool,
    pub results: Vec<ActionResult>,
    pub summary: String,
}

impl ExecutionReport {
    pub fn from_results(results: Vec<ActionResult>) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = total - succeeded;
        let noun = if total == 1 { "action" } else { "actions" };
        let summary = if failed == 0 {
            format!("{succeeded} of {total} {noun} completed")
        } else {
            format!("{succeeded} of {total} {noun} completed, {failed} failed")
        };
        Self { overall_success: failed == 0, results, summary }
    }
}

/// Who is acting. Resolved once by the caller's auth layer; the core never
/// defaults it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub actor_id: String,
    pub timezone: Option<String>,
    pub user_id: Option<String>,
}

impl ExecutionContext {
    pub fn for_actor(actor_id: impl Into<String>) -> Self {
        Self { actor_id: actor_id.into(), timezone: None, user_id: None }
    }

    pub fn ensure_actor(&self) -> Result<(), ContextError> {
        if self.actor_id.trim().is_empty() {
            return Err(ContextError::MissingActorId);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("execution context is missing an actor id")]
    MissingActorId,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ActionResult, ContextError, ExecutionContext, ExecutionReport, OrchestratorResponse,
    };
    use crate::domain::action::ActionType;

    #[test]
    fn mode_tag_discriminates_the_two_variants() {
        let clarification: OrchestratorResponse = serde_json::from_value(json!({
            "mode": "needs_clarification",
            "explanation": "Not enough detail to act.",
            "missing_fields": ["contact_method"],
            "question": "What is John's email or phone number?"
        }))
        .unwrap();
        assert!(clarification.is_clarification());
        assert!(!clarification.is_executable());

        let execute: OrchestratorResponse = serde_json::from_value(json!({
            "mode": "execute",
            "explanation": "Creating the lead.",
            "actions": [{"type": "create_lead", "params": {"name": "Sarah"}}],
            "render": {"kind": "cards", "summary": "1 lead created"}
        }))
        .unwrap();
        assert!(execute.is_executable());
    }

    #[test]
    fn report_summary_counts_successes_and_failures() {
        let report = ExecutionReport::from_results(vec![
            ActionResult::succeeded(ActionType::CreateLead, None, "created"),
            ActionResult::failed(ActionType::SendSms, "send failed", "no phone on file"),
            ActionResult::succeeded(ActionType::GetLeads, None, "found 2 leads"),
        ]);

        assert!(!report.overall_success);
        assert_eq!(report.summary, "2 of 3 actions completed, 1 failed");
    }

    #[test]
    fn report_summary_for_a_clean_single_action_batch() {
        let report = ExecutionReport::from_results(vec![ActionResult::succeeded(
            ActionType::CreateLead,
            None,
            "created",
        )]);

        assert!(report.overall_success);
        assert_eq!(report.summary, "1 of 1 action completed");
    }

    #[test]
    fn blank_actor_id_fails_the_context_precondition() {
        assert_eq!(
            ExecutionContext::for_actor("  ").ensure_actor(),
            Err(ContextError::MissingActorId)
        );
        assert_eq!(ExecutionContext::for_actor("agent-7").ensure_actor(), Ok(()));
    }
}
