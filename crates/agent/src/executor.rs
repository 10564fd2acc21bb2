//! The Executor: runs a validated action list strictly in order, chains a
//! lookup result into the next action's missing lead id, isolates per-action
//! failure, and aggregates results into a report.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use leadly_comms::SendError;
use leadly_core::{
    Action, ActionResult, ActionType, ContextError, ExecutionContext, ExecutionReport,
    ValidatedAction,
};
use leadly_db::repositories::RepositoryError;

/// What a handler hands back on success.
#[derive(Clone, Debug)]
pub struct HandlerOutcome {
    pub data: Option<serde_json::Value>,
    pub message: String,
}

impl HandlerOutcome {
    pub fn new(data: Option<serde_json::Value>, message: impl Into<String>) -> Self {
        Self { data, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// A business-rule gate failed; nothing was persisted.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Send(#[from] SendError),
    /// The handler was registered for a type it cannot process.
    #[error("no handler behavior for {0}")]
    Unsupported(ActionType),
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(
        &self,
        action: &ValidatedAction,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Registry-driven executor. One handler per action type; types without a
/// registered handler fail that action with a "not implemented" result
/// instead of crashing the batch.
#[derive(Default)]
pub struct Executor {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action_type, handler);
    }

    pub fn register_many(&mut self, action_types: &[ActionType], handler: Arc<dyn ActionHandler>) {
        for action_type in action_types {
            self.handlers.insert(*action_type, handler.clone());
        }
    }

    /// Run every action, in order, awaiting each before the next.
    ///
    /// Never fails for an individual action; only a missing actor id is
    /// fatal, before any action runs. The submitted list is never mutated -
    /// chaining derives a per-step resolved parameter object instead.
    pub async fn execute_all(
        &self,
        actions: &[Action],
        context: &ExecutionContext,
    ) -> Result<ExecutionReport, ContextError> {
        context.ensure_actor()?;

        let mut results: Vec<ActionResult> = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let resolved = resolve_chained_params(action, results.last());
            let result = self.execute_one(action.action_type, resolved, context).await;
            if result.success {
                tracing::info!(
                    event_name = "executor.action_completed",
                    action_type = %action.action_type,
                    actor = %context.actor_id,
                    index,
                    "action completed"
                );
            } else {
                tracing::warn!(
                    event_name = "executor.action_failed",
                    action_type = %action.action_type,
                    actor = %context.actor_id,
                    index,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "action failed, continuing with the rest of the batch"
                );
            }
            results.push(result);
        }

        Ok(ExecutionReport::from_results(results))
    }

    async fn execute_one(
        &self,
        action_type: ActionType,
        params: serde_json::Value,
        context: &ExecutionContext,
    ) -> ActionResult {
        let envelope = Action::new(action_type, params);
        let validated = match envelope.validate() {
            Ok(validated) => validated,
            Err(error) => {
                return ActionResult::failed(action_type, "validation failed", error.to_string())
            }
        };

        let Some(handler) = self.handlers.get(&action_type) else {
            return ActionResult::failed(
                action_type,
                "action is not implemented",
                format!("no handler is registered for {action_type}"),
            );
        };

        match handler.run(&validated, context).await {
            Ok(outcome) => ActionResult::succeeded(action_type, outcome.data, outcome.message),
            Err(error) => {
                ActionResult::failed(action_type, failure_headline(&error), error.to_string())
            }
        }
    }
}

fn failure_headline(error: &HandlerError) -> &'static str {
    match error {
        HandlerError::Validation(_) => "validation failed",
        HandlerError::Repository(RepositoryError::NotFoundOrForbidden(_)) => {
            "lead not found or owned by another actor"
        }
        HandlerError::Repository(_) => "persistence failure",
        HandlerError::Send(_) => "message delivery failed",
        HandlerError::Unsupported(_) => "action is not implemented",
    }
}

/// Best-effort convenience chaining: one step back, first item only.
///
/// If the action accepts a lead id, that id is absent or a placeholder, and
/// the immediately preceding result is a successful lookup with a non-empty
/// list, the first item's id is injected into a derived copy of the params.
fn resolve_chained_params(
    action: &Action,
    previous: Option<&ActionResult>,
) -> serde_json::Value {
    let mut params = action.params.clone();
    if !action.action_type.accepts_lead_id() {
        return params;
    }
    if !is_placeholder_id(params.get("lead_id")) {
        return params;
    }
    let Some(previous) = previous else {
        return params;
    };
    if !previous.action_type.is_lookup() || !previous.success {
        return params;
    }
    let Some(first_id) = previous
        .data
        .as_ref()
        .and_then(|data| data.as_array())
        .and_then(|items| items.first())
        .and_then(|item| item.get("id"))
        .and_then(|id| id.as_str())
    else {
        return params;
    };

    if let serde_json::Value::Object(map) = &mut params {
        map.insert("lead_id".to_string(), serde_json::Value::String(first_id.to_string()));
    }
    params
}

fn is_placeholder_id(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return true;
            }
            if trimmed.starts_with('<') && trimmed.ends_with('>') {
                return true;
            }
            if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
                return true;
            }
            matches!(
                trimmed.to_ascii_uppercase().as_str(),
                "PLACEHOLDER" | "LEAD_ID" | "PREVIOUS" | "FROM_PREVIOUS" | "PREVIOUS_RESULT"
            )
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use leadly_core::{
        Action, ActionResult, ActionType, ContextError, ExecutionContext, ValidatedAction,
    };

    use super::{
        is_placeholder_id, resolve_chained_params, ActionHandler, Executor, HandlerError,
        HandlerOutcome,
    };

    struct StubHandler {
        data: Option<serde_json::Value>,
        fail: bool,
        seen: Arc<Mutex<Vec<ValidatedAction>>>,
    }

    impl StubHandler {
        fn new(data: Option<serde_json::Value>) -> (Arc<Self>, Arc<Mutex<Vec<ValidatedAction>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            (Arc::new(Self { data, fail: false, seen: seen.clone() }), seen)
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { data: None, fail: true, seen: Arc::new(Mutex::new(Vec::new())) })
        }
    }

    #[async_trait]
    impl ActionHandler for StubHandler {
        async fn run(
            &self,
            action: &ValidatedAction,
            _context: &ExecutionContext,
        ) -> Result<HandlerOutcome, HandlerError> {
            self.seen.lock().unwrap().push(action.clone());
            if self.fail {
                return Err(HandlerError::Validation("stubbed failure".to_string()));
            }
            Ok(HandlerOutcome::new(self.data.clone(), "ok"))
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::for_actor("agent-1")
    }

    #[tokio::test]
    async fn missing_actor_is_fatal_before_any_action_runs() {
        let (handler, seen) = StubHandler::new(None);
        let mut executor = Executor::new();
        executor.register(ActionType::GetLeads, handler);

        let result = executor
            .execute_all(
                &[Action::new(ActionType::GetLeads, json!({}))],
                &ExecutionContext::default(),
            )
            .await;

        assert!(matches!(result, Err(ContextError::MissingActorId)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn an_invalid_middle_action_does_not_stop_the_batch() {
        let (handler, _) = StubHandler::new(None);
        let mut executor = Executor::new();
        executor.register_many(&[ActionType::GetLeads, ActionType::GetLeadById], handler);

        let actions = [
            Action::new(ActionType::GetLeads, json!({})),
            // Invalid: update_lead with an empty patch.
            Action::new(ActionType::UpdateLead, json!({"lead_id": "lead-1"})),
            Action::new(ActionType::GetLeadById, json!({"lead_id": "lead-1"})),
        ];

        let report = executor.execute_all(&actions, &context()).await.expect("execute");

        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert!(report.results[2].success);
        assert!(!report.overall_success);
        assert_eq!(report.summary, "2 of 3 actions completed, 1 failed");
    }

    #[tokio::test]
    async fn handler_errors_become_failed_results_not_panics() {
        let mut executor = Executor::new();
        executor.register(ActionType::GetLeads, StubHandler::failing());

        let report = executor
            .execute_all(&[Action::new(ActionType::GetLeads, json!({}))], &context())
            .await
            .expect("execute");

        assert!(!report.overall_success);
        assert_eq!(report.results[0].error.as_deref(), Some("stubbed failure"));
    }

    #[tokio::test]
    async fn unregistered_action_types_report_not_implemented() {
        let executor = Executor::new();
        let report = executor
            .execute_all(
                &[Action::new(ActionType::GetLeads, json!({}))],
                &context(),
            )
            .await
            .expect("execute");

        assert!(!report.results[0].success);
        assert_eq!(report.results[0].message, "action is not implemented");
    }

    #[tokio::test]
    async fn lookup_result_chains_into_the_next_actions_missing_id() {
        let (lookup, _) = StubHandler::new(Some(json!([{"id": "L1"}, {"id": "L2"}])));
        let (update, update_seen) = StubHandler::new(None);

        let mut executor = Executor::new();
        executor.register(ActionType::GetLeads, lookup);
        executor.register(ActionType::UpdateLead, update);

        let actions = [
            Action::new(ActionType::GetLeads, json!({"neighborhood": "SOMA"})),
            Action::new(
                ActionType::UpdateLead,
                json!({"lead_id": "<lead_id>", "budget_max": 2_000_000}),
            ),
        ];

        let report = executor.execute_all(&actions, &context()).await.expect("execute");
        assert!(report.overall_success);

        let seen = update_seen.lock().unwrap();
        let ValidatedAction::UpdateLead(ref update) = seen[0] else {
            panic!("expected an update");
        };
        assert_eq!(update.lead_id, "L1");
        // The submitted action list itself was not patched.
        assert_eq!(actions[1].params["lead_id"], json!("<lead_id>"));
    }

    #[tokio::test]
    async fn chaining_only_looks_one_step_back() {
        let (lookup, _) = StubHandler::new(Some(json!([{"id": "L1"}])));
        let (noop, _) = StubHandler::new(None);
        let mut executor = Executor::new();
        executor.register(ActionType::GetLeads, lookup);
        executor.register_many(&[ActionType::LogCommunication, ActionType::CreateLead], noop);

        let actions = [
            Action::new(ActionType::GetLeads, json!({})),
            Action::new(ActionType::CreateLead, json!({"name": "John"})),
            // The lookup is two steps back now, so its id is not injected
            // and the empty lead_id fails validation.
            Action::new(
                ActionType::LogCommunication,
                json!({"lead_id": "", "channel": "sms", "body": "hi"}),
            ),
        ];

        let report = executor.execute_all(&actions, &context()).await.expect("execute");
        assert!(report.results[0].success);
        assert!(report.results[1].success);
        assert!(!report.results[2].success);
        assert_eq!(report.results[2].message, "validation failed");
    }

    #[test]
    fn placeholder_detection_covers_the_common_model_spellings() {
        assert!(is_placeholder_id(None));
        assert!(is_placeholder_id(Some(&json!(null))));
        assert!(is_placeholder_id(Some(&json!(""))));
        assert!(is_placeholder_id(Some(&json!("<lead_id>"))));
        assert!(is_placeholder_id(Some(&json!("{{lead_id}}"))));
        assert!(is_placeholder_id(Some(&json!("PLACEHOLDER"))));
        assert!(!is_placeholder_id(Some(&json!("lead-42"))));
        assert!(!is_placeholder_id(Some(&json!(42))));
    }

    #[test]
    fn chaining_derivation_skips_failed_or_non_lookup_predecessors() {
        let action = Action::new(ActionType::SendSms, json!({"lead_id": "", "body": "hi"}));

        let failed_lookup = ActionResult::failed(ActionType::GetLeads, "boom", "boom");
        let unchanged = resolve_chained_params(&action, Some(&failed_lookup));
        assert_eq!(unchanged["lead_id"], json!(""));

        let not_a_lookup = ActionResult::succeeded(
            ActionType::CreateLead,
            Some(json!([{"id": "L9"}])),
            "created",
        );
        let unchanged = resolve_chained_params(&action, Some(&not_a_lookup));
        assert_eq!(unchanged["lead_id"], json!(""));

        let empty_lookup =
            ActionResult::succeeded(ActionType::GetLeads, Some(json!([])), "found 0 leads");
        let unchanged = resolve_chained_params(&action, Some(&empty_lookup));
        assert_eq!(unchanged["lead_id"], json!(""));

        let lookup = ActionResult::succeeded(
            ActionType::GetLeads,
            Some(json!([{"id": "L1"}, {"id": "L2"}])),
            "found 2 leads",
        );
        let resolved = resolve_chained_params(&action, Some(&lookup));
        assert_eq!(resolved["lead_id"], json!("L1"));
    }

    #[test]
    fn present_ids_are_never_overwritten_by_chaining() {
        let action = Action::new(ActionType::SendSms, json!({"lead_id": "lead-7", "body": "hi"}));
        let lookup = ActionResult::succeeded(
            ActionType::GetLeads,
            Some(json!([{"id": "L1"}])),
            "found 1 lead",
        );
        let resolved = resolve_chained_params(&action, Some(&lookup));
        assert_eq!(resolved["lead_id"], json!("lead-7"));
    }
}
