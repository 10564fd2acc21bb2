//! Model-output parsing: raw text in, typed `OrchestratorResponse` out.
//!
//! The only text massaging performed is stripping a single fenced-code-block
//! wrapper; everything else must be valid JSON against the two-mode contract
//! or the call fails with a typed error.

use thiserror::Error;

use leadly_core::OrchestratorResponse;

#[derive(Debug, Error)]
pub enum ResponseError {
    /// The reply is not well-formed JSON.
    #[error("model reply is not valid JSON: {0}")]
    Parse(String),
    /// The reply is well-formed JSON that violates the response contract.
    #[error("model reply violates the response contract: {0}")]
    Schema(String),
}

/// Parse and structurally validate a raw model reply.
pub fn parse(raw: &str) -> Result<OrchestratorResponse, ResponseError> {
    let body = strip_code_fence(raw);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| ResponseError::Parse(err.to_string()))?;

    let response: OrchestratorResponse =
        serde_json::from_value(value).map_err(|err| ResponseError::Schema(err.to_string()))?;

    check_contract(&response)?;
    Ok(response)
}

/// Tolerate exactly one ```json ... ``` or bare ``` ... ``` wrapper.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the end of the opening line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    match rest.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => rest.trim(),
    }
}

fn check_contract(response: &OrchestratorResponse) -> Result<(), ResponseError> {
    match response {
        OrchestratorResponse::NeedsClarification { missing_fields, question, .. } => {
            if missing_fields.is_empty() {
                return Err(ResponseError::Schema(
                    "clarification must name at least one missing field".to_string(),
                ));
            }
            if question.trim().is_empty() {
                return Err(ResponseError::Schema(
                    "clarification must carry a follow-up question".to_string(),
                ));
            }
        }
        OrchestratorResponse::Execute { actions, .. } => {
            if actions.is_empty() {
                return Err(ResponseError::Schema(
                    "execute mode must carry at least one action".to_string(),
                ));
            }
            for (index, action) in actions.iter().enumerate() {
                if !action.params.is_object() {
                    return Err(ResponseError::Schema(format!(
                        "actions[{index}] params must be a JSON object"
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use leadly_core::{ActionType, OrchestratorResponse};

    use super::{parse, ResponseError};

    const EXECUTE_REPLY: &str = r#"{
        "mode": "execute",
        "explanation": "Creating the lead.",
        "actions": [{"type": "create_lead", "params": {"name": "Sarah Lee"}}],
        "render": {"kind": "cards", "summary": "1 lead created"}
    }"#;

    #[test]
    fn parses_a_bare_execute_reply() {
        let response = parse(EXECUTE_REPLY).expect("parse");
        assert!(response.is_executable());
        let OrchestratorResponse::Execute { actions, .. } = response else {
            panic!("expected execute mode");
        };
        assert_eq!(actions[0].action_type, ActionType::CreateLead);
    }

    #[test]
    fn strips_a_json_code_fence() {
        let fenced = format!("```json\n{EXECUTE_REPLY}\n```");
        assert!(parse(&fenced).expect("parse").is_executable());
    }

    #[test]
    fn strips_a_bare_code_fence_with_surrounding_whitespace() {
        let fenced = format!("\n  ```\n{EXECUTE_REPLY}\n```  \n");
        assert!(parse(&fenced).expect("parse").is_executable());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = parse("{\"mode\": \"execute\",").unwrap_err();
        assert!(matches!(error, ResponseError::Parse(_)));
    }

    #[test]
    fn prose_around_json_is_a_parse_error_not_massaged_away() {
        let error = parse(&format!("Sure! Here you go:\n{EXECUTE_REPLY}")).unwrap_err();
        assert!(matches!(error, ResponseError::Parse(_)));
    }

    #[test]
    fn unknown_mode_is_a_schema_error() {
        let error = parse(r#"{"mode": "panic"}"#).unwrap_err();
        assert!(matches!(error, ResponseError::Schema(_)));
    }

    #[test]
    fn execute_with_empty_actions_is_a_schema_error() {
        let error = parse(
            r#"{"mode": "execute", "explanation": "x", "actions": [],
                "render": {"kind": "notice", "summary": "s"}}"#,
        )
        .unwrap_err();
        assert!(matches!(error, ResponseError::Schema(ref m) if m.contains("at least one action")));
    }

    #[test]
    fn unknown_action_type_fails_schema_validation_before_dispatch() {
        let error = parse(
            r#"{"mode": "execute", "explanation": "x",
                "actions": [{"type": "drop_all_leads", "params": {}}],
                "render": {"kind": "notice", "summary": "s"}}"#,
        )
        .unwrap_err();
        assert!(matches!(error, ResponseError::Schema(_)));
    }

    #[test]
    fn clarification_must_name_missing_fields_and_a_question() {
        let no_fields = parse(
            r#"{"mode": "needs_clarification", "explanation": "x",
                "missing_fields": [], "question": "What's the email?"}"#,
        )
        .unwrap_err();
        assert!(matches!(no_fields, ResponseError::Schema(_)));

        let no_question = parse(
            r#"{"mode": "needs_clarification", "explanation": "x",
                "missing_fields": ["contact_method"], "question": "  "}"#,
        )
        .unwrap_err();
        assert!(matches!(no_question, ResponseError::Schema(_)));

        let ok = parse(
            r#"{"mode": "needs_clarification", "explanation": "x",
                "missing_fields": ["contact_method"],
                "question": "What's John's email or phone number?"}"#,
        )
        .expect("parse");
        assert!(ok.is_clarification());
    }

    #[test]
    fn non_object_action_params_are_a_schema_error() {
        let error = parse(
            r#"{"mode": "execute", "explanation": "x",
                "actions": [{"type": "get_leads", "params": [1, 2]}],
                "render": {"kind": "table", "summary": "s"}}"#,
        )
        .unwrap_err();
        assert!(matches!(error, ResponseError::Schema(ref m) if m.contains("params")));
    }
}
