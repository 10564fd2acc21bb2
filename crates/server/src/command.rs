//! The command endpoint: validate input, orchestrate, branch on mode, and
//! run the action list. Authentication is upstream; the resolved actor id
//! arrives in the `x-actor-id` header.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use leadly_agent::OrchestrationError;
use leadly_core::{
    validate_input, ActionResult, ExecutionContext, Instruction, InstructionContext,
    OrchestratorResponse, RenderHint,
};

use crate::bootstrap::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/commands", post(handle_command))
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    instruction: Option<String>,
    /// Base64-encoded audio; transcribed before orchestration.
    audio_b64: Option<String>,
    filename: Option<String>,
    channel: Option<String>,
    subject_lead_id: Option<String>,
    #[serde(default)]
    prior_turns: Vec<String>,
    timezone: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum CommandReply {
    NeedsClarification {
        explanation: String,
        missing_fields: Vec<String>,
        question: String,
    },
    Executed {
        explanation: String,
        render: RenderHint,
        overall_success: bool,
        summary: String,
        results: Vec<ActionResult>,
    },
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiError { error: message.into() })).into_response()
}

async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CommandRequest>,
) -> Response {
    let Some(actor_id) = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "x-actor-id header is required");
    };
    let context = ExecutionContext {
        actor_id: actor_id.to_string(),
        timezone: request.timezone.clone(),
        user_id: None,
    };

    let text = match resolve_text(&state, &request).await {
        Ok(text) => text,
        Err(response) => return response,
    };
    if let Err(error) = validate_input(&text) {
        return error_response(StatusCode::BAD_REQUEST, error.to_string());
    }

    let instruction = Instruction::with_context(
        text,
        InstructionContext {
            channel: request.channel,
            subject_lead_id: request.subject_lead_id,
            prior_turns: request.prior_turns,
        },
    );

    match state.orchestrator.orchestrate(&instruction, &context).await {
        Ok(OrchestratorResponse::NeedsClarification { explanation, missing_fields, question }) => (
            StatusCode::OK,
            Json(CommandReply::NeedsClarification { explanation, missing_fields, question }),
        )
            .into_response(),
        Ok(OrchestratorResponse::Execute { explanation, actions, render }) => {
            match state.executor.execute_all(&actions, &context).await {
                Ok(report) => (
                    StatusCode::OK,
                    Json(CommandReply::Executed {
                        explanation,
                        render,
                        overall_success: report.overall_success,
                        summary: report.summary,
                        results: report.results,
                    }),
                )
                    .into_response(),
                Err(error) => error_response(StatusCode::BAD_REQUEST, error.to_string()),
            }
        }
        Err(OrchestrationError::InvalidContext(error)) => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(error @ OrchestrationError::Provider(_)) => {
            tracing::error!(
                event_name = "command.provider_failure",
                error = %error,
                "language model provider failed"
            );
            error_response(StatusCode::BAD_GATEWAY, "the language model provider failed")
        }
        Err(error @ OrchestrationError::MalformedOutput { .. }) => {
            tracing::error!(
                event_name = "command.malformed_output",
                error = %error,
                "model output stayed malformed after retry"
            );
            error_response(
                StatusCode::BAD_GATEWAY,
                "the model did not produce a usable response; please rephrase and retry",
            )
        }
    }
}

async fn resolve_text(state: &AppState, request: &CommandRequest) -> Result<String, Response> {
    if let Some(text) = request.instruction.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(text.to_string());
    }
    let Some(audio_b64) = request.audio_b64.as_deref() else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "either `instruction` or `audio_b64` is required",
        ));
    };
    let Some(transcriber) = &state.transcriber else {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "speech-to-text is not configured",
        ));
    };
    let audio = base64::engine::general_purpose::STANDARD
        .decode(audio_b64)
        .map_err(|err| error_response(StatusCode::BAD_REQUEST, format!("invalid audio_b64: {err}")))?;
    let filename = request.filename.as_deref().unwrap_or("audio.webm");
    transcriber
        .transcribe(&audio, filename)
        .await
        .map_err(|err| error_response(StatusCode::BAD_GATEWAY, format!("transcription failed: {err}")))
}
