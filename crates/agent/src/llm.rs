//! Collaborator seams for the language model and speech-to-text providers,
//! plus the OpenAI-compatible HTTP client used in production and the
//! scripted fake used in tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use leadly_core::config::LlmConfig;

/// Provider failures, distinct from parse failures by construction: nothing
/// in here is ever eligible for the orchestrator's format retry.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider transport failure: {0}")]
    Transport(String),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

/// Speech-to-text seam, used when an instruction originates as audio.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response =
            builder.send().await.map_err(|err| LlmError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let payload: ChatResponse =
            response.json().await.map_err(|err| LlmError::Transport(err.to_string()))?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

enum ScriptedReply {
    Reply(String),
    Failure(String),
}

/// One recorded call into the scripted client.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Deterministic fake: replies are served in order, and every call is
/// recorded so tests can assert on prompt content and call counts.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Reply(reply.into()));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Failure(reason.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        lock(&self.calls).push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
            temperature,
        });
        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Failure(reason)) => Err(LlmError::Transport(reason)),
            None => Err(LlmError::Transport("scripted client has no replies left".to_string())),
        }
    }
}

/// Transcriber that always returns a fixed text.
#[derive(Clone, Debug)]
pub struct FixedTranscriber {
    text: String,
}

impl FixedTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl SpeechToText for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<String, LlmError> {
        Ok(self.text.clone())
    }
}
