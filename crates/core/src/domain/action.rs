//! Closed action catalog and the per-type parameter schemas.
//!
//! Actions are data, not code: the model proposes `{type, params}` envelopes
//! and nothing reaches a handler until `Action::validate` has turned the
//! untyped params into a `ValidatedAction`. Validation is pure and
//! idempotent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::command::RenderHint;
use crate::domain::lead::{LeadDraft, LeadFilter, LeadPatch};
use crate::domain::message::{CommunicationDirection, MessageChannel};

/// Every operation the pipeline can execute. Unknown types fail schema
/// validation in the parser, before any dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateLead,
    UpdateLead,
    GetLeads,
    GetLeadById,
    LogCommunication,
    SendSms,
    SendWhatsapp,
    SendEmail,
    CreatePendingMessage,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateLead => "create_lead",
            Self::UpdateLead => "update_lead",
            Self::GetLeads => "get_leads",
            Self::GetLeadById => "get_lead_by_id",
            Self::LogCommunication => "log_communication",
            Self::SendSms => "send_sms",
            Self::SendWhatsapp => "send_whatsapp",
            Self::SendEmail => "send_email",
            Self::CreatePendingMessage => "create_pending_message",
        }
    }

    /// Types whose params carry a `lead_id` the chaining step may fill in.
    pub fn accepts_lead_id(&self) -> bool {
        !matches!(self, Self::CreateLead | Self::GetLeads)
    }

    /// Types whose result is a list of leads a later action can chain from.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::GetLeads)
    }

    /// Types that would immediately dispatch an outbound message.
    pub fn outbound_channel(&self) -> Option<MessageChannel> {
        match self {
            Self::SendSms => Some(MessageChannel::Sms),
            Self::SendWhatsapp => Some(MessageChannel::Whatsapp),
            Self::SendEmail => Some(MessageChannel::Email),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intended side effect, as proposed by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderHint>,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Action {
    pub fn new(action_type: ActionType, params: serde_json::Value) -> Self {
        Self { action_type, params, render: None }
    }

    /// Check this action's params against its type's schema.
    pub fn validate(&self) -> Result<ValidatedAction, ValidationError> {
        validate_params(self.action_type, &self.params)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid parameters for {action_type}: {message}")]
pub struct ValidationError {
    pub action_type: ActionType,
    pub message: String,
}

impl ValidationError {
    fn new(action_type: ActionType, message: impl Into<String>) -> Self {
        Self { action_type, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateLeadParams {
    pub lead_id: String,
    #[serde(flatten)]
    pub patch: LeadPatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetLeadByIdParams {
    pub lead_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogCommunicationParams {
    pub lead_id: String,
    pub channel: MessageChannel,
    #[serde(default = "default_direction")]
    pub direction: CommunicationDirection,
    pub body: String,
}

fn default_direction() -> CommunicationDirection {
    CommunicationDirection::Outbound
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendMessageParams {
    pub lead_id: String,
    pub body: String,
    pub subject: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingMessageParams {
    pub lead_id: String,
    pub channel: MessageChannel,
    pub subject: Option<String>,
    pub body: String,
}

/// An action whose params passed the schema for its type. Handlers only
/// ever see this form.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidatedAction {
    CreateLead(LeadDraft),
    UpdateLead(UpdateLeadParams),
    GetLeads(LeadFilter),
    GetLeadById(GetLeadByIdParams),
    LogCommunication(LogCommunicationParams),
    SendSms(SendMessageParams),
    SendWhatsapp(SendMessageParams),
    SendEmail(SendMessageParams),
    CreatePendingMessage(PendingMessageParams),
}

impl ValidatedAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::CreateLead(_) => ActionType::CreateLead,
            Self::UpdateLead(_) => ActionType::UpdateLead,
            Self::GetLeads(_) => ActionType::GetLeads,
            Self::GetLeadById(_) => ActionType::GetLeadById,
            Self::LogCommunication(_) => ActionType::LogCommunication,
            Self::SendSms(_) => ActionType::SendSms,
            Self::SendWhatsapp(_) => ActionType::SendWhatsapp,
            Self::SendEmail(_) => ActionType::SendEmail,
            Self::CreatePendingMessage(_) => ActionType::CreatePendingMessage,
        }
    }
}

fn validate_params(
    action_type: ActionType,
    params: &serde_json::Value,
) -> Result<ValidatedAction, ValidationError> {
    if !params.is_object() {
        return Err(ValidationError::new(action_type, "params must be a JSON object"));
    }

    match action_type {
        ActionType::CreateLead => {
            let draft: LeadDraft = decode(action_type, params)?;
            check_name(action_type, &draft.name)?;
            check_email(action_type, draft.email.as_deref())?;
            check_budget(action_type, draft.budget_max)?;
            Ok(ValidatedAction::CreateLead(draft))
        }
        ActionType::UpdateLead => {
            let update: UpdateLeadParams = decode(action_type, params)?;
            check_lead_id(action_type, &update.lead_id)?;
            if update.patch.is_empty() {
                return Err(ValidationError::new(action_type, "patch contains no fields"));
            }
            if let Some(name) = &update.patch.name {
                check_name(action_type, name)?;
            }
            check_email(action_type, update.patch.email.as_deref())?;
            check_budget(action_type, update.patch.budget_max)?;
            Ok(ValidatedAction::UpdateLead(update))
        }
        ActionType::GetLeads => {
            let filter: LeadFilter = decode(action_type, params)?;
            if filter.limit == Some(0) {
                return Err(ValidationError::new(action_type, "limit must be at least 1"));
            }
            if let (Some(min), Some(max)) = (filter.min_budget, filter.max_budget) {
                if min > max {
                    return Err(ValidationError::new(
                        action_type,
                        "min_budget exceeds max_budget",
                    ));
                }
            }
            Ok(ValidatedAction::GetLeads(filter))
        }
        ActionType::GetLeadById => {
            let lookup: GetLeadByIdParams = decode(action_type, params)?;
            check_lead_id(action_type, &lookup.lead_id)?;
            Ok(ValidatedAction::GetLeadById(lookup))
        }
        ActionType::LogCommunication => {
            let entry: LogCommunicationParams = decode(action_type, params)?;
            check_lead_id(action_type, &entry.lead_id)?;
            check_body(action_type, &entry.body)?;
            Ok(ValidatedAction::LogCommunication(entry))
        }
        ActionType::SendSms | ActionType::SendWhatsapp | ActionType::SendEmail => {
            let message: SendMessageParams = decode(action_type, params)?;
            check_lead_id(action_type, &message.lead_id)?;
            check_body(action_type, &message.body)?;
            Ok(match action_type {
                ActionType::SendSms => ValidatedAction::SendSms(message),
                ActionType::SendWhatsapp => ValidatedAction::SendWhatsapp(message),
                _ => ValidatedAction::SendEmail(message),
            })
        }
        ActionType::CreatePendingMessage => {
            let pending: PendingMessageParams = decode(action_type, params)?;
            check_lead_id(action_type, &pending.lead_id)?;
            check_body(action_type, &pending.body)?;
            Ok(ValidatedAction::CreatePendingMessage(pending))
        }
    }
}

fn decode<T: DeserializeOwned>(
    action_type: ActionType,
    params: &serde_json::Value,
) -> Result<T, ValidationError> {
    serde_json::from_value(params.clone())
        .map_err(|err| ValidationError::new(action_type, err.to_string()))
}

fn check_name(action_type: ActionType, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(action_type, "name must not be empty"));
    }
    Ok(())
}

fn check_lead_id(action_type: ActionType, lead_id: &str) -> Result<(), ValidationError> {
    if lead_id.trim().is_empty() {
        return Err(ValidationError::new(action_type, "lead_id is required"));
    }
    Ok(())
}

fn check_body(action_type: ActionType, body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::new(action_type, "body must not be empty"));
    }
    Ok(())
}

fn check_email(action_type: ActionType, email: Option<&str>) -> Result<(), ValidationError> {
    if let Some(email) = email {
        if !email.contains('@') || email.trim().len() < 3 {
            return Err(ValidationError::new(
                action_type,
                format!("`{email}` is not a plausible email address"),
            ));
        }
    }
    Ok(())
}

fn check_budget(action_type: ActionType, budget_max: Option<i64>) -> Result<(), ValidationError> {
    if let Some(budget) = budget_max {
        if budget < 0 {
            return Err(ValidationError::new(action_type, "budget_max must not be negative"));
        }
    }
    Ok(())
}
