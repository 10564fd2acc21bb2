//! Action handlers: the only code that touches the lead store and the
//! outbound senders. Business rules are re-verified here regardless of what
//! the model proposed, and every mutating action is audited on success and
//! failure.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use leadly_comms::{MessageSender, OutboundMessage};
use leadly_core::{
    missing_required_fields, segments_for_create, segments_for_update, ActionType, AuditEvent,
    AuditOutcome, AuditSink, CommunicationDirection, CommunicationDraft, DispatchDecision,
    ExecutionContext, Lead, LeadId, MessageChannel, PendingMessageDraft, SendPolicy,
    ValidatedAction,
};
use leadly_core::domain::action::SendMessageParams;
use leadly_db::repositories::{
    CommunicationRepository, LeadRepository, PendingMessageRepository,
};

use crate::executor::{ActionHandler, Executor, HandlerError, HandlerOutcome};

/// Build the production executor with one handler per catalog entry.
pub fn default_executor(
    leads: Arc<dyn LeadRepository>,
    communications: Arc<dyn CommunicationRepository>,
    pending: Arc<dyn PendingMessageRepository>,
    sender: Arc<dyn MessageSender>,
    audit: Arc<dyn AuditSink>,
) -> Executor {
    let lead_handlers = Arc::new(LeadHandlers {
        leads: leads.clone(),
        communications: communications.clone(),
        audit: audit.clone(),
    });
    let message_handlers =
        Arc::new(MessageHandlers { leads, communications, pending, sender, audit });

    let mut executor = Executor::new();
    executor.register_many(
        &[
            ActionType::CreateLead,
            ActionType::UpdateLead,
            ActionType::GetLeads,
            ActionType::GetLeadById,
            ActionType::LogCommunication,
        ],
        lead_handlers,
    );
    executor.register_many(
        &[
            ActionType::SendSms,
            ActionType::SendWhatsapp,
            ActionType::SendEmail,
            ActionType::CreatePendingMessage,
        ],
        message_handlers,
    );
    executor
}

fn is_mutating(action_type: ActionType) -> bool {
    !matches!(action_type, ActionType::GetLeads | ActionType::GetLeadById)
}

fn target_lead_id(action: &ValidatedAction) -> Option<LeadId> {
    match action {
        ValidatedAction::CreateLead(_) | ValidatedAction::GetLeads(_) => None,
        ValidatedAction::UpdateLead(params) => Some(LeadId(params.lead_id.clone())),
        ValidatedAction::GetLeadById(params) => Some(LeadId(params.lead_id.clone())),
        ValidatedAction::LogCommunication(params) => Some(LeadId(params.lead_id.clone())),
        ValidatedAction::SendSms(params)
        | ValidatedAction::SendWhatsapp(params)
        | ValidatedAction::SendEmail(params) => Some(LeadId(params.lead_id.clone())),
        ValidatedAction::CreatePendingMessage(params) => Some(LeadId(params.lead_id.clone())),
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn audit_failure(
    audit: &dyn AuditSink,
    context: &ExecutionContext,
    action: &ValidatedAction,
    error: &HandlerError,
) {
    if is_mutating(action.action_type()) {
        audit.emit(
            AuditEvent::new(
                &context.actor_id,
                action.action_type(),
                target_lead_id(action),
                AuditOutcome::Failed,
            )
            .with_detail("error", error.to_string()),
        );
    }
}

/// Lead store operations: create, update, lookups, communication log.
pub struct LeadHandlers {
    leads: Arc<dyn LeadRepository>,
    communications: Arc<dyn CommunicationRepository>,
    audit: Arc<dyn AuditSink>,
}

#[async_trait]
impl ActionHandler for LeadHandlers {
    async fn run(
        &self,
        action: &ValidatedAction,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let result = self.dispatch(action, context).await;
        if let Err(error) = &result {
            audit_failure(self.audit.as_ref(), context, action, error);
        }
        result
    }
}

impl LeadHandlers {
    async fn dispatch(
        &self,
        action: &ValidatedAction,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        match action {
            ValidatedAction::CreateLead(draft) => {
                let missing = missing_required_fields(draft);
                if !missing.is_empty() {
                    let labels =
                        missing.iter().map(|m| m.label()).collect::<Vec<_>>().join(", ");
                    return Err(HandlerError::Validation(format!(
                        "lead is missing required fields: {labels}"
                    )));
                }

                let mut draft = draft.clone();
                draft.segments = segments_for_create(draft.segments, draft.budget_max);

                let lead = self.leads.create(&context.actor_id, draft).await?;
                self.audit.emit(
                    AuditEvent::new(
                        &context.actor_id,
                        ActionType::CreateLead,
                        Some(lead.id.clone()),
                        AuditOutcome::Success,
                    )
                    .with_detail("name", lead.name.clone()),
                );
                let message = format!("created lead {}", lead.name);
                Ok(HandlerOutcome::new(Some(to_json(&lead)), message))
            }
            ValidatedAction::UpdateLead(params) => {
                let lead_id = LeadId(params.lead_id.clone());
                let current = self.leads.find_by_id(&lead_id, &context.actor_id).await?;

                let mut patch = params.patch.clone();
                if let Some(segments) = segments_for_update(&current, &patch) {
                    patch.segments = Some(segments);
                }

                let lead = self.leads.update(&lead_id, &context.actor_id, &patch).await?;
                self.audit.emit(
                    AuditEvent::new(
                        &context.actor_id,
                        ActionType::UpdateLead,
                        Some(lead.id.clone()),
                        AuditOutcome::Success,
                    )
                    .with_detail("name", lead.name.clone()),
                );
                let message = format!("updated lead {}", lead.name);
                Ok(HandlerOutcome::new(Some(to_json(&lead)), message))
            }
            ValidatedAction::GetLeads(filter) => {
                let leads = self.leads.list(&context.actor_id, filter).await?;
                let noun = if leads.len() == 1 { "lead" } else { "leads" };
                let message = format!("found {} {noun}", leads.len());
                Ok(HandlerOutcome::new(Some(to_json(&leads)), message))
            }
            ValidatedAction::GetLeadById(params) => {
                let lead_id = LeadId(params.lead_id.clone());
                let lead = self.leads.find_by_id(&lead_id, &context.actor_id).await?;
                let message = format!("found lead {}", lead.name);
                Ok(HandlerOutcome::new(Some(to_json(&lead)), message))
            }
            ValidatedAction::LogCommunication(params) => {
                let lead_id = LeadId(params.lead_id.clone());
                let lead = self.leads.find_by_id(&lead_id, &context.actor_id).await?;

                let entry = self
                    .communications
                    .record(
                        &context.actor_id,
                        CommunicationDraft {
                            lead_id: lead.id.clone(),
                            channel: params.channel,
                            direction: params.direction,
                            body: params.body.clone(),
                        },
                    )
                    .await?;
                self.audit.emit(AuditEvent::new(
                    &context.actor_id,
                    ActionType::LogCommunication,
                    Some(lead.id.clone()),
                    AuditOutcome::Success,
                ));
                let message = format!("logged {} communication for {}", params.channel, lead.name);
                Ok(HandlerOutcome::new(Some(to_json(&entry)), message))
            }
            other => Err(HandlerError::Unsupported(other.action_type())),
        }
    }
}

/// Outbound messaging operations, including the protected-segment send
/// suppression and the approval queue.
pub struct MessageHandlers {
    leads: Arc<dyn LeadRepository>,
    communications: Arc<dyn CommunicationRepository>,
    pending: Arc<dyn PendingMessageRepository>,
    sender: Arc<dyn MessageSender>,
    audit: Arc<dyn AuditSink>,
}

#[async_trait]
impl ActionHandler for MessageHandlers {
    async fn run(
        &self,
        action: &ValidatedAction,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let result = self.dispatch(action, context).await;
        if let Err(error) = &result {
            audit_failure(self.audit.as_ref(), context, action, error);
        }
        result
    }
}

impl MessageHandlers {
    async fn dispatch(
        &self,
        action: &ValidatedAction,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        match action {
            ValidatedAction::SendSms(params) => {
                self.send(MessageChannel::Sms, params, context).await
            }
            ValidatedAction::SendWhatsapp(params) => {
                self.send(MessageChannel::Whatsapp, params, context).await
            }
            ValidatedAction::SendEmail(params) => {
                self.send(MessageChannel::Email, params, context).await
            }
            ValidatedAction::CreatePendingMessage(params) => {
                let lead_id = LeadId(params.lead_id.clone());
                let lead = self.leads.find_by_id(&lead_id, &context.actor_id).await?;

                let pending = self
                    .pending
                    .enqueue(
                        &context.actor_id,
                        PendingMessageDraft {
                            lead_id: lead.id.clone(),
                            channel: params.channel,
                            subject: params.subject.clone(),
                            body: params.body.clone(),
                        },
                    )
                    .await?;
                self.audit.emit(AuditEvent::new(
                    &context.actor_id,
                    ActionType::CreatePendingMessage,
                    Some(lead.id.clone()),
                    AuditOutcome::Success,
                ));
                let message =
                    format!("queued {} message to {} for approval", params.channel, lead.name);
                Ok(HandlerOutcome::new(
                    Some(json!({"pending_message_id": pending.id, "status": "pending_approval"})),
                    message,
                ))
            }
            other => Err(HandlerError::Unsupported(other.action_type())),
        }
    }

    /// Dispatch one outbound message, or redirect it to the approval queue
    /// when the send policy forbids direct delivery.
    async fn send(
        &self,
        channel: MessageChannel,
        params: &SendMessageParams,
        context: &ExecutionContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let action_type = match channel {
            MessageChannel::Sms => ActionType::SendSms,
            MessageChannel::Whatsapp => ActionType::SendWhatsapp,
            MessageChannel::Email => ActionType::SendEmail,
        };
        let lead_id = LeadId(params.lead_id.clone());
        let lead = self.leads.find_by_id(&lead_id, &context.actor_id).await?;

        match SendPolicy::evaluate(&lead, channel) {
            DispatchDecision::Queue { reason_code, user_message } => {
                let pending = self
                    .pending
                    .enqueue(
                        &context.actor_id,
                        PendingMessageDraft {
                            lead_id: lead.id.clone(),
                            channel,
                            subject: params.subject.clone(),
                            body: params.body.clone(),
                        },
                    )
                    .await?;
                self.audit.emit(
                    AuditEvent::new(
                        &context.actor_id,
                        action_type,
                        Some(lead.id.clone()),
                        AuditOutcome::Rejected,
                    )
                    .with_detail("reason", reason_code),
                );
                Ok(HandlerOutcome::new(
                    Some(json!({"pending_message_id": pending.id, "status": "pending_approval"})),
                    user_message,
                ))
            }
            DispatchDecision::Send => {
                let to = address_for(&lead, channel).ok_or_else(|| {
                    HandlerError::Validation(format!(
                        "lead {} has no {} on file",
                        lead.name,
                        address_kind(channel)
                    ))
                })?;

                let message = OutboundMessage {
                    channel,
                    lead_id: lead.id.clone(),
                    to,
                    subject: params.subject.clone(),
                    body: params.body.clone(),
                };
                self.sender.send(&message).await?;

                self.communications
                    .record(
                        &context.actor_id,
                        CommunicationDraft {
                            lead_id: lead.id.clone(),
                            channel,
                            direction: CommunicationDirection::Outbound,
                            body: params.body.clone(),
                        },
                    )
                    .await?;
                self.audit.emit(AuditEvent::new(
                    &context.actor_id,
                    action_type,
                    Some(lead.id.clone()),
                    AuditOutcome::Success,
                ));
                Ok(HandlerOutcome::new(
                    Some(json!({"delivered": true, "channel": channel.as_str()})),
                    format!("sent {channel} to {}", lead.name),
                ))
            }
        }
    }
}

fn address_for(lead: &Lead, channel: MessageChannel) -> Option<String> {
    match channel {
        MessageChannel::Email => lead.email.clone(),
        MessageChannel::Sms | MessageChannel::Whatsapp => lead.phone.clone(),
    }
}

fn address_kind(channel: MessageChannel) -> &'static str {
    match channel {
        MessageChannel::Email => "email address",
        MessageChannel::Sms | MessageChannel::Whatsapp => "phone number",
    }
}
