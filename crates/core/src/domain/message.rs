use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadId;

/// Outbound channels an action may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    Sms,
    Whatsapp,
    Email,
}

impl MessageChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationDirection {
    Inbound,
    Outbound,
}

/// A logged conversation entry against a lead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    pub lead_id: LeadId,
    pub channel: MessageChannel,
    pub direction: CommunicationDirection,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommunicationDraft {
    pub lead_id: LeadId,
    pub channel: MessageChannel,
    pub direction: CommunicationDirection,
    pub body: String,
}

/// An outbound message held for human approval instead of being sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: String,
    pub lead_id: LeadId,
    pub channel: MessageChannel,
    pub subject: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingMessageDraft {
    pub lead_id: LeadId,
    pub channel: MessageChannel,
    pub subject: Option<String>,
    pub body: String,
}
