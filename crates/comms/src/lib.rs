//! Outbound message surface: the sender trait the executor dispatches
//! through, a webhook-backed implementation, and a recording fake for tests.
//!
//! The executor never calls a sender for a protected lead; that decision is
//! made by `leadly_core::policy` before anything reaches this crate.

pub mod recording;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use leadly_core::{LeadId, MessageChannel};

pub use recording::RecordingMessageSender;
pub use webhook::WebhookMessageSender;

/// A fully addressed outbound message. `to` is the phone number or email
/// resolved from the lead record by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: MessageChannel,
    pub lead_id: LeadId,
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no gateway configured for channel {0}")]
    ChannelUnconfigured(MessageChannel),
    #[error("gateway rejected the message: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError>;
}
