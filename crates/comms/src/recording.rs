use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{MessageSender, OutboundMessage, SendError};

/// Test sender that records what would have gone out. Can be armed to fail
/// so delivery-error paths are exercisable.
#[derive(Clone, Default)]
pub struct RecordingMessageSender {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl RecordingMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        let sender = Self::default();
        *lock(&sender.fail_with) = Some(reason.into());
        sender
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        lock(&self.sent).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MessageSender for RecordingMessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        if let Some(reason) = lock(&self.fail_with).clone() {
            return Err(SendError::Rejected(reason));
        }
        lock(&self.sent).push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use leadly_core::{LeadId, MessageChannel};

    use super::RecordingMessageSender;
    use crate::{MessageSender, OutboundMessage, SendError};

    fn message() -> OutboundMessage {
        OutboundMessage {
            channel: MessageChannel::Email,
            lead_id: LeadId("lead-1".to_string()),
            to: "sarah@example.com".to_string(),
            subject: Some("Listings".to_string()),
            body: "Three new matches".to_string(),
        }
    }

    #[tokio::test]
    async fn records_messages_in_order() {
        let sender = RecordingMessageSender::new();
        sender.send(&message()).await.expect("send");

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "sarah@example.com");
    }

    #[tokio::test]
    async fn armed_failure_surfaces_and_records_nothing() {
        let sender = RecordingMessageSender::failing("gateway down");
        let result = sender.send(&message()).await;

        assert!(matches!(result, Err(SendError::Rejected(_))));
        assert!(sender.sent().is_empty());
    }
}
