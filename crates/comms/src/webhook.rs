use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use leadly_core::config::MessagingConfig;
use leadly_core::MessageChannel;

use crate::{MessageSender, OutboundMessage, SendError};

/// Sender that POSTs each message to a per-channel gateway URL. Channels
/// without a configured gateway fail with `ChannelUnconfigured` rather than
/// being silently dropped.
pub struct WebhookMessageSender {
    http: reqwest::Client,
    config: MessagingConfig,
}

impl WebhookMessageSender {
    pub fn new(config: MessagingConfig) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SendError::Transport(err.to_string()))?;
        Ok(Self { http, config })
    }

    fn gateway_for(&self, channel: MessageChannel) -> Result<&str, SendError> {
        let url = match channel {
            MessageChannel::Sms => self.config.sms_gateway_url.as_deref(),
            MessageChannel::Whatsapp => self.config.whatsapp_gateway_url.as_deref(),
            MessageChannel::Email => self.config.email_gateway_url.as_deref(),
        };
        url.ok_or(SendError::ChannelUnconfigured(channel))
    }
}

#[async_trait]
impl MessageSender for WebhookMessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let gateway = self.gateway_for(message.channel)?;

        let response = self
            .http
            .post(gateway)
            .json(&json!({
                "lead_id": message.lead_id.0,
                "to": message.to,
                "subject": message.subject,
                "body": message.body,
            }))
            .send()
            .await
            .map_err(|err| SendError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                event_name = "comms.gateway_rejected",
                channel = %message.channel,
                status = status.as_u16(),
                "outbound gateway rejected a message"
            );
            return Err(SendError::Rejected(format!("{status}: {body}")));
        }

        tracing::info!(
            event_name = "comms.message_sent",
            channel = %message.channel,
            lead_id = %message.lead_id,
            "outbound message delivered to gateway"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use leadly_core::config::MessagingConfig;
    use leadly_core::{LeadId, MessageChannel};

    use super::WebhookMessageSender;
    use crate::{MessageSender, OutboundMessage, SendError};

    #[tokio::test]
    async fn unconfigured_channel_fails_before_any_network_call() {
        let sender = WebhookMessageSender::new(MessagingConfig {
            sms_gateway_url: None,
            whatsapp_gateway_url: None,
            email_gateway_url: None,
        })
        .expect("sender");

        let result = sender
            .send(&OutboundMessage {
                channel: MessageChannel::Sms,
                lead_id: LeadId("lead-1".to_string()),
                to: "+14155550100".to_string(),
                subject: None,
                body: "hello".to_string(),
            })
            .await;

        assert!(matches!(result, Err(SendError::ChannelUnconfigured(MessageChannel::Sms))));
    }
}
