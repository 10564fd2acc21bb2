//! Outbound-send policy, evaluated at the point of message dispatch.

use crate::domain::lead::Lead;
use crate::domain::message::MessageChannel;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Hand the message to the sender.
    Send,
    /// Do not send; queue for human approval instead.
    Queue { reason_code: &'static str, user_message: String },
}

pub struct SendPolicy;

impl SendPolicy {
    /// Hard invariant: a lead carrying the protected tag never receives an
    /// automated message, regardless of what the model proposed.
    pub fn evaluate(lead: &Lead, channel: MessageChannel) -> DispatchDecision {
        if lead.is_protected() {
            return DispatchDecision::Queue {
                reason_code: "protected_segment",
                user_message: format!(
                    "{} is a protected lead; the {channel} message was queued for approval instead of being sent.",
                    lead.name
                ),
            };
        }
        DispatchDecision::Send
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{DispatchDecision, SendPolicy};
    use crate::domain::lead::{Lead, LeadId};
    use crate::domain::message::MessageChannel;
    use crate::rules::HNW_SEGMENT;

    fn lead(segments: Vec<&str>) -> Lead {
        Lead {
            id: LeadId("lead-1".to_string()),
            owner_id: "agent-1".to_string(),
            name: "Sarah Lee".to_string(),
            email: Some("sarah@example.com".to_string()),
            phone: Some("+14155550100".to_string()),
            address: None,
            neighborhood: None,
            beds: None,
            baths: None,
            budget_max: Some(4_000_000),
            price_range: None,
            segments: segments.into_iter().map(String::from).collect(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn protected_lead_is_queued_on_every_channel() {
        let protected = lead(vec!["Buyer", HNW_SEGMENT]);
        for channel in [MessageChannel::Sms, MessageChannel::Whatsapp, MessageChannel::Email] {
            let decision = SendPolicy::evaluate(&protected, channel);
            let DispatchDecision::Queue { reason_code, user_message } = decision else {
                panic!("expected queue decision for {channel}");
            };
            assert_eq!(reason_code, "protected_segment");
            assert!(user_message.contains("queued for approval"));
        }
    }

    #[test]
    fn unprotected_lead_may_be_sent_to() {
        let decision = SendPolicy::evaluate(&lead(vec!["Buyer"]), MessageChannel::Sms);
        assert_eq!(decision, DispatchDecision::Send);
    }
}
