//! Prompt construction for the command pipeline. The system framing is
//! fixed; the user prompt carries the instruction plus a context block.

use leadly_core::{ExecutionContext, Instruction};

/// Fixed system framing: the operation catalog, the required-field rule,
/// the protection rule, and the output-format contract.
pub const SYSTEM_PROMPT: &str = r#"You translate a CRM user's natural-language instruction into structured actions. You never invent facts, never decide policy, and never write free-form text into the CRM.

Available action types and their params:
- create_lead: {name, email?, phone?, address?, neighborhood?, beds?, baths?, budget_max?, price_range?, segments?, notes?}
- update_lead: {lead_id, ...any create_lead field to change}
- get_leads: {segment?, neighborhood?, min_budget?, max_budget?, query?, limit?}
- get_lead_by_id: {lead_id}
- log_communication: {lead_id, channel: sms|whatsapp|email, direction: inbound|outbound, body}
- send_sms: {lead_id, body}
- send_whatsapp: {lead_id, body}
- send_email: {lead_id, subject?, body}
- create_pending_message: {lead_id, channel: sms|whatsapp|email, subject?, body}

Rules:
1. A new lead requires ALL of: a name; a contact method (email or phone); a property descriptor (an address, or neighborhood plus beds plus baths); a budget signal (budget_max in whole dollars, or a price_range string). If any category is missing, do not emit create_lead - ask for clarification instead.
2. Leads tagged "High Net Worth" must never be messaged directly. For them, propose create_pending_message instead of send_sms/send_whatsapp/send_email. The executor enforces this independently.
3. When an action targets "the lead we just found", emit get_leads first and use the placeholder "<lead_id>" in the dependent action; the executor chains the first result in.
4. Budgets are whole dollars (e.g. $1.5M -> 1500000).

Respond with a single JSON object and nothing else - no prose, no code fences. Exactly one of the two modes:

Mode 1, not enough information:
{"mode": "needs_clarification", "explanation": "<why, under 100 words>", "missing_fields": ["<field>", ...], "question": "<one concise follow-up question, under 100 words>"}

Mode 2, ready to act:
{"mode": "execute", "explanation": "<what will happen>", "actions": [{"type": "<action type>", "params": {...}}, ...], "render": {"kind": "table"|"cards"|"graph"|"notice", "summary": "<one line>"}}

A needs_clarification response carries no actions and asks exactly one question. An execute response carries at least one action."#;

/// Appended to the user prompt on the single format retry.
pub const STRICT_JSON_REMINDER: &str = "Your previous reply was not valid against the contract. Respond again with STRICT JSON only: a single JSON object, no prose, no markdown, no code fences.";

/// The instruction annotated with its context block.
pub fn build_user_prompt(instruction: &Instruction, context: &ExecutionContext) -> String {
    let mut prompt = String::with_capacity(instruction.text.len() + 256);
    prompt.push_str("Instruction:\n");
    prompt.push_str(&instruction.text);
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(&format!("- actor id: {}\n", context.actor_id));
    if let Some(channel) = &instruction.context.channel {
        prompt.push_str(&format!("- channel: {channel}\n"));
    }
    if let Some(subject) = &instruction.context.subject_lead_id {
        prompt.push_str(&format!("- subject lead id: {subject}\n"));
    }
    if let Some(timezone) = &context.timezone {
        prompt.push_str(&format!("- timezone: {timezone}\n"));
    }
    if !instruction.context.prior_turns.is_empty() {
        prompt.push_str("- prior turns:\n");
        for (index, turn) in instruction.context.prior_turns.iter().enumerate() {
            prompt.push_str(&format!("  {}. {turn}\n", index + 1));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use leadly_core::{ExecutionContext, Instruction, InstructionContext};

    use super::{build_user_prompt, SYSTEM_PROMPT};

    #[test]
    fn system_prompt_carries_catalog_and_both_rules() {
        assert!(SYSTEM_PROMPT.contains("create_lead"));
        assert!(SYSTEM_PROMPT.contains("create_pending_message"));
        assert!(SYSTEM_PROMPT.contains("High Net Worth"));
        assert!(SYSTEM_PROMPT.contains("needs_clarification"));
        assert!(SYSTEM_PROMPT.contains("no code fences"));
    }

    #[test]
    fn user_prompt_numbers_prior_turns_and_names_the_actor() {
        let instruction = Instruction::with_context(
            "Text her the new listing",
            InstructionContext {
                channel: Some("sms".to_string()),
                subject_lead_id: Some("lead-9".to_string()),
                prior_turns: vec![
                    "Find leads in SOMA".to_string(),
                    "Show me the first one".to_string(),
                ],
            },
        );
        let context = ExecutionContext::for_actor("agent-7");

        let prompt = build_user_prompt(&instruction, &context);

        assert!(prompt.contains("Text her the new listing"));
        assert!(prompt.contains("- actor id: agent-7"));
        assert!(prompt.contains("- subject lead id: lead-9"));
        assert!(prompt.contains("  1. Find leads in SOMA"));
        assert!(prompt.contains("  2. Show me the first one"));
    }

    #[test]
    fn user_prompt_omits_absent_context_lines() {
        let prompt = build_user_prompt(
            &Instruction::new("Add John"),
            &ExecutionContext::for_actor("agent-7"),
        );
        assert!(!prompt.contains("subject lead id"));
        assert!(!prompt.contains("prior turns"));
    }
}
