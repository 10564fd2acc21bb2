use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on instruction length, applied before any model call.
pub const MAX_INSTRUCTION_CHARS: usize = 10_000;

/// Conversation context attached to an instruction by the ingress layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionContext {
    pub channel: Option<String>,
    /// Lead the conversation is already about, if any.
    pub subject_lead_id: Option<String>,
    #[serde(default)]
    pub prior_turns: Vec<String>,
}

/// A raw natural-language command. Immutable once received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    #[serde(default)]
    pub context: InstructionContext,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), context: InstructionContext::default() }
    }

    pub fn with_context(text: impl Into<String>, context: InstructionContext) -> Self {
        Self { text: text.into(), context }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("instruction text is empty")]
    Empty,
    #[error("instruction text is {chars} characters, the maximum is {MAX_INSTRUCTION_CHARS}")]
    TooLong { chars: usize },
}

/// Pure precheck run by the caller before `orchestrate`.
pub fn validate_input(text: &str) -> Result<(), InstructionError> {
    if text.trim().is_empty() {
        return Err(InstructionError::Empty);
    }
    let chars = text.chars().count();
    if chars > MAX_INSTRUCTION_CHARS {
        return Err(InstructionError::TooLong { chars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_input, InstructionError, MAX_INSTRUCTION_CHARS};

    #[test]
    fn rejects_empty_and_whitespace_only_text() {
        assert_eq!(validate_input(""), Err(InstructionError::Empty));
        assert_eq!(validate_input("   \n\t "), Err(InstructionError::Empty));
    }

    #[test]
    fn rejects_text_over_the_ceiling() {
        let text = "a".repeat(MAX_INSTRUCTION_CHARS + 1);
        assert_eq!(
            validate_input(&text),
            Err(InstructionError::TooLong { chars: MAX_INSTRUCTION_CHARS + 1 })
        );
    }

    #[test]
    fn accepts_text_at_the_ceiling() {
        let text = "a".repeat(MAX_INSTRUCTION_CHARS);
        assert_eq!(validate_input(&text), Ok(()));
        assert_eq!(validate_input("Add Sarah to my CRM"), Ok(()));
    }
}
