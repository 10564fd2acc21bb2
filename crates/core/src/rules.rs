//! Deterministic business rules re-verified inside the lead-mutation
//! handlers, independent of whatever the model proposed.

use crate::domain::lead::{Lead, LeadDraft, LeadPatch};

/// The protected segment tag. A lead carrying it must never receive an
/// automated outbound message.
pub const HNW_SEGMENT: &str = "High Net Worth";

/// Exclusive budget threshold: a ceiling strictly above this auto-tags.
pub const HNW_BUDGET_CEILING: i64 = 3_000_000;

/// Required-field categories for a lead create. Labels are what the
/// clarification flow reports back to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingField {
    Name,
    ContactChannel,
    PropertyDescriptor,
    BudgetSignal,
}

impl MissingField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ContactChannel => "contact_method",
            Self::PropertyDescriptor => "property_descriptor",
            Self::BudgetSignal => "budget_signal",
        }
    }
}

/// The create gate: a lead needs a name, a way to reach them, something
/// about the property they want, and a budget signal.
pub fn missing_required_fields(draft: &LeadDraft) -> Vec<MissingField> {
    let mut missing = Vec::new();

    if draft.name.trim().is_empty() {
        missing.push(MissingField::Name);
    }

    let has_contact = present(&draft.email) || present(&draft.phone);
    if !has_contact {
        missing.push(MissingField::ContactChannel);
    }

    let has_property = present(&draft.address)
        || (present(&draft.neighborhood) && draft.beds.is_some() && draft.baths.is_some());
    if !has_property {
        missing.push(MissingField::PropertyDescriptor);
    }

    let has_budget = draft.budget_max.is_some() || present(&draft.price_range);
    if !has_budget {
        missing.push(MissingField::BudgetSignal);
    }

    missing
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn has_hnw(segments: &[String]) -> bool {
    segments.iter().any(|s| s == HNW_SEGMENT)
}

/// Segment set for a newly created lead: the requested segments, plus the
/// protected tag when the budget ceiling is strictly above the threshold.
pub fn segments_for_create(requested: Vec<String>, budget_max: Option<i64>) -> Vec<String> {
    let mut segments = requested;
    if budget_max.is_some_and(|b| b > HNW_BUDGET_CEILING) && !has_hnw(&segments) {
        segments.push(HNW_SEGMENT.to_string());
    }
    segments
}

/// Segment set after applying `patch` to `current`.
///
/// Returns `Some(final segments)` when the stored set must change (or the
/// patch itself carries one), `None` when it can be left untouched.
///
/// The auto-untag only fires when the patch itself lowers `budget_max` to or
/// below the ceiling; a patch that also asserts the tag in its own segment
/// list keeps it (explicit segment writes are operator intent).
pub fn segments_for_update(current: &Lead, patch: &LeadPatch) -> Option<Vec<String>> {
    let explicit = patch.segments.clone();
    let mut segments = explicit.clone().unwrap_or_else(|| current.segments.clone());

    let effective_budget = patch.budget_max.or(current.budget_max);
    if effective_budget.is_some_and(|b| b > HNW_BUDGET_CEILING) {
        if !has_hnw(&segments) {
            segments.push(HNW_SEGMENT.to_string());
        }
    } else if patch.budget_max.is_some() {
        let asserted = explicit.as_ref().is_some_and(|s| has_hnw(s));
        if !asserted {
            segments.retain(|s| s != HNW_SEGMENT);
        }
    }

    if explicit.is_some() || segments != current.segments {
        Some(segments)
    } else {
        None
    }
}
