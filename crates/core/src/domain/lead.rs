use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A CRM lead. Budgets are whole dollars.
///
/// Ownership is attributed at creation time from the acting user and every
/// read/update is scoped to the same owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub budget_max: Option<i64>,
    pub price_range: Option<String>,
    pub segments: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Whether this lead carries the protected segment tag.
    pub fn is_protected(&self) -> bool {
        self.segments.iter().any(|s| s == crate::rules::HNW_SEGMENT)
    }

    /// Merge a patch into this lead. `None` fields are left untouched.
    pub fn apply_patch(&mut self, patch: &LeadPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
        if let Some(neighborhood) = &patch.neighborhood {
            self.neighborhood = Some(neighborhood.clone());
        }
        if let Some(beds) = patch.beds {
            self.beds = Some(beds);
        }
        if let Some(baths) = patch.baths {
            self.baths = Some(baths);
        }
        if let Some(budget_max) = patch.budget_max {
            self.budget_max = Some(budget_max);
        }
        if let Some(price_range) = &patch.price_range {
            self.price_range = Some(price_range.clone());
        }
        if let Some(segments) = &patch.segments {
            self.segments = segments.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

/// Field set accepted by `create_lead`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub budget_max: Option<i64>,
    pub price_range: Option<String>,
    #[serde(default)]
    pub segments: Vec<String>,
    pub notes: Option<String>,
}

/// Partial update for an existing lead. `None` means "leave alone".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub budget_max: Option<i64>,
    pub price_range: Option<String>,
    pub segments: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.neighborhood.is_none()
            && self.beds.is_none()
            && self.baths.is_none()
            && self.budget_max.is_none()
            && self.price_range.is_none()
            && self.segments.is_none()
            && self.notes.is_none()
    }
}

/// Filter for `get_leads`. All fields are optional and combined with AND.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadFilter {
    pub segment: Option<String>,
    pub neighborhood: Option<String>,
    pub min_budget: Option<i64>,
    pub max_budget: Option<i64>,
    /// Case-insensitive substring match against the lead name.
    pub query: Option<String>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Lead, LeadId, LeadPatch};

    fn lead() -> Lead {
        Lead {
            id: LeadId("lead-1".to_string()),
            owner_id: "agent-1".to_string(),
            name: "Sarah Lee".to_string(),
            email: Some("sarah@example.com".to_string()),
            phone: None,
            address: None,
            neighborhood: Some("SOMA".to_string()),
            beds: Some(2),
            baths: Some(2.0),
            budget_max: Some(1_500_000),
            price_range: None,
            segments: vec!["Buyer".to_string()],
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn apply_patch_only_touches_present_fields() {
        let mut lead = lead();
        lead.apply_patch(&LeadPatch {
            budget_max: Some(2_000_000),
            notes: Some("prefers morning viewings".to_string()),
            ..LeadPatch::default()
        });

        assert_eq!(lead.budget_max, Some(2_000_000));
        assert_eq!(lead.notes.as_deref(), Some("prefers morning viewings"));
        assert_eq!(lead.name, "Sarah Lee");
        assert_eq!(lead.email.as_deref(), Some("sarah@example.com"));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(LeadPatch::default().is_empty());
        assert!(!LeadPatch { name: Some("John".to_string()), ..LeadPatch::default() }.is_empty());
    }

    #[test]
    fn protection_flag_follows_segments() {
        let mut lead = lead();
        assert!(!lead.is_protected());
        lead.segments.push(crate::rules::HNW_SEGMENT.to_string());
        assert!(lead.is_protected());
    }
}
