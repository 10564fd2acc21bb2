//! Deterministic demo fixtures for `leadly seed`.

use leadly_core::{segments_for_create, LeadDraft};

use crate::repositories::{LeadRepository, RepositoryError, SqlLeadRepository};
use crate::DbPool;

pub const SEED_ACTOR: &str = "seed";

pub fn demo_drafts() -> Vec<LeadDraft> {
    vec![
        LeadDraft {
            name: "Sarah Lee".to_string(),
            email: Some("sarah@example.com".to_string()),
            neighborhood: Some("SOMA".to_string()),
            beds: Some(2),
            baths: Some(2.0),
            budget_max: Some(1_500_000),
            segments: vec!["Buyer".to_string()],
            ..LeadDraft::default()
        },
        LeadDraft {
            name: "Mira Chan".to_string(),
            phone: Some("+14155550123".to_string()),
            address: Some("2130 Broadway".to_string()),
            budget_max: Some(4_200_000),
            segments: vec!["Buyer".to_string()],
            ..LeadDraft::default()
        },
        LeadDraft {
            name: "Diego Alvarez".to_string(),
            email: Some("diego@example.com".to_string()),
            neighborhood: Some("Noe Valley".to_string()),
            beds: Some(3),
            baths: Some(2.5),
            price_range: Some("$2M-$2.5M".to_string()),
            segments: vec!["Buyer".to_string(), "Relocation".to_string()],
            ..LeadDraft::default()
        },
    ]
}

/// Insert the demo leads under the seed actor, applying the same segment
/// rules the create handler applies.
pub async fn seed(pool: &DbPool) -> Result<usize, RepositoryError> {
    let repository = SqlLeadRepository::new(pool.clone());
    let drafts = demo_drafts();
    let count = drafts.len();
    for mut draft in drafts {
        draft.segments = segments_for_create(draft.segments, draft.budget_max);
        repository.create(SEED_ACTOR, draft).await?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use leadly_core::{LeadFilter, HNW_SEGMENT};

    use super::{seed, SEED_ACTOR};
    use crate::migrations::run_pending;
    use crate::repositories::{LeadRepository, SqlLeadRepository};
    use crate::connect_with_settings;

    #[tokio::test]
    async fn seeding_creates_the_demo_leads_with_segment_rules_applied() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");

        let count = seed(&pool).await.expect("seed");
        assert_eq!(count, 3);

        let repository = SqlLeadRepository::new(pool);
        let leads = repository.list(SEED_ACTOR, &LeadFilter::default()).await.expect("list");
        assert_eq!(leads.len(), 3);

        let mira = leads.iter().find(|l| l.name == "Mira Chan").expect("Mira seeded");
        assert!(mira.segments.iter().any(|s| s == HNW_SEGMENT));

        let sarah = leads.iter().find(|l| l.name == "Sarah Lee").expect("Sarah seeded");
        assert!(!sarah.segments.iter().any(|s| s == HNW_SEGMENT));
    }
}
