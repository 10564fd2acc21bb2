use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use leadly_core::{Lead, LeadDraft, LeadFilter, LeadId, LeadPatch};

use super::{LeadRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_scoped(
        &self,
        id: &LeadId,
        actor_id: &str,
    ) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = ? AND owner_id = ?")
            .bind(&id.0)
            .bind(actor_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row_to_lead(&row)).transpose()
    }
}

#[async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn create(&self, actor_id: &str, draft: LeadDraft) -> Result<Lead, RepositoryError> {
        let now = Utc::now();
        let lead = Lead {
            id: LeadId(Uuid::new_v4().to_string()),
            owner_id: actor_id.to_string(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            neighborhood: draft.neighborhood,
            beds: draft.beds,
            baths: draft.baths,
            budget_max: draft.budget_max,
            price_range: draft.price_range,
            segments: draft.segments,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO leads (id, owner_id, name, email, phone, address, neighborhood, beds,
                                baths, budget_max, price_range, segments, notes, created_at,
                                updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&lead.id.0)
        .bind(&lead.owner_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.address)
        .bind(&lead.neighborhood)
        .bind(lead.beds.map(i64::from))
        .bind(lead.baths)
        .bind(lead.budget_max)
        .bind(&lead.price_range)
        .bind(segments_to_json(&lead.segments)?)
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(lead)
    }

    async fn list(&self, actor_id: &str, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT * FROM leads WHERE owner_id = ");
        builder.push_bind(actor_id);
        if let Some(neighborhood) = &filter.neighborhood {
            builder.push(" AND neighborhood = ").push_bind(neighborhood);
        }
        if let Some(min) = filter.min_budget {
            builder.push(" AND budget_max >= ").push_bind(min);
        }
        if let Some(max) = filter.max_budget {
            builder.push(" AND budget_max <= ").push_bind(max);
        }
        if let Some(query) = &filter.query {
            builder.push(" AND LOWER(name) LIKE ").push_bind(format!("%{}%", query.to_lowercase()));
        }
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut leads =
            rows.iter().map(row_to_lead).collect::<Result<Vec<_>, RepositoryError>>()?;

        if let Some(segment) = &filter.segment {
            leads.retain(|lead| lead.segments.iter().any(|s| s == segment));
        }
        if let Some(limit) = filter.limit {
            leads.truncate(limit as usize);
        }
        Ok(leads)
    }

    async fn find_by_id(&self, id: &LeadId, actor_id: &str) -> Result<Lead, RepositoryError> {
        self.fetch_scoped(id, actor_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFoundOrForbidden(id.clone()))
    }

    async fn update(
        &self,
        id: &LeadId,
        actor_id: &str,
        patch: &LeadPatch,
    ) -> Result<Lead, RepositoryError> {
        let mut lead = self.find_by_id(id, actor_id).await?;
        lead.apply_patch(patch);
        lead.updated_at = Utc::now();

        let outcome = sqlx::query(
            "UPDATE leads
             SET name = ?, email = ?, phone = ?, address = ?, neighborhood = ?, beds = ?,
                 baths = ?, budget_max = ?, price_range = ?, segments = ?, notes = ?,
                 updated_at = ?
             WHERE id = ? AND owner_id = ?",
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.address)
        .bind(&lead.neighborhood)
        .bind(lead.beds.map(i64::from))
        .bind(lead.baths)
        .bind(lead.budget_max)
        .bind(&lead.price_range)
        .bind(segments_to_json(&lead.segments)?)
        .bind(&lead.notes)
        .bind(lead.updated_at)
        .bind(&lead.id.0)
        .bind(actor_id)
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(RepositoryError::NotFoundOrForbidden(id.clone()));
        }
        Ok(lead)
    }
}

fn segments_to_json(segments: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(segments).map_err(|err| RepositoryError::Decode(err.to_string()))
}

fn row_to_lead(row: &SqliteRow) -> Result<Lead, RepositoryError> {
    let segments_raw: String = row.try_get("segments")?;
    let segments: Vec<String> = serde_json::from_str(&segments_raw)
        .map_err(|err| RepositoryError::Decode(format!("segments column: {err}")))?;

    Ok(Lead {
        id: LeadId(row.try_get::<String, _>("id")?),
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        neighborhood: row.try_get("neighborhood")?,
        beds: row.try_get::<Option<i64>, _>("beds")?.map(|b| b as u32),
        baths: row.try_get("baths")?,
        budget_max: row.try_get("budget_max")?,
        price_range: row.try_get("price_range")?,
        segments,
        notes: row.try_get("notes")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use leadly_core::{LeadDraft, LeadFilter, LeadId, LeadPatch};

    use super::SqlLeadRepository;
    use crate::migrations::run_pending;
    use crate::repositories::{LeadRepository, RepositoryError};
    use crate::connect_with_settings;

    async fn repository() -> SqlLeadRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        SqlLeadRepository::new(pool)
    }

    fn draft(name: &str, budget_max: Option<i64>) -> LeadDraft {
        LeadDraft {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            neighborhood: Some("SOMA".to_string()),
            beds: Some(2),
            baths: Some(2.0),
            budget_max,
            ..LeadDraft::default()
        }
    }

    #[tokio::test]
    async fn created_leads_round_trip_with_owner_attribution() {
        let repository = repository().await;
        let created =
            repository.create("agent-1", draft("Sarah Lee", Some(1_500_000))).await.expect("create");

        assert_eq!(created.owner_id, "agent-1");

        let fetched = repository.find_by_id(&created.id, "agent-1").await.expect("find");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn reads_are_scoped_to_the_owning_actor() {
        let repository = repository().await;
        let created =
            repository.create("agent-1", draft("Sarah Lee", None)).await.expect("create");

        let result = repository.find_by_id(&created.id, "agent-2").await;
        assert!(matches!(result, Err(RepositoryError::NotFoundOrForbidden(_))));

        let missing = repository.find_by_id(&LeadId("nope".to_string()), "agent-1").await;
        assert!(matches!(missing, Err(RepositoryError::NotFoundOrForbidden(_))));
    }

    #[tokio::test]
    async fn update_merges_the_patch_and_bumps_updated_at() {
        let repository = repository().await;
        let created =
            repository.create("agent-1", draft("Sarah Lee", Some(1_000_000))).await.expect("create");

        let updated = repository
            .update(
                &created.id,
                "agent-1",
                &LeadPatch { budget_max: Some(2_500_000), ..LeadPatch::default() },
            )
            .await
            .expect("update");

        assert_eq!(updated.budget_max, Some(2_500_000));
        assert_eq!(updated.name, "Sarah Lee");
        assert!(updated.updated_at >= created.updated_at);

        let result = repository
            .update(&created.id, "agent-2", &LeadPatch { notes: Some("x".into()), ..LeadPatch::default() })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFoundOrForbidden(_))));
    }

    #[tokio::test]
    async fn list_applies_budget_segment_and_limit_filters() {
        let repository = repository().await;
        repository.create("agent-1", draft("Sarah Lee", Some(1_500_000))).await.expect("create");
        repository
            .create(
                "agent-1",
                LeadDraft {
                    segments: vec!["High Net Worth".to_string()],
                    ..draft("Mira Chan", Some(4_000_000))
                },
            )
            .await
            .expect("create");
        repository.create("agent-2", draft("Other Actor", Some(9_000_000))).await.expect("create");

        let all = repository.list("agent-1", &LeadFilter::default()).await.expect("list");
        assert_eq!(all.len(), 2);

        let wealthy = repository
            .list("agent-1", &LeadFilter { min_budget: Some(2_000_000), ..LeadFilter::default() })
            .await
            .expect("list");
        assert_eq!(wealthy.len(), 1);
        assert_eq!(wealthy[0].name, "Mira Chan");

        let tagged = repository
            .list(
                "agent-1",
                &LeadFilter { segment: Some("High Net Worth".to_string()), ..LeadFilter::default() },
            )
            .await
            .expect("list");
        assert_eq!(tagged.len(), 1);

        let limited = repository
            .list("agent-1", &LeadFilter { limit: Some(1), ..LeadFilter::default() })
            .await
            .expect("list");
        assert_eq!(limited.len(), 1);
    }
}
