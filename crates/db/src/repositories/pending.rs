use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use leadly_core::{LeadId, PendingMessage, PendingMessageDraft};

use super::communication::channel_from_str;
use super::{PendingMessageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPendingMessageRepository {
    pool: DbPool,
}

impl SqlPendingMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingMessageRepository for SqlPendingMessageRepository {
    async fn enqueue(
        &self,
        actor_id: &str,
        draft: PendingMessageDraft,
    ) -> Result<PendingMessage, RepositoryError> {
        let pending = PendingMessage {
            id: Uuid::new_v4().to_string(),
            lead_id: draft.lead_id,
            channel: draft.channel,
            subject: draft.subject,
            body: draft.body,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO pending_messages (id, lead_id, owner_id, channel, subject, body, status,
                                           created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'pending_approval', ?)",
        )
        .bind(&pending.id)
        .bind(&pending.lead_id.0)
        .bind(actor_id)
        .bind(pending.channel.as_str())
        .bind(&pending.subject)
        .bind(&pending.body)
        .bind(pending.created_at)
        .execute(&self.pool)
        .await?;

        Ok(pending)
    }

    async fn list_pending(&self, actor_id: &str) -> Result<Vec<PendingMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM pending_messages
             WHERE owner_id = ? AND status = 'pending_approval'
             ORDER BY created_at, id",
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_pending).collect()
    }
}

fn row_to_pending(row: &SqliteRow) -> Result<PendingMessage, RepositoryError> {
    Ok(PendingMessage {
        id: row.try_get("id")?,
        lead_id: LeadId(row.try_get::<String, _>("lead_id")?),
        channel: channel_from_str(&row.try_get::<String, _>("channel")?)?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}
