use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use leadly_core::{
    Communication, CommunicationDirection, CommunicationDraft, LeadId, MessageChannel,
};

use super::{CommunicationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCommunicationRepository {
    pool: DbPool,
}

impl SqlCommunicationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommunicationRepository for SqlCommunicationRepository {
    async fn record(
        &self,
        actor_id: &str,
        draft: CommunicationDraft,
    ) -> Result<Communication, RepositoryError> {
        let communication = Communication {
            id: Uuid::new_v4().to_string(),
            lead_id: draft.lead_id,
            channel: draft.channel,
            direction: draft.direction,
            body: draft.body,
            occurred_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO communications (id, lead_id, owner_id, channel, direction, body,
                                         occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&communication.id)
        .bind(&communication.lead_id.0)
        .bind(actor_id)
        .bind(communication.channel.as_str())
        .bind(direction_to_str(communication.direction))
        .bind(&communication.body)
        .bind(communication.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(communication)
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
        actor_id: &str,
    ) -> Result<Vec<Communication>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM communications
             WHERE lead_id = ? AND owner_id = ?
             ORDER BY occurred_at DESC, id",
        )
        .bind(&lead_id.0)
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_communication).collect()
    }
}

fn direction_to_str(direction: CommunicationDirection) -> &'static str {
    match direction {
        CommunicationDirection::Inbound => "inbound",
        CommunicationDirection::Outbound => "outbound",
    }
}

pub(crate) fn channel_from_str(raw: &str) -> Result<MessageChannel, RepositoryError> {
    match raw {
        "sms" => Ok(MessageChannel::Sms),
        "whatsapp" => Ok(MessageChannel::Whatsapp),
        "email" => Ok(MessageChannel::Email),
        other => Err(RepositoryError::Decode(format!("unknown channel `{other}`"))),
    }
}

fn direction_from_str(raw: &str) -> Result<CommunicationDirection, RepositoryError> {
    match raw {
        "inbound" => Ok(CommunicationDirection::Inbound),
        "outbound" => Ok(CommunicationDirection::Outbound),
        other => Err(RepositoryError::Decode(format!("unknown direction `{other}`"))),
    }
}

fn row_to_communication(row: &SqliteRow) -> Result<Communication, RepositoryError> {
    Ok(Communication {
        id: row.try_get("id")?,
        lead_id: LeadId(row.try_get::<String, _>("lead_id")?),
        channel: channel_from_str(&row.try_get::<String, _>("channel")?)?,
        direction: direction_from_str(&row.try_get::<String, _>("direction")?)?,
        body: row.try_get("body")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
    })
}
