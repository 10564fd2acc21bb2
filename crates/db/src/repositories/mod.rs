use async_trait::async_trait;
use thiserror::Error;

use leadly_core::{
    Communication, CommunicationDraft, Lead, LeadDraft, LeadFilter, LeadId, LeadPatch,
    PendingMessage, PendingMessageDraft,
};

pub mod communication;
pub mod lead;
pub mod memory;
pub mod pending;

pub use communication::SqlCommunicationRepository;
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryCommunicationRepository, InMemoryLeadRepository, InMemoryPendingMessageRepository,
};
pub use pending::SqlPendingMessageRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("lead {0} was not found or is owned by another actor")]
    NotFoundOrForbidden(LeadId),
}

/// The relational lead store, scoped by actor/ownership on every call.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create(&self, actor_id: &str, draft: LeadDraft) -> Result<Lead, RepositoryError>;
    async fn list(&self, actor_id: &str, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError>;
    async fn find_by_id(&self, id: &LeadId, actor_id: &str) -> Result<Lead, RepositoryError>;
    async fn update(
        &self,
        id: &LeadId,
        actor_id: &str,
        patch: &LeadPatch,
    ) -> Result<Lead, RepositoryError>;
}

#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    async fn record(
        &self,
        actor_id: &str,
        draft: CommunicationDraft,
    ) -> Result<Communication, RepositoryError>;
    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
        actor_id: &str,
    ) -> Result<Vec<Communication>, RepositoryError>;
}

/// Approval queue for suppressed or explicitly queued outbound messages.
#[async_trait]
pub trait PendingMessageRepository: Send + Sync {
    async fn enqueue(
        &self,
        actor_id: &str,
        draft: PendingMessageDraft,
    ) -> Result<PendingMessage, RepositoryError>;
    async fn list_pending(&self, actor_id: &str) -> Result<Vec<PendingMessage>, RepositoryError>;
}
