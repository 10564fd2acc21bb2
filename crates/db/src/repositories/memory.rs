//! In-memory repository fakes for executor and server tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use leadly_core::{
    Communication, CommunicationDraft, Lead, LeadDraft, LeadFilter, LeadId, LeadPatch,
    PendingMessage, PendingMessageDraft,
};

use super::{
    CommunicationRepository, LeadRepository, PendingMessageRepository, RepositoryError,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Default)]
pub struct InMemoryLeadRepository {
    leads: Arc<Mutex<Vec<Lead>>>,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a lead with a fixed id, bypassing the create path.
    pub fn insert(&self, lead: Lead) {
        lock(&self.leads).push(lead);
    }

    pub fn all(&self) -> Vec<Lead> {
        lock(&self.leads).clone()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
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
        lock(&self.leads).push(lead.clone());
        Ok(lead)
    }

    async fn list(&self, actor_id: &str, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let mut leads: Vec<Lead> = lock(&self.leads)
            .iter()
            .filter(|lead| lead.owner_id == actor_id)
            .filter(|lead| {
                filter
                    .neighborhood
                    .as_deref()
                    .map_or(true, |n| lead.neighborhood.as_deref() == Some(n))
            })
            .filter(|lead| {
                filter.min_budget.map_or(true, |min| lead.budget_max.is_some_and(|b| b >= min))
            })
            .filter(|lead| {
                filter.max_budget.map_or(true, |max| lead.budget_max.is_some_and(|b| b <= max))
            })
            .filter(|lead| {
                filter
                    .query
                    .as_deref()
                    .map_or(true, |q| lead.name.to_lowercase().contains(&q.to_lowercase()))
            })
            .filter(|lead| {
                filter.segment.as_ref().map_or(true, |s| lead.segments.iter().any(|tag| tag == s))
            })
            .cloned()
            .collect();

        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            leads.truncate(limit as usize);
        }
        Ok(leads)
    }

    async fn find_by_id(&self, id: &LeadId, actor_id: &str) -> Result<Lead, RepositoryError> {
        lock(&self.leads)
            .iter()
            .find(|lead| &lead.id == id && lead.owner_id == actor_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFoundOrForbidden(id.clone()))
    }

    async fn update(
        &self,
        id: &LeadId,
        actor_id: &str,
        patch: &LeadPatch,
    ) -> Result<Lead, RepositoryError> {
        let mut leads = lock(&self.leads);
        let lead = leads
            .iter_mut()
            .find(|lead| &lead.id == id && lead.owner_id == actor_id)
            .ok_or_else(|| RepositoryError::NotFoundOrForbidden(id.clone()))?;
        lead.apply_patch(patch);
        lead.updated_at = Utc::now();
        Ok(lead.clone())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCommunicationRepository {
    entries: Arc<Mutex<Vec<(String, Communication)>>>,
}

impl InMemoryCommunicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Communication> {
        lock(&self.entries).iter().map(|(_, entry)| entry.clone()).collect()
    }
}

#[async_trait]
impl CommunicationRepository for InMemoryCommunicationRepository {
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
        lock(&self.entries).push((actor_id.to_string(), communication.clone()));
        Ok(communication)
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
        actor_id: &str,
    ) -> Result<Vec<Communication>, RepositoryError> {
        Ok(lock(&self.entries)
            .iter()
            .filter(|(owner, entry)| owner == actor_id && &entry.lead_id == lead_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPendingMessageRepository {
    messages: Arc<Mutex<Vec<(String, PendingMessage)>>>,
}

impl InMemoryPendingMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PendingMessage> {
        lock(&self.messages).iter().map(|(_, message)| message.clone()).collect()
    }
}

#[async_trait]
impl PendingMessageRepository for InMemoryPendingMessageRepository {
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
        lock(&self.messages).push((actor_id.to_string(), pending.clone()));
        Ok(pending)
    }

    async fn list_pending(&self, actor_id: &str) -> Result<Vec<PendingMessage>, RepositoryError> {
        Ok(lock(&self.messages)
            .iter()
            .filter(|(owner, _)| owner == actor_id)
            .map(|(_, message)| message.clone())
            .collect())
    }
}
