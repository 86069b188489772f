use std::collections::HashMap;
use std::sync::Arc;

use common::tenant::TenantId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::retry::ErrorCategory;

/// Identifies a queued message. The source keyed rows by a Mongo
/// `ObjectID`; this workspace has no Mongo driver in its dependency stack,
/// so a `Uuid` stands in (noted in `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single queued outgoing WhatsApp message (`original_source`
/// `types.OutgoingWhatsApp`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingWhatsApp {
    pub id: MessageId,
    pub message_type: String,
    pub to: String,
    pub content: String,
    pub added_at: i64,
    pub high_prio: bool,
    pub last_send_attempt: i64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: i64,
    pub base_delay_seconds: u64,
    pub last_error_type: Option<String>,
}

/// Default retry ceiling applied when a caller doesn't set one
/// (`original_source` `AddToOutgoingWhatsApp`: `MaxRetries <= 0` => 5).
pub const DEFAULT_QUEUE_MAX_RETRIES: u32 = 5;

impl OutgoingWhatsApp {
    /// Build a freshly queued message, applying the defaults the source
    /// applies on insert.
    pub fn new(to: impl Into<String>, content: impl Into<String>, high_prio: bool, now: i64) -> Self {
        Self {
            id: MessageId::new(),
            message_type: "whatsapp".to_string(),
            to: to.into(),
            content: content.into(),
            added_at: now,
            high_prio,
            last_send_attempt: 0,
            retry_count: 0,
            max_retries: DEFAULT_QUEUE_MAX_RETRIES,
            next_retry_at: 0,
            base_delay_seconds: 0,
            last_error_type: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no outgoing message found with id {0}")]
    NotFound(MessageId),
}

/// Durable storage for the per-tenant outgoing WhatsApp queue
/// (`spec.md` component B).
///
/// `fetch_due` is the atomic select-and-update step the scheduler (component
/// G) drives: it leases up to `amount` eligible rows by stamping
/// `last_send_attempt`, the way `FindOneAndUpdate` does in the source. A row
/// already leased within `lease_window_secs` is skipped so a slow in-flight
/// send is never picked up twice.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn enqueue(&self, tenant: &TenantId, message: OutgoingWhatsApp) -> MessageId;

    async fn fetch_due(
        &self,
        tenant: &TenantId,
        amount: usize,
        lease_window_secs: i64,
        only_high_prio: bool,
        now: i64,
    ) -> Vec<OutgoingWhatsApp>;

    /// Record a retryable failure: increments `retry_count`, applies the
    /// computed backoff to `next_retry_at`, and clears the lease so the row
    /// becomes eligible again once the backoff elapses.
    async fn record_retry(
        &self,
        tenant: &TenantId,
        id: MessageId,
        category: ErrorCategory,
        next_retry_at: i64,
    ) -> Result<(), StoreError>;

    /// Remove a message outright: either it was delivered, or it failed with
    /// a non-retryable error, or it exhausted its retry budget.
    async fn delete(&self, tenant: &TenantId, id: MessageId) -> Result<(), StoreError>;

    /// Move a delivered message into the sent log, mirroring
    /// `AddToSentWhatsApp` (content is dropped, as the source does).
    async fn archive_sent(&self, tenant: &TenantId, message: OutgoingWhatsApp);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentWhatsApp {
    pub id: MessageId,
    pub to: String,
    pub added_at: i64,
    pub high_prio: bool,
}

#[derive(Default)]
struct TenantQueues {
    outgoing: HashMap<MessageId, OutgoingWhatsApp>,
    sent: Vec<SentWhatsApp>,
}

/// An in-memory `MessageStore`, standing in for the Mongo-backed collections
/// the source uses (one collection per tenant, per `spec.md` §1's tenant
/// partitioning requirement).
#[derive(Default)]
pub struct InMemoryMessageStore {
    tenants: Mutex<HashMap<TenantId, TenantQueues>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn enqueue(&self, tenant: &TenantId, message: OutgoingWhatsApp) -> MessageId {
        let id = message.id;
        let mut tenants = self.tenants.lock().await;
        tenants
            .entry(tenant.clone())
            .or_default()
            .outgoing
            .insert(id, message);
        id
    }

    async fn fetch_due(
        &self,
        tenant: &TenantId,
        amount: usize,
        lease_window_secs: i64,
        only_high_prio: bool,
        now: i64,
    ) -> Vec<OutgoingWhatsApp> {
        let mut tenants = self.tenants.lock().await;
        let Some(queues) = tenants.get_mut(tenant) else {
            return Vec::new();
        };

        let mut leased = Vec::new();
        for message in queues.outgoing.values_mut() {
            if leased.len() >= amount {
                break;
            }
            if only_high_prio && !message.high_prio {
                continue;
            }
            if message.retry_count >= message.max_retries {
                continue;
            }
            // `next_retry_at` is advisory only (`spec.md` §4.B edge-case
            // policy): the actual gate is lease age, so a freshly retried
            // message becomes eligible again purely by `last_send_attempt`
            // having been reset to 0.
            let leased_recently =
                message.last_send_attempt != 0 && now - message.last_send_attempt < lease_window_secs;
            if leased_recently {
                continue;
            }
            message.last_send_attempt = now;
            leased.push(message.clone());
        }
        leased
    }

    async fn record_retry(
        &self,
        tenant: &TenantId,
        id: MessageId,
        category: ErrorCategory,
        next_retry_at: i64,
    ) -> Result<(), StoreError> {
        let mut tenants = self.tenants.lock().await;
        let message = tenants
            .get_mut(tenant)
            .and_then(|q| q.outgoing.get_mut(&id))
            .ok_or(StoreError::NotFound(id))?;
        message.retry_count += 1;
        message.next_retry_at = next_retry_at;
        message.last_send_attempt = 0;
        message.last_error_type = Some(format!("{category:?}"));
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, id: MessageId) -> Result<(), StoreError> {
        let mut tenants = self.tenants.lock().await;
        let removed = tenants
            .get_mut(tenant)
            .and_then(|q| q.outgoing.remove(&id));
        removed.map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    async fn archive_sent(&self, tenant: &TenantId, message: OutgoingWhatsApp) {
        let mut tenants = self.tenants.lock().await;
        tenants
            .entry(tenant.clone())
            .or_default()
            .sent
            .push(SentWhatsApp {
                id: message.id,
                to: message.to,
                added_at: message.added_at,
                high_prio: message.high_prio,
            });
    }
}
