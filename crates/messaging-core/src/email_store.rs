use std::collections::HashMap;

use common::tenant::TenantId;
use common::template_types::OutgoingEmail;
use tokio::sync::Mutex;

/// The email-side sibling of [`crate::store::MessageStore`]
/// (`original_source`'s `AddToOutgoingEmails`/`AddToSentEmails`). A real
/// email gateway is out of scope for this workspace, so only the queueing
/// boundary is implemented.
#[async_trait::async_trait]
pub trait EmailQueue: Send + Sync {
    async fn enqueue(&self, tenant: &TenantId, email: OutgoingEmail);
    async fn archive_sent(&self, tenant: &TenantId, email: OutgoingEmail);
}

#[derive(Default)]
pub struct InMemoryEmailQueue {
    outgoing: Mutex<HashMap<TenantId, Vec<OutgoingEmail>>>,
    sent: Mutex<HashMap<TenantId, Vec<OutgoingEmail>>>,
}

impl InMemoryEmailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outgoing_for(&self, tenant: &TenantId) -> Vec<OutgoingEmail> {
        self.outgoing
            .lock()
            .await
            .get(tenant)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl EmailQueue for InMemoryEmailQueue {
    async fn enqueue(&self, tenant: &TenantId, email: OutgoingEmail) {
        self.outgoing
            .lock()
            .await
            .entry(tenant.clone())
            .or_default()
            .push(email);
    }

    async fn archive_sent(&self, tenant: &TenantId, email: OutgoingEmail) {
        self.sent
            .lock()
            .await
            .entry(tenant.clone())
            .or_default()
            .push(email);
    }
}
