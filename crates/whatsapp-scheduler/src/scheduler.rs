use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::tenant::TenantId;
use messaging_core::retry::{next_retry_delay_secs, ErrorCategory};
use messaging_core::store::{MessageStore, OutgoingWhatsApp};
use messaging_core::vendor::whatsapp::WhatsAppDispatch;
use messaging_core::TenantDirectory;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// Component G: the tick loop that drains each tenant's outgoing WhatsApp
/// queue, grounded in `original_source`'s
/// `cmd/whatsapp-message-scheduler/main.go`.
pub struct WhatsAppScheduler {
    tenants: Arc<dyn TenantDirectory>,
    store: Arc<dyn MessageStore>,
    whatsapp: Arc<dyn WhatsAppDispatch>,
    config: SchedulerConfig,
}

impl WhatsAppScheduler {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        store: Arc<dyn MessageStore>,
        whatsapp: Arc<dyn WhatsAppDispatch>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            tenants,
            store,
            whatsapp,
            config,
        }
    }

    /// Run forever, ticking at `config.interval_secs`.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One sweep across every tenant. Exposed separately from [`run`] so
    /// tests can drive a single iteration deterministically.
    pub async fn tick(&self) {
        let now = now_unix();
        for tenant in self.tenants.list_tenants().await {
            self.process_instance(&tenant, now).await;
        }
    }

    /// High-priority messages are drained before normal-priority ones, the
    /// way the source issues two separate `FetchOutgoingWhatsApp` calls.
    async fn process_instance(&self, tenant: &TenantId, now: i64) {
        let high_prio = self
            .store
            .fetch_due(tenant, self.config.batch_size, self.config.lease_window_secs, true, now)
            .await;
        for message in high_prio {
            self.process_message(tenant, message, now).await;
        }

        let normal = self
            .store
            .fetch_due(tenant, self.config.batch_size, self.config.lease_window_secs, false, now)
            .await;
        for message in normal {
            self.process_message(tenant, message, now).await;
        }
    }

    async fn process_message(&self, tenant: &TenantId, message: OutgoingWhatsApp, now: i64) {
        let id = message.id;
        let send_result = tokio::time::timeout(
            Duration::from_secs(self.config.send_timeout_secs),
            self.whatsapp
                .send_queued_message(&message.to, &message.content, message.high_prio),
        )
        .await;

        let error_text = match send_result {
            Ok(Ok(_)) => {
                debug!(%id, "WhatsApp message sent successfully");
                if let Err(e) = self.store.delete(tenant, id).await {
                    error!(%id, error = %e, "failed to remove sent WhatsApp message");
                }
                self.store.archive_sent(tenant, message).await;
                return;
            }
            Ok(Err(err)) => err.categorization_text(),
            Err(_elapsed) => "network timeout sending WhatsApp message".to_string(),
        };

        let category = ErrorCategory::classify(&error_text);

        if !category.should_retry() {
            warn!(%id, error = %error_text, "non-retryable WhatsApp send error, dropping message");
            if let Err(e) = self.store.delete(tenant, id).await {
                error!(%id, error = %e, "failed to delete non-retryable WhatsApp message");
            }
            return;
        }

        if message.retry_count >= message.max_retries {
            warn!(%id, "WhatsApp message exceeded max retries, dropping");
            if let Err(e) = self.store.delete(tenant, id).await {
                error!(%id, error = %e, "failed to delete exhausted WhatsApp message");
            }
            return;
        }

        let delay = next_retry_delay_secs(message.retry_count, message.base_delay_seconds, category);
        let next_retry_at = now + delay as i64;

        match self.store.record_retry(tenant, id, category, next_retry_at).await {
            Ok(()) => info!(
                %id,
                delay,
                attempt = message.retry_count + 1,
                max = message.max_retries,
                "WhatsApp message scheduled for retry"
            ),
            Err(e) => error!(%id, error = %e, "failed to record retry for WhatsApp message"),
        }
    }
}
