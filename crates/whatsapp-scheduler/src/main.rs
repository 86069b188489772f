use std::sync::Arc;

use common::tenant::TenantId;
use messaging_core::collaborators::StaticTenantDirectory;
use messaging_core::store::InMemoryMessageStore;
use messaging_core::vendor::whatsapp::{WhatsAppVendorClient, WhatsAppVendorConfig};
use whatsapp_scheduler::{SchedulerConfig, WhatsAppScheduler};

fn configured_tenants() -> Vec<TenantId> {
    std::env::var("WHATSAPP_SCHEDULER_TENANTS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TenantId::new)
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("whatsapp_scheduler=info")
        .init();

    tracing::info!("Starting WhatsApp message scheduler...");

    let config = SchedulerConfig::from_env();
    let vendor_config = WhatsAppVendorConfig::from_env();
    let whatsapp = Arc::new(WhatsAppVendorClient::new(vendor_config)?);

    let tenants = Arc::new(StaticTenantDirectory::new(configured_tenants()));
    let store = InMemoryMessageStore::shared();

    let scheduler = WhatsAppScheduler::new(tenants, store, whatsapp, config);
    scheduler.run().await;

    Ok(())
}
