use std::sync::Arc;

use common::auth::StaticTokenValidator;
use messaging_core::collaborators::InMemoryUserDirectory;
use messaging_core::dispatcher::{InMemoryEmailTemplateStore, NotificationDispatcher, NullEmailSender};
use messaging_core::email_store::InMemoryEmailQueue;
use messaging_core::store::InMemoryMessageStore;
use messaging_core::vendor::sms::NullSmsVendorClient;
use messaging_core::vendor::whatsapp::{WhatsAppVendorClient, WhatsAppVendorConfig};
use messaging_core::verification::VerificationCoordinator;
use messaging_core::verification::VerificationRegistry;
use messaging_service::config::AppConfig;
use messaging_service::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("messaging_service=info,tower_http=debug")
        .init();

    let config = AppConfig::from_env();
    let vendor_config = WhatsAppVendorConfig::from_env();
    let whatsapp = Arc::new(WhatsAppVendorClient::new(vendor_config)?);

    let users = Arc::new(InMemoryUserDirectory::new());
    let registry = Arc::new(VerificationRegistry::new());
    // `StaticTokenValidator` starts empty: the real token-issuing identity
    // provider is out of scope for this workspace (`spec.md` §1) and is
    // expected to be wired in by the deployment.
    let token_validator = Arc::new(StaticTokenValidator::new());

    let verification = Arc::new(VerificationCoordinator::new(
        registry,
        users.clone(),
        whatsapp.clone(),
        Arc::new(NullSmsVendorClient),
        token_validator.clone(),
    ));

    let dispatcher = Arc::new(NotificationDispatcher::new(
        users,
        Arc::new(InMemoryEmailTemplateStore::new()),
        Arc::new(InMemoryEmailQueue::new()),
        Arc::new(NullEmailSender),
        InMemoryMessageStore::shared(),
    ));

    let state = AppState::new(verification, dispatcher, token_validator);

    messaging_service::run_server(state, config).await
}
