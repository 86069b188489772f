use std::sync::Arc;

use common::auth::TokenValidator;
use messaging_core::dispatcher::NotificationDispatcher;
use messaging_core::verification::VerificationCoordinator;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub verification: Arc<VerificationCoordinator>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub token_validator: Arc<dyn TokenValidator>,
}

impl AppState {
    pub fn new(
        verification: Arc<VerificationCoordinator>,
        dispatcher: Arc<NotificationDispatcher>,
        token_validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            verification,
            dispatcher,
            token_validator,
        }
    }
}
