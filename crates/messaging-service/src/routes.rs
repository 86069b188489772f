use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

pub fn create_route(state: AppState) -> Router {
    Router::new()
        .route("/verification/add-phone-number", post(handlers::verification::add_phone_number))
        .route("/verification/edit-phone-number", post(handlers::verification::edit_phone_number))
        .route("/verification/verify", post(handlers::verification::verify_phone_number))
        .route("/verification/resend", post(handlers::verification::resend_verification_code))
        .route("/verification/cancel", post(handlers::verification::cancel_verification))
        .route("/notifications/instant-email", post(handlers::notifications::send_instant_email))
        .route(
            "/notifications/queue-email-template",
            post(handlers::notifications::queue_email_template_for_sending),
        )
        .route(
            "/notifications/send-to-preferred-channels",
            post(handlers::notifications::send_notification_to_preferred_channels),
        )
        .route(
            "/notifications/send-to-all-users",
            post(handlers::notifications::send_message_to_all_users),
        )
        .route(
            "/notifications/send-to-study-participants",
            post(handlers::notifications::send_message_to_study_participants),
        )
        .route("/status", get(handlers::status::status))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
}
