use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use common::tenant::TenantId;
use messaging_core::dispatcher::{EmailSendRequest, NotificationRequest, StatusReply};

use crate::error::ApiError;
use crate::handlers::authenticate;
use crate::state::AppState;

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// `POST /notifications/instant-email` — `spec.md` §6 `SendInstantEmail`.
pub async fn send_instant_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EmailSendRequest>,
) -> Result<Json<StatusReply>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let tenant = TenantId::new(claims.instance_id);
    let reply = state.dispatcher.send_instant_email(&tenant, req).await?;
    Ok(Json(reply))
}

/// `POST /notifications/queue-email-template` — `spec.md` §6
/// `QueueEmailTemplateForSending`.
pub async fn queue_email_template_for_sending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EmailSendRequest>,
) -> Result<Json<StatusReply>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let tenant = TenantId::new(claims.instance_id);
    let reply = state.dispatcher.queue_email_template_for_sending(&tenant, req).await?;
    Ok(Json(reply))
}

/// `POST /notifications/send-to-preferred-channels` — `spec.md` §6
/// `SendNotificationToPreferredChannels`.
pub async fn send_notification_to_preferred_channels(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NotificationRequest>,
) -> Result<Json<StatusReply>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let tenant = TenantId::new(claims.instance_id);
    let reply = state
        .dispatcher
        .send_notification_to_preferred_channels(&tenant, req, now_unix())
        .await?;
    Ok(Json(reply))
}

/// `POST /notifications/send-to-all-users` — `spec.md` §6
/// `SendMessageToAllUsers`. Requires role `admin`.
pub async fn send_message_to_all_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NotificationRequest>,
) -> Result<Json<StatusReply>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let reply = state.dispatcher.send_message_to_all_users(&claims, req, now_unix())?;
    Ok(Json(reply))
}

/// `POST /notifications/send-to-study-participants` — `spec.md` §6
/// `SendMessageToStudyParticipants`. Requires role `admin` or `researcher`.
pub async fn send_message_to_study_participants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NotificationRequest>,
) -> Result<Json<StatusReply>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let reply = state.dispatcher.send_message_to_study_participants(&claims, req, now_unix())?;
    Ok(Json(reply))
}
