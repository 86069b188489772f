use axum::extract::State;
use axum::Json;
use messaging_core::dispatcher::StatusReply;

use crate::state::AppState;

/// `GET /status` — `spec.md` §6 `Status`.
pub async fn status(State(state): State<AppState>) -> Json<StatusReply> {
    Json(state.dispatcher.status())
}
