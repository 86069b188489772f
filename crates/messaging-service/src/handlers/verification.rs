use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use messaging_core::verification::{PhoneNumberRequest, PhoneNumberResult, ResendResult, TokenRequest, VerifyRequest, VerifyResult};

use crate::error::ApiError;
use crate::handlers::bearer_token;
use crate::state::AppState;

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// `POST /verification/add-phone-number` — `spec.md` §6 `AddPhoneNumber`.
pub async fn add_phone_number(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PhoneNumberRequest>,
) -> Result<Json<PhoneNumberResult>, ApiError> {
    let token = bearer_token(&headers)?;
    let result = state
        .verification
        .add_phone_number(token, &req.phone_number, req.method.as_deref(), now_unix())
        .await?;
    Ok(Json(result))
}

/// `POST /verification/edit-phone-number` — `spec.md` §6 `EditPhoneNumber`.
pub async fn edit_phone_number(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PhoneNumberRequest>,
) -> Result<Json<PhoneNumberResult>, ApiError> {
    let token = bearer_token(&headers)?;
    let result = state
        .verification
        .edit_phone_number(token, &req.phone_number, req.method.as_deref(), now_unix())
        .await?;
    Ok(Json(result))
}

/// `POST /verification/verify` — `spec.md` §6 `VerifyPhoneNumber`. Always
/// returns 200: the outcome is a soft result carried in the body, never an
/// RPC error.
pub async fn verify_phone_number(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResult> {
    Json(state.verification.verify_phone_number(&req.token, &req.code, now_unix()).await)
}

/// `POST /verification/resend` — `spec.md` §6 `ResendVerificationCode`.
pub async fn resend_verification_code(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<ResendResult>, ApiError> {
    let result = state.verification.resend_verification_code(&req.token, now_unix()).await?;
    Ok(Json(result))
}

/// `POST /verification/cancel` — `spec.md` §6 `CancelVerification`.
pub async fn cancel_verification(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> axum::http::StatusCode {
    state.verification.cancel_verification(&req.token).await;
    axum::http::StatusCode::NO_CONTENT
}
