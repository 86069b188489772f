pub mod notifications;
pub mod status;
pub mod verification;

use axum::http::HeaderMap;
use common::auth::TokenClaims;
use common::rpc_error::RpcError;

use crate::state::AppState;

/// Pull the bearer token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, RpcError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(RpcError::Unauthenticated)
}

/// Validate the bearer token and recover its claims, used by routes that
/// need the caller's tenant/role rather than just a pass-through token.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<TokenClaims, RpcError> {
    let token = bearer_token(headers)?;
    state
        .token_validator
        .validate(token)
        .map_err(|_| RpcError::Unauthenticated)
}
