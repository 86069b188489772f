use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::rpc_error::RpcError;
use serde::Serialize;

/// Wraps [`RpcError`] so it can be returned directly from an axum handler.
pub struct ApiError(pub RpcError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RpcError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RpcError::PermissionDenied => StatusCode::FORBIDDEN,
            RpcError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
