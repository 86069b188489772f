use thiserror::Error;

/// Errors surfaced across the issuance-path RPCs (`spec.md` §7).
///
/// Transient delivery errors never reach this type — those are absorbed by
/// the outgoing queue's retry loop (§4.G) and are never surfaced on the
/// issuing RPC.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("permission denied")]
    PermissionDenied,

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable_for_logging() {
        assert_eq!(
            RpcError::InvalidArgument("phone not valid".into()).to_string(),
            "invalid argument: phone not valid"
        );
        assert_eq!(RpcError::Unauthenticated.to_string(), "unauthenticated");
    }
}
