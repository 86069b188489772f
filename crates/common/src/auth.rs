use crate::rpc_error::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A role a caller's auth token may carry. Bulk sends require `Admin` (or
/// `Researcher` for study-scoped sends), per `spec.md` §4.H / §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Researcher,
    Participant,
}

/// Claims recovered from a validated auth token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub instance_id: String,
    pub roles: Vec<Role>,
}

impl TokenClaims {
    pub fn has_any_role(&self, wanted: &[Role]) -> bool {
        self.roles.iter().any(|r| wanted.contains(r))
    }
}

/// Validates an opaque auth token into `TokenClaims`. The real
/// implementation (session lookup, JWT verification, ...) lives in the
/// user-management service and is out of scope (`spec.md` §1); this trait is
/// the seam the core consumes.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> RpcResult<TokenClaims>;
}

/// An in-memory token validator for tests and local development, keyed by
/// the raw token string.
#[derive(Debug, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, TokenClaims>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, token: impl Into<String>, claims: TokenClaims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> RpcResult<TokenClaims> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(RpcError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_token_is_unauthenticated() {
        let validator = StaticTokenValidator::new();
        assert_eq!(validator.validate("nope"), Err(RpcError::Unauthenticated));
    }

    #[test]
    fn known_token_resolves_claims() {
        let validator = StaticTokenValidator::new().register(
            "tok-1",
            TokenClaims {
                user_id: "u1".into(),
                instance_id: "t1".into(),
                roles: vec![Role::Admin],
            },
        );
        let claims = validator.validate("tok-1").unwrap();
        assert_eq!(claims.user_id, "u1");
        assert!(claims.has_any_role(&[Role::Admin, Role::Researcher]));
        assert!(!claims.has_any_role(&[Role::Researcher]));
    }
}
