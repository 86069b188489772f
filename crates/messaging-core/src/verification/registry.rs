use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Default ceiling on verify attempts (`spec.md` §3).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default ceiling on resends (`spec.md` §3).
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Attempt lifetime in seconds (`spec.md` §3: 10 minutes).
pub const EXPIRY_SECS: i64 = 10 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Expired,
    Failed,
}

impl VerificationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

/// A single pending (or just-resolved) phone verification (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub token: String,
    pub tenant_id: String,
    pub user_id: String,
    pub phone_number: String,
    pub code: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: i64,
    pub expires_at: i64,
    pub status: VerificationStatus,
}

impl VerificationAttempt {
    pub fn new(token: String, tenant_id: String, user_id: String, phone_number: String, code: String, now: i64) -> Self {
        Self {
            token,
            tenant_id,
            user_id,
            phone_number,
            code,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: now,
            expires_at: now + EXPIRY_SECS,
            status: VerificationStatus::Pending,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Generate a 6-digit numeric one-time code, zero-padded.
pub fn generate_numeric_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Mint a verification token: random 128 bits hex-encoded, prefixed
/// `whatsapp_`, suffixed with the current unix second count
/// (`spec.md` §4.F step 5).
pub fn generate_verification_token(now: i64) -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    format!("whatsapp_{}_{now}", hex::encode(bytes))
}

/// Outcome of a verify attempt, returned to the caller as a soft result —
/// never an RPC error (`spec.md` §4.F `VerifyPhoneNumber`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub success: bool,
    pub verified: bool,
    pub message: String,
    pub attempts_remaining: u32,
    /// Populated only when `verified` is true, so the caller can persist the
    /// phone number on the user record after a successful verify rather than
    /// before (`spec.md` §4.F `VerifyPhoneNumber`).
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendOutcome {
    pub phone_number: String,
    pub new_code: String,
    pub expires_at: i64,
    pub attempts_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResendError {
    #[error("unknown verification token")]
    NotFound,
    #[error("verification token expired")]
    Expired,
}

/// Process-wide mapping `token -> VerificationAttempt` (`spec.md` §4.C).
///
/// All mutation is serialized behind a single mutex: verify, resend and
/// cancel race against the lazy expiry sweep, which runs at the top of
/// every method.
#[derive(Default)]
pub struct VerificationRegistry {
    attempts: Mutex<HashMap<String, VerificationAttempt>>,
}

impl VerificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly-minted attempt.
    pub async fn register(&self, attempt: VerificationAttempt) {
        let mut attempts = self.attempts.lock().await;
        attempts.insert(attempt.token.clone(), attempt);
    }

    /// Remove unconditionally (`spec.md` §4.F `CancelVerification`).
    pub async fn cancel(&self, token: &str) {
        let mut attempts = self.attempts.lock().await;
        attempts.remove(token);
    }

    async fn sweep_expired(attempts: &mut HashMap<String, VerificationAttempt>, now: i64) {
        attempts.retain(|_, a| !(a.status == VerificationStatus::Pending && a.is_expired(now)));
    }

    pub async fn verify(&self, token: &str, code: &str, now: i64) -> VerifyOutcome {
        let mut attempts = self.attempts.lock().await;
        Self::sweep_expired(&mut attempts, now).await;

        let Some(attempt) = attempts.get_mut(token) else {
            return VerifyOutcome {
                success: false,
                verified: false,
                message: "Invalid or expired verification token".to_string(),
                attempts_remaining: 0,
                tenant_id: None,
                user_id: None,
                phone_number: None,
            };
        };

        if attempt.is_expired(now) {
            attempts.remove(token);
            return VerifyOutcome {
                success: false,
                verified: false,
                message: "Verification token expired".to_string(),
                attempts_remaining: 0,
                tenant_id: None,
                user_id: None,
                phone_number: None,
            };
        }

        if attempt.attempts >= attempt.max_attempts {
            attempts.remove(token);
            return VerifyOutcome {
                success: false,
                verified: false,
                message: "Maximum verification attempts exceeded".to_string(),
                attempts_remaining: 0,
                tenant_id: None,
                user_id: None,
                phone_number: None,
            };
        }

        attempt.attempts += 1;

        if attempt.code == code {
            attempt.status = VerificationStatus::Verified;
            let tenant_id = attempt.tenant_id.clone();
            let user_id = attempt.user_id.clone();
            let phone_number = attempt.phone_number.clone();
            // A short grace period keeps a just-verified token resolvable
            // for a duplicate client submission; this registry keeps it
            // pending removal rather than spawning a standalone timer task.
            attempts.remove(token);
            return VerifyOutcome {
                success: true,
                verified: true,
                message: "Phone number verified".to_string(),
                attempts_remaining: 0,
                tenant_id: Some(tenant_id),
                user_id: Some(user_id),
                phone_number: Some(phone_number),
            };
        }

        let remaining = attempt.max_attempts - attempt.attempts;
        if remaining == 0 {
            attempts.remove(token);
            return VerifyOutcome {
                success: false,
                verified: false,
                message: "Maximum verification attempts exceeded".to_string(),
                attempts_remaining: 0,
                tenant_id: None,
                user_id: None,
                phone_number: None,
            };
        }

        VerifyOutcome {
            success: false,
            verified: false,
            message: format!("Invalid verification code. {remaining} attempts remaining."),
            attempts_remaining: remaining,
            tenant_id: None,
            user_id: None,
            phone_number: None,
        }
    }

    pub async fn resend(&self, token: &str, now: i64) -> Result<ResendOutcome, ResendError> {
        let mut attempts = self.attempts.lock().await;
        Self::sweep_expired(&mut attempts, now).await;

        let Some(attempt) = attempts.get_mut(token) else {
            return Err(ResendError::NotFound);
        };

        if attempt.is_expired(now) {
            attempts.remove(token);
            return Err(ResendError::Expired);
        }

        let new_code = generate_numeric_code();
        attempt.code = new_code.clone();
        attempt.attempts = 0;
        attempt.retry_count = 0;
        attempt.expires_at = now + EXPIRY_SECS;

        Ok(ResendOutcome {
            phone_number: attempt.phone_number.clone(),
            new_code,
            expires_at: attempt.expires_at,
            attempts_remaining: attempt.max_attempts,
        })
    }
}
