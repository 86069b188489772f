use std::sync::Arc;
use std::sync::OnceLock;

use common::auth::{TokenClaims, TokenValidator};
use common::rpc_error::{RpcError, RpcResult};
use common::tenant::TenantId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collaborators::{ContactKind, UserDirectory, UserId};
use crate::vendor::sms::SmsVendorClient;
use crate::vendor::whatsapp::WhatsAppDispatch;
use crate::verification::registry::{
    generate_numeric_code, generate_verification_token, ResendError, VerificationAttempt,
    VerificationRegistry, VerifyOutcome,
};

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid phone regex"))
}

/// Delivery method requested for a verification code (`spec.md` §4.F step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Whatsapp,
    Sms,
}

impl DeliveryMethod {
    pub fn parse(method: Option<&str>) -> RpcResult<Self> {
        match method {
            None | Some("whatsapp") => Ok(DeliveryMethod::Whatsapp),
            Some("sms") => Ok(DeliveryMethod::Sms),
            Some(other) => Err(RpcError::InvalidArgument(format!(
                "unsupported verification method `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneNumberResult {
    pub success: bool,
    pub verification_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    pub verified: bool,
    pub message: String,
    pub attempts_remaining: u32,
}

impl From<VerifyOutcome> for VerifyResult {
    fn from(outcome: VerifyOutcome) -> Self {
        Self {
            success: outcome.success,
            verified: outcome.verified,
            message: outcome.message,
            attempts_remaining: outcome.attempts_remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendResult {
    pub success: bool,
    pub expires_at: i64,
    pub attempts_remaining: u32,
}

/// JSON request body for `AddPhoneNumber`/`EditPhoneNumber`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumberRequest {
    pub phone_number: String,
    pub method: Option<String>,
}

/// JSON request body for `VerifyPhoneNumber`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    pub code: String,
}

/// JSON request body for `ResendVerificationCode`/`CancelVerification`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Exposes the phone-verification state machine as five operations
/// (`spec.md` §4.F), grounded in
/// `original_source/pkg/grpc/service/account_management_endpoints.go`
/// (token minting, account-confirmed precondition) but enriched with the
/// stricter E.164 validation and method-driven dispatch that `spec.md` §9
/// directs implementers to adopt over the thinner duplicate handler.
pub struct VerificationCoordinator {
    registry: Arc<VerificationRegistry>,
    users: Arc<dyn UserDirectory>,
    whatsapp: Arc<dyn WhatsAppDispatch>,
    sms: Arc<dyn SmsVendorClient>,
    token_validator: Arc<dyn TokenValidator>,
}

impl VerificationCoordinator {
    pub fn new(
        registry: Arc<VerificationRegistry>,
        users: Arc<dyn UserDirectory>,
        whatsapp: Arc<dyn WhatsAppDispatch>,
        sms: Arc<dyn SmsVendorClient>,
        token_validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            registry,
            users,
            whatsapp,
            sms,
            token_validator,
        }
    }

    fn validate_phone(phone: &str) -> RpcResult<()> {
        if phone.is_empty() {
            return Err(RpcError::InvalidArgument("phone number cannot be empty".to_string()));
        }
        if !phone_regex().is_match(phone) {
            return Err(RpcError::InvalidArgument("phone not valid".to_string()));
        }
        Ok(())
    }

    async fn authenticate(&self, auth_token: &str) -> RpcResult<TokenClaims> {
        self.token_validator
            .validate(auth_token)
            .map_err(|_| RpcError::Unauthenticated)
    }

    async fn dispatch_code(&self, method: DeliveryMethod, phone: &str, code: &str) -> RpcResult<()> {
        match method {
            DeliveryMethod::Whatsapp => self
                .whatsapp
                .send_verification_code(phone, code)
                .await
                .map(|_| ())
                .map_err(|e| RpcError::Internal(e.to_string())),
            DeliveryMethod::Sms => self
                .sms
                .send_verification_code(phone, code)
                .await
                .map_err(|e| RpcError::Internal(e.to_string())),
        }
    }

    async fn issue(
        &self,
        auth_token: &str,
        phone_number: &str,
        method: Option<&str>,
        require_existing_phone_contact: bool,
        now: i64,
    ) -> RpcResult<PhoneNumberResult> {
        let claims = self.authenticate(auth_token).await?;
        Self::validate_phone(phone_number)?;
        let method = DeliveryMethod::parse(method)?;

        let tenant = TenantId::new(claims.instance_id.clone());
        let user_id = UserId::new(claims.user_id.clone());
        let user = self.users.get_user(&tenant, &user_id).await?;

        if !user.is_account_confirmed() {
            return Err(RpcError::FailedPrecondition("account not confirmed".to_string()));
        }
        if require_existing_phone_contact && !user.has_contact(ContactKind::Phone) {
            return Err(RpcError::InvalidArgument(
                "user has no existing phone contact to edit".to_string(),
            ));
        }

        let token = generate_verification_token(now);
        let code = generate_numeric_code();

        // The phone number is persisted on the user only after a successful
        // verify (`spec.md` §4.F `VerifyPhoneNumber`), not here at issuance.
        self.registry
            .register(VerificationAttempt::new(
                token.clone(),
                tenant.as_str().to_string(),
                user_id.0.clone(),
                phone_number.to_string(),
                code.clone(),
                now,
            ))
            .await;

        if let Err(err) = self.dispatch_code(method, phone_number, &code).await {
            self.registry.cancel(&token).await;
            return Err(RpcError::Internal(format!("failed to dispatch verification code: {err}")));
        }

        Ok(PhoneNumberResult {
            success: true,
            verification_token: token,
        })
    }

    /// `spec.md` §4.F `AddPhoneNumber`.
    pub async fn add_phone_number(
        &self,
        auth_token: &str,
        phone_number: &str,
        method: Option<&str>,
        now: i64,
    ) -> RpcResult<PhoneNumberResult> {
        self.issue(auth_token, phone_number, method, false, now).await
    }

    /// `spec.md` §4.F `EditPhoneNumber`.
    pub async fn edit_phone_number(
        &self,
        auth_token: &str,
        new_phone_number: &str,
        method: Option<&str>,
        now: i64,
    ) -> RpcResult<PhoneNumberResult> {
        self.issue(auth_token, new_phone_number, method, true, now).await
    }

    /// `spec.md` §4.F `VerifyPhoneNumber` — always a soft result, never an
    /// RPC error. On success, persists the phone number on the user
    /// best-effort: a persistence failure is logged but never turns a
    /// successful verify into a failed response.
    pub async fn verify_phone_number(&self, token: &str, code: &str, now: i64) -> VerifyResult {
        let outcome = self.registry.verify(token, code, now).await;

        if outcome.verified {
            if let (Some(tenant_id), Some(user_id), Some(phone_number)) =
                (&outcome.tenant_id, &outcome.user_id, &outcome.phone_number)
            {
                let tenant = TenantId::new(tenant_id.clone());
                let user_id = UserId::new(user_id.clone());
                if let Err(err) = self
                    .users
                    .set_phone_number(&tenant, &user_id, phone_number, token)
                    .await
                {
                    warn!(token, %err, "failed to persist verified phone number on user");
                }
            }
        }

        outcome.into()
    }

    /// `spec.md` §4.F `ResendVerificationCode`.
    pub async fn resend_verification_code(&self, token: &str, now: i64) -> RpcResult<ResendResult> {
        let outcome = self.registry.resend(token, now).await.map_err(|e| match e {
            ResendError::NotFound => RpcError::NotFound("unknown verification token".to_string()),
            ResendError::Expired => RpcError::DeadlineExceeded("verification token expired".to_string()),
        })?;

        self.whatsapp
            .send_verification_code(&outcome.phone_number, &outcome.new_code)
            .await
            .map_err(|e| RpcError::Internal(format!("failed to dispatch resend: {e}")))?;

        Ok(ResendResult {
            success: true,
            expires_at: outcome.expires_at,
            attempts_remaining: outcome.attempts_remaining,
        })
    }

    /// `spec.md` §4.F `CancelVerification` — unconditional success.
    pub async fn cancel_verification(&self, token: &str) {
        self.registry.cancel(token).await;
    }
}
