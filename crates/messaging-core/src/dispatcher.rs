use std::collections::HashMap;
use std::sync::Arc;

use common::auth::{Role, TokenClaims};
use common::contact::Channel;
use common::rpc_error::{RpcError, RpcResult};
use common::template_types::{HeaderOverrides, OutgoingEmail};
use common::tenant::TenantId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::collaborators::{UserDirectory, UserId};
use crate::email_store::EmailQueue;
use crate::store::{MessageStore, OutgoingWhatsApp};
use crate::template::{decode_template_body, get_template_translation, resolve_template, strip_html_markers_for_whatsapp, TemplateError};

/// The fixed set of placeholders every template render is seeded with,
/// before per-call `content_infos` are layered on top
/// (`original_source`'s `templates.LoadGlobalEmailTemplateConstants`).
pub fn global_template_constants() -> HashMap<String, String> {
    let mut constants = HashMap::new();
    constants.insert("platformName".to_string(), "InfluenzaNet".to_string());
    constants
}

#[derive(Debug, Error)]
pub enum EmailSendError {
    #[error("email gateway error: {0}")]
    Gateway(String),
}

/// The out-of-scope email gateway seam (`spec.md` §1).
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        to: &[String],
        headers: &HeaderOverrides,
        subject: &str,
        content: &str,
        high_prio: bool,
    ) -> Result<(), EmailSendError>;
}

/// The email-template lookup seam, standing in for
/// `original_source`'s `messageDBservice.FindEmailTemplateByType`.
#[async_trait::async_trait]
pub trait EmailTemplateStore: Send + Sync {
    async fn find_by_type(
        &self,
        tenant: &TenantId,
        message_type: &str,
        study_key: &str,
    ) -> RpcResult<common::template_types::EmailTemplate>;
}

/// An in-memory `EmailTemplateStore`, standing in for the out-of-scope
/// message database (`spec.md` §1).
#[derive(Default)]
pub struct InMemoryEmailTemplateStore {
    templates: std::sync::Mutex<HashMap<(TenantId, String, String), common::template_types::EmailTemplate>>,
}

impl InMemoryEmailTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tenant: &TenantId, template: common::template_types::EmailTemplate) {
        let key = (tenant.clone(), template.message_type.clone(), template.study_key.clone());
        self.templates.lock().expect("template store mutex poisoned").insert(key, template);
    }
}

#[async_trait::async_trait]
impl EmailTemplateStore for InMemoryEmailTemplateStore {
    async fn find_by_type(
        &self,
        tenant: &TenantId,
        message_type: &str,
        study_key: &str,
    ) -> RpcResult<common::template_types::EmailTemplate> {
        self.templates
            .lock()
            .expect("template store mutex poisoned")
            .get(&(tenant.clone(), message_type.to_string(), study_key.to_string()))
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("no template registered for {message_type}")))
    }
}

/// An `EmailSender` that only logs, standing in for the out-of-scope email
/// gateway (`spec.md` §1).
pub struct NullEmailSender;

#[async_trait::async_trait]
impl EmailSender for NullEmailSender {
    async fn send_email(
        &self,
        to: &[String],
        _headers: &HeaderOverrides,
        subject: &str,
        _content: &str,
        _high_prio: bool,
    ) -> Result<(), EmailSendError> {
        debug!(?to, subject, "email gateway not configured, discarding send");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Normal,
    Problem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReply {
    pub status: ServiceStatus,
    pub message: String,
}

/// A request to render a named template and deliver it by email, shared by
/// `SendInstantEmail` and `QueueEmailTemplateForSending` (`spec.md` §4.H,
/// §6).
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSendRequest {
    pub message_type: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub study_key: String,
    pub preferred_language: String,
    #[serde(default)]
    pub content_infos: HashMap<String, String>,
    #[serde(default)]
    pub use_low_prio: bool,
}

/// A request to notify a set of users over each user's preferred channels
/// (`spec.md` §4.H `SendNotificationToPreferredChannels`).
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    pub recipients: Vec<UserId>,
    pub message_type: String,
    #[serde(default)]
    pub study_key: String,
    pub preferred_language: String,
    #[serde(default)]
    pub content_infos: HashMap<String, String>,
    #[serde(default)]
    pub use_low_prio: bool,
}

const WHATSAPP_VERIFICATION_MESSAGE_TYPE: &str = "whatsapp_verification";

/// Component H: fans a single logical notification out across email and
/// WhatsApp according to each recipient's preferences, grounded in
/// `original_source`'s `send_message_endpoints.go`.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    templates: Arc<dyn EmailTemplateStore>,
    email_queue: Arc<dyn EmailQueue>,
    email_sender: Arc<dyn EmailSender>,
    whatsapp_queue: Arc<dyn MessageStore>,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        templates: Arc<dyn EmailTemplateStore>,
        email_queue: Arc<dyn EmailQueue>,
        email_sender: Arc<dyn EmailSender>,
        whatsapp_queue: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            users,
            templates,
            email_queue,
            email_sender,
            whatsapp_queue,
        }
    }

    fn content_infos_with_language(req_infos: &HashMap<String, String>, lang: &str) -> HashMap<String, String> {
        let mut merged = global_template_constants();
        merged.extend(req_infos.clone());
        merged.insert("language".to_string(), lang.to_string());
        merged
    }

    async fn render_email_body(
        &self,
        tenant: &TenantId,
        message_type: &str,
        study_key: &str,
        preferred_language: &str,
        content_infos: &HashMap<String, String>,
    ) -> RpcResult<(common::template_types::LocalizedTemplate, HeaderOverrides, String)> {
        let template = self.templates.find_by_type(tenant, message_type, study_key).await?;

        let translation = get_template_translation(&template, preferred_language)
            .ok_or_else(|| RpcError::Internal("no translation available".to_string()))?
            .clone();

        let decoded = decode_template_body(&translation.template_def)
            .map_err(|e| RpcError::Internal(e.to_string()))?;

        let infos = Self::content_infos_with_language(content_infos, preferred_language);
        let template_name = format!("{}{}{}", tenant.as_str(), message_type, preferred_language);
        let content = resolve_template(&template_name, &decoded, &infos)
            .map_err(|e| RpcError::Internal(e.to_string()))?;

        Ok((translation, template.header_overrides.clone(), content))
    }

    /// `spec.md` §6 `SendInstantEmail`: render then deliver synchronously,
    /// falling back to the outgoing queue on delivery failure.
    pub async fn send_instant_email(&self, tenant: &TenantId, req: EmailSendRequest) -> RpcResult<StatusReply> {
        if req.to.is_empty() || req.message_type.is_empty() {
            return Err(RpcError::InvalidArgument("missing argument".to_string()));
        }

        let (translation, headers, content) = self
            .render_email_body(
                tenant,
                &req.message_type,
                &req.study_key,
                &req.preferred_language,
                &req.content_infos,
            )
            .await?;

        let outgoing = OutgoingEmail {
            message_type: req.message_type.clone(),
            to: req.to.clone(),
            header_overrides: headers.clone(),
            subject: translation.subject.clone(),
            content: content.clone(),
            high_prio: !req.use_low_prio,
        };

        match self
            .email_sender
            .send_email(&outgoing.to, &headers, &outgoing.subject, &content, outgoing.high_prio)
            .await
        {
            Ok(()) => {
                self.email_queue.archive_sent(tenant, outgoing).await;
                Ok(StatusReply {
                    status: ServiceStatus::Normal,
                    message: "message sent".to_string(),
                })
            }
            Err(err) => {
                warn!(%err, "instant email delivery failed, queueing for retry");
                self.email_queue.enqueue(tenant, outgoing).await;
                Ok(StatusReply {
                    status: ServiceStatus::Problem,
                    message: "failed sending message, added to outgoing".to_string(),
                })
            }
        }
    }

    /// `spec.md` §6 `QueueEmailTemplateForSending`: render then enqueue,
    /// never calling the email gateway directly.
    pub async fn queue_email_template_for_sending(
        &self,
        tenant: &TenantId,
        req: EmailSendRequest,
    ) -> RpcResult<StatusReply> {
        if req.to.is_empty() || req.message_type.is_empty() {
            return Err(RpcError::InvalidArgument("missing argument".to_string()));
        }

        let (translation, headers, content) = self
            .render_email_body(
                tenant,
                &req.message_type,
                &req.study_key,
                &req.preferred_language,
                &req.content_infos,
            )
            .await?;

        let outgoing = OutgoingEmail {
            message_type: req.message_type,
            to: req.to,
            header_overrides: headers,
            subject: translation.subject,
            content,
            high_prio: !req.use_low_prio,
        };

        self.email_queue.enqueue(tenant, outgoing).await;
        Ok(StatusReply {
            status: ServiceStatus::Normal,
            message: "message added to outgoing".to_string(),
        })
    }

    async fn try_queue_whatsapp(
        &self,
        tenant: &TenantId,
        whatsapp_number: &str,
        message_type: &str,
        study_key: &str,
        preferred_language: &str,
        content_infos: &HashMap<String, String>,
        use_low_prio: bool,
        now: i64,
    ) -> bool {
        let template = match self.templates.find_by_type(tenant, message_type, study_key).await {
            Ok(t) => t,
            Err(_) => {
                error!(message_type, "template not found for WhatsApp message");
                return false;
            }
        };

        let translation = match get_template_translation(&template, preferred_language) {
            Some(t) => t,
            None => return false,
        };

        let decoded = match decode_template_body(&translation.template_def) {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "failed to decode WhatsApp template");
                return false;
            }
        };

        let infos = Self::content_infos_with_language(content_infos, preferred_language);
        let template_name = format!("{}{}{}_whatsapp", tenant.as_str(), message_type, preferred_language);
        let mut content = match resolve_template(&template_name, &decoded, &infos) {
            Ok(c) => c,
            Err(TemplateError::UndefinedPlaceholder(key)) => {
                error!(key, "undefined placeholder resolving WhatsApp template");
                return false;
            }
            Err(e) => {
                error!(error = %e, "failed to resolve WhatsApp template");
                return false;
            }
        };
        content = strip_html_markers_for_whatsapp(&content);

        let (mut max_retries, mut high_prio, mut base_delay) = (5u32, !use_low_prio, 30u64);

        if message_type == WHATSAPP_VERIFICATION_MESSAGE_TYPE {
            let code = content_infos.get("code").cloned().unwrap_or_default();
            content = format!("Your verification code is: {code}");
            max_retries = 3;
            high_prio = true;
            base_delay = 15;
        }

        let mut message = OutgoingWhatsApp::new(whatsapp_number, content, high_prio, now);
        message.message_type = message_type.to_string();
        message.max_retries = max_retries;
        message.base_delay_seconds = base_delay;

        self.whatsapp_queue.enqueue(tenant, message).await;
        debug!(whatsapp_number, "WhatsApp notification queued");
        true
    }

    /// `spec.md` §4.H `SendNotificationToPreferredChannels`.
    pub async fn send_notification_to_preferred_channels(
        &self,
        tenant: &TenantId,
        req: NotificationRequest,
        now: i64,
    ) -> RpcResult<StatusReply> {
        if req.recipients.is_empty() || req.message_type.is_empty() {
            return Err(RpcError::InvalidArgument("missing argument".to_string()));
        }

        let mut success_count = 0usize;
        let mut errors = Vec::new();

        for user_id in &req.recipients {
            let user = match self.users.get_user(tenant, user_id).await {
                Ok(u) => u,
                Err(e) => {
                    errors.push(format!("failed to get user {}: {e}", user_id.0));
                    continue;
                }
            };

            let channels = user.contact_preferences.channels_or_default();
            let mut channel_success = false;

            for channel in channels {
                match channel {
                    Channel::Email => {
                        let email = match &user.email {
                            Some(e) => e.clone(),
                            None => continue,
                        };
                        let email_req = EmailSendRequest {
                            message_type: req.message_type.clone(),
                            to: vec![email],
                            study_key: req.study_key.clone(),
                            preferred_language: req.preferred_language.clone(),
                            content_infos: req.content_infos.clone(),
                            use_low_prio: req.use_low_prio,
                        };
                        match self.queue_email_template_for_sending(tenant, email_req).await {
                            Ok(_) => {
                                channel_success = true;
                                debug!(user_id = %user_id.0, "email notification queued");
                            }
                            Err(e) => {
                                error!(user_id = %user_id.0, error = %e, "failed to queue email");
                            }
                        }
                    }
                    Channel::Whatsapp => {
                        if !user.contact_preferences.has_whatsapp_number() {
                            debug!(user_id = %user_id.0, "user not subscribed to WhatsApp or no number");
                            continue;
                        }
                        let queued = self
                            .try_queue_whatsapp(
                                tenant,
                                &user.contact_preferences.whatsapp_number,
                                &req.message_type,
                                &req.study_key,
                                &req.preferred_language,
                                &req.content_infos,
                                req.use_low_prio,
                                now,
                            )
                            .await;
                        if queued {
                            channel_success = true;
                        }
                    }
                }
            }

            if channel_success {
                success_count += 1;
            } else {
                errors.push(format!(
                    "failed to send notification to user {} via any preferred channel",
                    user_id.0
                ));
            }
        }

        if success_count == 0 {
            return Ok(StatusReply {
                status: ServiceStatus::Problem,
                message: format!("failed to send notifications: {}", errors.join("; ")),
            });
        }

        let mut message = format!("notifications sent to {}/{} users", success_count, req.recipients.len());
        if !errors.is_empty() {
            message.push_str(&format!(" (errors: {})", errors.join("; ")));
        }

        Ok(StatusReply {
            status: ServiceStatus::Normal,
            message,
        })
    }

    /// `spec.md` §4.H bulk variant: role-gated, fire-and-forget.
    pub fn send_message_to_all_users(
        self: &Arc<Self>,
        claims: &TokenClaims,
        req: NotificationRequest,
        now: i64,
    ) -> RpcResult<StatusReply> {
        if !claims.has_any_role(&[Role::Admin]) {
            return Err(RpcError::PermissionDenied);
        }

        let dispatcher = Arc::clone(self);
        let tenant = TenantId::new(claims.instance_id.clone());
        tokio::spawn(async move {
            if let Err(e) = dispatcher
                .send_notification_to_preferred_channels(&tenant, req, now)
                .await
            {
                error!(error = %e, "bulk send to all users failed");
            }
        });

        Ok(StatusReply {
            status: ServiceStatus::Normal,
            message: "message sending triggered".to_string(),
        })
    }

    /// `spec.md` §4.H bulk variant: role-gated (admin or researcher),
    /// fire-and-forget.
    pub fn send_message_to_study_participants(
        self: &Arc<Self>,
        claims: &TokenClaims,
        req: NotificationRequest,
        now: i64,
    ) -> RpcResult<StatusReply> {
        if !claims.has_any_role(&[Role::Admin, Role::Researcher]) {
            return Err(RpcError::PermissionDenied);
        }

        let dispatcher = Arc::clone(self);
        let tenant = TenantId::new(claims.instance_id.clone());
        tokio::spawn(async move {
            if let Err(e) = dispatcher
                .send_notification_to_preferred_channels(&tenant, req, now)
                .await
            {
                error!(error = %e, "bulk send to study participants failed");
            }
        });

        Ok(StatusReply {
            status: ServiceStatus::Normal,
            message: "message sending triggered".to_string(),
        })
    }

    pub fn status(&self) -> StatusReply {
        StatusReply {
            status: ServiceStatus::Normal,
            message: "service running".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ContactKind, User};
    use crate::email_store::InMemoryEmailQueue;
    use crate::store::InMemoryMessageStore;
    use common::contact::ContactPreferences;
    use common::template_types::{EmailTemplate, LocalizedTemplate};
    use std::collections::HashMap as StdHashMap;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeUsers {
        users: StdHashMap<String, User>,
    }

    #[async_trait::async_trait]
    impl UserDirectory for FakeUsers {
        async fn get_user(&self, _tenant: &TenantId, user_id: &UserId) -> RpcResult<User> {
            self.users
                .get(&user_id.0)
                .cloned()
                .ok_or_else(|| RpcError::NotFound("user not found".to_string()))
        }

        async fn set_phone_number(
            &self,
            _tenant: &TenantId,
            _user_id: &UserId,
            _phone_number: &str,
            _verification_token: &str,
        ) -> RpcResult<()> {
            Ok(())
        }

        async fn list_recipients(&self, _tenant: &TenantId, user_ids: &[UserId]) -> Vec<UserId> {
            user_ids.to_vec()
        }
    }

    struct FakeTemplates {
        template: EmailTemplate,
    }

    #[async_trait::async_trait]
    impl EmailTemplateStore for FakeTemplates {
        async fn find_by_type(
            &self,
            _tenant: &TenantId,
            _message_type: &str,
            _study_key: &str,
        ) -> RpcResult<EmailTemplate> {
            Ok(self.template.clone())
        }
    }

    struct FakeEmailSender {
        fail: bool,
        sent: AsyncMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EmailSender for FakeEmailSender {
        async fn send_email(
            &self,
            to: &[String],
            _headers: &HeaderOverrides,
            _subject: &str,
            content: &str,
            _high_prio: bool,
        ) -> Result<(), EmailSendError> {
            if self.fail {
                return Err(EmailSendError::Gateway("simulated failure".to_string()));
            }
            self.sent.lock().await.push(format!("{:?}:{content}", to));
            Ok(())
        }
    }

    fn base64_body(text: &str) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    fn sample_template(body: &str) -> EmailTemplate {
        EmailTemplate {
            message_type: "welcome".into(),
            study_key: String::new(),
            default_language: "en".into(),
            header_overrides: HeaderOverrides::default(),
            translations: vec![LocalizedTemplate {
                lang: "en".into(),
                subject: "Welcome".into(),
                template_def: base64_body(body),
            }],
        }
    }

    fn dispatcher(
        users: StdHashMap<String, User>,
        template_body: &str,
        email_fails: bool,
    ) -> Arc<NotificationDispatcher> {
        Arc::new(NotificationDispatcher::new(
            Arc::new(FakeUsers { users }),
            Arc::new(FakeTemplates {
                template: sample_template(template_body),
            }),
            Arc::new(InMemoryEmailQueue::new()),
            Arc::new(FakeEmailSender {
                fail: email_fails,
                sent: AsyncMutex::new(Vec::new()),
            }),
            InMemoryMessageStore::shared(),
        ))
    }

    #[tokio::test]
    async fn instant_email_sends_and_archives_on_success() {
        let dispatcher = dispatcher(StdHashMap::new(), "Hello {{name}}", false);
        let tenant = TenantId::new("acme");
        let mut infos = HashMap::new();
        infos.insert("name".to_string(), "Ana".to_string());

        let reply = dispatcher
            .send_instant_email(
                &tenant,
                EmailSendRequest {
                    message_type: "welcome".into(),
                    to: vec!["ana@example.com".into()],
                    study_key: String::new(),
                    preferred_language: "en".into(),
                    content_infos: infos,
                    use_low_prio: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(reply.status, ServiceStatus::Normal);
    }

    #[tokio::test]
    async fn instant_email_falls_back_to_queue_on_gateway_failure() {
        let dispatcher = dispatcher(StdHashMap::new(), "Hello {{name}}", true);
        let tenant = TenantId::new("acme");
        let mut infos = HashMap::new();
        infos.insert("name".to_string(), "Ana".to_string());

        let reply = dispatcher
            .send_instant_email(
                &tenant,
                EmailSendRequest {
                    message_type: "welcome".into(),
                    to: vec!["ana@example.com".into()],
                    study_key: String::new(),
                    preferred_language: "en".into(),
                    content_infos: infos,
                    use_low_prio: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(reply.status, ServiceStatus::Problem);
    }

    #[tokio::test]
    async fn notification_defaults_to_email_when_no_preference_set() {
        let mut users = StdHashMap::new();
        users.insert(
            "u1".to_string(),
            User {
                id: UserId::new("u1"),
                email: Some("u1@example.com".into()),
                account_confirmed_at: 1,
                contacts: vec![ContactKind::Email],
                contact_preferences: ContactPreferences {
                    preferred_channels: vec![],
                    subscribed_to_whatsapp: false,
                    whatsapp_number: String::new(),
                },
            },
        );
        let dispatcher = dispatcher(users, "Hello {{name}}", false);
        let tenant = TenantId::new("acme");
        let mut infos = HashMap::new();
        infos.insert("name".to_string(), "Ana".to_string());

        let reply = dispatcher
            .send_notification_to_preferred_channels(
                &tenant,
                NotificationRequest {
                    recipients: vec![UserId::new("u1")],
                    message_type: "welcome".into(),
                    study_key: String::new(),
                    preferred_language: "en".into(),
                    content_infos: infos,
                    use_low_prio: false,
                },
                1_700_000_000,
            )
            .await
            .unwrap();

        assert_eq!(reply.status, ServiceStatus::Normal);
        assert!(reply.message.contains("1/1"));
    }

    #[tokio::test]
    async fn notification_skips_whatsapp_without_subscription() {
        let mut users = StdHashMap::new();
        users.insert(
            "u1".to_string(),
            User {
                id: UserId::new("u1"),
                email: None,
                account_confirmed_at: 1,
                contacts: vec![],
                contact_preferences: ContactPreferences {
                    preferred_channels: vec![Channel::Whatsapp],
                    subscribed_to_whatsapp: false,
                    whatsapp_number: String::new(),
                },
            },
        );
        let dispatcher = dispatcher(users, "Hello {{name}}", false);
        let tenant = TenantId::new("acme");

        let reply = dispatcher
            .send_notification_to_preferred_channels(
                &tenant,
                NotificationRequest {
                    recipients: vec![UserId::new("u1")],
                    message_type: "welcome".into(),
                    study_key: String::new(),
                    preferred_language: "en".into(),
                    content_infos: HashMap::new(),
                    use_low_prio: false,
                },
                1_700_000_000,
            )
            .await
            .unwrap();

        assert_eq!(reply.status, ServiceStatus::Problem);
    }

    #[tokio::test]
    async fn bulk_send_to_all_users_requires_admin_role() {
        let dispatcher = dispatcher(StdHashMap::new(), "Hello {{name}}", false);
        let claims = TokenClaims {
            user_id: "u1".into(),
            instance_id: "acme".into(),
            roles: vec![Role::Participant],
        };
        let result = dispatcher.send_message_to_all_users(
            &claims,
            NotificationRequest {
                recipients: vec![],
                message_type: "welcome".into(),
                study_key: String::new(),
                preferred_language: "en".into(),
                content_infos: HashMap::new(),
                use_low_prio: false,
            },
            1_700_000_000,
        );
        assert_eq!(result.unwrap_err(), RpcError::PermissionDenied);
    }

    #[tokio::test]
    async fn in_memory_template_store_round_trips_registered_template() {
        let store = InMemoryEmailTemplateStore::new();
        let tenant = TenantId::new("acme");
        store.register(&tenant, sample_template("Hi {{name}}"));

        let found = store.find_by_type(&tenant, "welcome", "").await.unwrap();
        assert_eq!(found.message_type, "welcome");

        let missing = store.find_by_type(&tenant, "goodbye", "").await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn null_email_sender_always_succeeds() {
        let sender = NullEmailSender;
        let result = sender
            .send_email(&["a@example.com".to_string()], &HeaderOverrides::default(), "subj", "body", false)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn bulk_send_to_all_users_triggers_for_admin() {
        let dispatcher = dispatcher(StdHashMap::new(), "Hello {{name}}", false);
        let claims = TokenClaims {
            user_id: "admin1".into(),
            instance_id: "acme".into(),
            roles: vec![Role::Admin],
        };
        let reply = dispatcher
            .send_message_to_all_users(
                &claims,
                NotificationRequest {
                    recipients: vec![],
                    message_type: "welcome".into(),
                    study_key: String::new(),
                    preferred_language: "en".into(),
                    content_infos: HashMap::new(),
                    use_low_prio: false,
                },
                1_700_000_000,
            )
            .unwrap();
        assert!(reply.message.contains("triggered"));
    }
}
