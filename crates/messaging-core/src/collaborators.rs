use std::collections::HashMap;

use common::contact::ContactPreferences;
use common::rpc_error::{RpcError, RpcResult};
use common::tenant::TenantId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Phone,
    Email,
}

/// A user record as consumed from the out-of-scope user-management service
/// (`spec.md` §1's "external collaborators").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub account_confirmed_at: i64,
    pub contacts: Vec<ContactKind>,
    pub contact_preferences: ContactPreferences,
}

impl User {
    pub fn is_account_confirmed(&self) -> bool {
        self.account_confirmed_at > 0
    }

    pub fn has_contact(&self, kind: ContactKind) -> bool {
        self.contacts.contains(&kind)
    }
}

/// The user-directory seam (`spec.md` §4.F's `GetUser`/phone mutation
/// calls), standing in for the user-management service's gRPC surface.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, tenant: &TenantId, user_id: &UserId) -> RpcResult<User>;
    async fn set_phone_number(
        &self,
        tenant: &TenantId,
        user_id: &UserId,
        phone_number: &str,
        verification_token: &str,
    ) -> RpcResult<()>;
    async fn list_recipients(&self, tenant: &TenantId, user_ids: &[UserId]) -> Vec<UserId>;
}

/// The tenant-enumeration seam the scheduler (component G) drives each tick,
/// standing in for `original_source`'s `globaldb.GetAllInstances`.
#[async_trait::async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_tenants(&self) -> Vec<TenantId>;
}

/// An in-memory `UserDirectory`, standing in for the out-of-scope
/// user-management service (`spec.md` §1). `set_phone_number` records the
/// number against the user's WhatsApp contact preference, which is the only
/// phone-shaped field this simplified user record carries.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<(TenantId, UserId), User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, tenant: &TenantId, user: User) {
        self.users
            .lock()
            .await
            .insert((tenant.clone(), user.id.clone()), user);
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, tenant: &TenantId, user_id: &UserId) -> RpcResult<User> {
        self.users
            .lock()
            .await
            .get(&(tenant.clone(), user_id.clone()))
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("user {} not found", user_id.0)))
    }

    async fn set_phone_number(
        &self,
        tenant: &TenantId,
        user_id: &UserId,
        phone_number: &str,
        _verification_token: &str,
    ) -> RpcResult<()> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&(tenant.clone(), user_id.clone()))
            .ok_or_else(|| RpcError::NotFound(format!("user {} not found", user_id.0)))?;
        user.contact_preferences.whatsapp_number = phone_number.to_string();
        if !user.contacts.contains(&ContactKind::Phone) {
            user.contacts.push(ContactKind::Phone);
        }
        Ok(())
    }

    async fn list_recipients(&self, tenant: &TenantId, user_ids: &[UserId]) -> Vec<UserId> {
        let users = self.users.lock().await;
        user_ids
            .iter()
            .filter(|id| users.contains_key(&(tenant.clone(), (*id).clone())))
            .cloned()
            .collect()
    }
}

/// A fixed-list `TenantDirectory` for tests and single-tenant deployments.
pub struct StaticTenantDirectory {
    tenants: Vec<TenantId>,
}

impl StaticTenantDirectory {
    pub fn new(tenants: Vec<TenantId>) -> Self {
        Self { tenants }
    }
}

#[async_trait::async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn list_tenants(&self) -> Vec<TenantId> {
        self.tenants.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_confirmed_requires_positive_timestamp() {
        let mut user = User {
            id: UserId::new("u1"),
            email: None,
            account_confirmed_at: 0,
            contacts: vec![],
            contact_preferences: ContactPreferences {
                preferred_channels: vec![],
                subscribed_to_whatsapp: false,
                whatsapp_number: String::new(),
            },
        };
        assert!(!user.is_account_confirmed());
        user.account_confirmed_at = 1_700_000_000;
        assert!(user.is_account_confirmed());
    }

    #[test]
    fn has_contact_checks_kind_membership() {
        let user = User {
            id: UserId::new("u1"),
            email: Some("a@example.com".into()),
            account_confirmed_at: 1,
            contacts: vec![ContactKind::Email],
            contact_preferences: ContactPreferences {
                preferred_channels: vec![],
                subscribed_to_whatsapp: false,
                whatsapp_number: String::new(),
            },
        };
        assert!(user.has_contact(ContactKind::Email));
        assert!(!user.has_contact(ContactKind::Phone));
    }

    #[tokio::test]
    async fn static_tenant_directory_returns_fixed_list() {
        let directory = StaticTenantDirectory::new(vec![TenantId::new("acme"), TenantId::new("beta")]);
        assert_eq!(directory.list_tenants().await.len(), 2);
    }

    #[tokio::test]
    async fn in_memory_user_directory_set_phone_number_records_contact() {
        let directory = InMemoryUserDirectory::new();
        let tenant = TenantId::new("acme");
        directory
            .insert(
                &tenant,
                User {
                    id: UserId::new("u1"),
                    email: Some("u1@example.com".into()),
                    account_confirmed_at: 1,
                    contacts: vec![],
                    contact_preferences: ContactPreferences {
                        preferred_channels: vec![],
                        subscribed_to_whatsapp: false,
                        whatsapp_number: String::new(),
                    },
                },
            )
            .await;

        directory
            .set_phone_number(&tenant, &UserId::new("u1"), "+15551234567", "tok")
            .await
            .unwrap();

        let user = directory.get_user(&tenant, &UserId::new("u1")).await.unwrap();
        assert_eq!(user.contact_preferences.whatsapp_number, "+15551234567");
        assert!(user.has_contact(ContactKind::Phone));
    }
}
