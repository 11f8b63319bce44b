use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::PolicyConfig;
use crate::directory::domain::{AccessStatus, Organization, OrgKind, UserAccount};
use crate::directory::store::DirectoryStore;
use crate::directory::{directory_router, DirectoryService};
use crate::identity::{ActorContext, OrgId, Role, UserId, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::notify::{Notification, NotificationSink, NotifyError};
use crate::store::StoreError;

pub(super) fn policy() -> PolicyConfig {
    PolicyConfig::default()
}

pub(super) fn admin() -> ActorContext {
    ActorContext::new(UserId("admin-1".to_string()), Role::Admin)
}

pub(super) fn operator(id: &str) -> ActorContext {
    ActorContext::new(UserId(id.to_string()), Role::Institution)
}

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn organization(id: &str, status: AccessStatus) -> Organization {
    Organization {
        id: OrgId(id.to_string()),
        kind: OrgKind::Institution,
        name: format!("Org {id}"),
        status,
        suspension_reason: None,
        reactivation_requested: false,
        reactivation_message: None,
        updated_at: fixed_time(),
    }
}

pub(super) fn suspended_organization(id: &str, reason: &str) -> Organization {
    let mut organization = organization(id, AccessStatus::Suspended);
    organization.suspension_reason = Some(reason.to_string());
    organization
}

pub(super) fn member(uid: &str, org: &str, status: AccessStatus) -> UserAccount {
    UserAccount {
        uid: UserId(uid.to_string()),
        role: Role::Institution,
        status,
        org_id: Some(OrgId(org.to_string())),
        suspension_reason: None,
    }
}

pub(super) fn build_service() -> (
    DirectoryService<MemoryDirectory, MemorySink>,
    Arc<MemoryDirectory>,
    Arc<MemorySink>,
) {
    let directory = Arc::new(MemoryDirectory::default());
    let sink = Arc::new(MemorySink::default());
    let service = DirectoryService::new(directory.clone(), sink.clone(), policy());
    (service, directory, sink)
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    organizations: Mutex<HashMap<OrgId, Organization>>,
    accounts: Mutex<HashMap<UserId, UserAccount>>,
}

impl MemoryDirectory {
    pub(super) fn seed_organization(&self, organization: Organization) {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(organization.id.clone(), organization);
    }

    pub(super) fn seed_accounts(&self, accounts: impl IntoIterator<Item = UserAccount>) {
        let mut guard = self.accounts.lock().expect("directory mutex poisoned");
        for account in accounts {
            guard.insert(account.uid.clone(), account);
        }
    }

    pub(super) fn organization_snapshot(&self, id: &str) -> Option<Organization> {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .get(&OrgId(id.to_string()))
            .cloned()
    }

    pub(super) fn account_snapshot(&self, uid: &str) -> Option<UserAccount> {
        self.accounts
            .lock()
            .expect("directory mutex poisoned")
            .get(&UserId(uid.to_string()))
            .cloned()
    }
}

impl DirectoryStore for MemoryDirectory {
    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        Ok(self
            .organizations
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_organization(&self, organization: Organization) -> Result<(), StoreError> {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(organization.id.clone(), organization);
        Ok(())
    }

    fn member_accounts(&self, organization: &OrgId) -> Result<Vec<UserAccount>, StoreError> {
        let guard = self.accounts.lock().expect("directory mutex poisoned");
        let mut members: Vec<UserAccount> = guard
            .values()
            .filter(|account| account.org_id.as_ref() == Some(organization))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.uid.0.cmp(&b.uid.0));
        Ok(members)
    }

    fn account(&self, uid: &UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("directory mutex poisoned")
            .get(uid)
            .cloned())
    }

    fn set_account_status(
        &self,
        uid: &UserId,
        status: AccessStatus,
        suspension_reason: Option<String>,
    ) -> Result<(), StoreError> {
        let mut guard = self.accounts.lock().expect("directory mutex poisoned");
        match guard.get_mut(uid) {
            Some(account) => {
                account.status = status;
                account.suspension_reason = suspension_reason;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

/// Directory double where point writes for chosen accounts fail until the
/// failures are cleared, standing in for an unreachable shard.
pub(super) struct FlakyDirectory {
    inner: MemoryDirectory,
    failing: Mutex<HashSet<String>>,
}

impl FlakyDirectory {
    pub(super) fn failing_for(uids: &[&str]) -> Self {
        Self {
            inner: MemoryDirectory::default(),
            failing: Mutex::new(uids.iter().map(|uid| uid.to_string()).collect()),
        }
    }

    pub(super) fn clear_failures(&self) {
        self.failing.lock().expect("failure mutex poisoned").clear();
    }

    pub(super) fn seed_organization(&self, organization: Organization) {
        self.inner.seed_organization(organization);
    }

    pub(super) fn seed_accounts(&self, accounts: impl IntoIterator<Item = UserAccount>) {
        self.inner.seed_accounts(accounts);
    }

    pub(super) fn organization_snapshot(&self, id: &str) -> Option<Organization> {
        self.inner.organization_snapshot(id)
    }

    pub(super) fn account_snapshot(&self, uid: &str) -> Option<UserAccount> {
        self.inner.account_snapshot(uid)
    }
}

impl DirectoryStore for FlakyDirectory {
    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        self.inner.organization(id)
    }

    fn update_organization(&self, organization: Organization) -> Result<(), StoreError> {
        self.inner.update_organization(organization)
    }

    fn member_accounts(&self, organization: &OrgId) -> Result<Vec<UserAccount>, StoreError> {
        self.inner.member_accounts(organization)
    }

    fn account(&self, uid: &UserId) -> Result<Option<UserAccount>, StoreError> {
        self.inner.account(uid)
    }

    fn set_account_status(
        &self,
        uid: &UserId,
        status: AccessStatus,
        suspension_reason: Option<String>,
    ) -> Result<(), StoreError> {
        if self
            .failing
            .lock()
            .expect("failure mutex poisoned")
            .contains(&uid.0)
        {
            return Err(StoreError::Unavailable("account shard offline".to_string()));
        }
        self.inner.set_account_status(uid, status, suspension_reason)
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) fn post_json(
    uri: &str,
    actor: (&str, &str),
    body: &Value,
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .header(ACTOR_ID_HEADER, actor.0)
        .header(ACTOR_ROLE_HEADER, actor.1)
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serialize body"),
        ))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn directory_router_with_service(
    service: DirectoryService<MemoryDirectory, MemorySink>,
) -> axum::Router {
    directory_router(Arc::new(service))
}
