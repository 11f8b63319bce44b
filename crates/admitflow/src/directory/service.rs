use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{AccessStatus, Organization, UserAccount};
use super::store::DirectoryStore;
use super::suspension::{plan_status_change, CascadeReport, MemberCascade, SuspensionError};
use crate::config::PolicyConfig;
use crate::identity::{ActorContext, OrgId, Role, UserId};
use crate::notify::{Notification, NotificationKind, NotificationSink};
use crate::store::StoreError;

/// Service driving the organization lifecycle, the member suspension cascade,
/// and individual account review.
pub struct DirectoryService<D, N> {
    directory: Arc<D>,
    notifications: Arc<N>,
    policy: PolicyConfig,
}

/// Admin verdict on a pending account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Deny,
}

impl ReviewDecision {
    pub const fn target_status(self) -> AccessStatus {
        match self {
            ReviewDecision::Approve => AccessStatus::Approved,
            ReviewDecision::Deny => AccessStatus::Denied,
        }
    }
}

impl<D, N> DirectoryService<D, N>
where
    D: DirectoryStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(directory: Arc<D>, notifications: Arc<N>, policy: PolicyConfig) -> Self {
        Self {
            directory,
            notifications,
            policy,
        }
    }

    /// Apply a lifecycle status to an organization and fan the change out to
    /// its member accounts.
    ///
    /// The organization write lands first; the fan-out then runs in bounded
    /// batches of idempotent point writes. Members that keep failing are
    /// reported in the error without rolling back the rest, and running the
    /// same call again completes only what is still missing.
    pub fn set_org_status(
        &self,
        actor: &ActorContext,
        org_id: &OrgId,
        target: AccessStatus,
        reason: Option<String>,
    ) -> Result<CascadeReport, DirectoryServiceError> {
        self.require_admin(actor, "change organization status")?;

        let organization = self.directory.organization(org_id)?.ok_or_else(|| {
            DirectoryServiceError::UnknownOrganization {
                organization: org_id.clone(),
            }
        })?;
        let change = plan_status_change(&organization, target, reason, Utc::now())?;
        self.directory
            .update_organization(change.organization.clone())?;

        let mut updated = 0usize;
        let mut skipped = 0usize;
        let mut failed: Vec<UserId> = Vec::new();

        if let Some(cascade) = change.cascade {
            let (desired_status, desired_reason) = match &cascade {
                MemberCascade::Suspend { reason } => {
                    (AccessStatus::Suspended, Some(reason.clone()))
                }
                MemberCascade::Reactivate => (AccessStatus::Approved, None),
            };

            let members = self.directory.member_accounts(org_id)?;
            for batch in members.chunks(self.policy.cascade_batch_size) {
                for member in batch {
                    if member.status == desired_status
                        && member.suspension_reason == desired_reason
                    {
                        skipped += 1;
                        continue;
                    }

                    match self.write_member_status(
                        &member.uid,
                        desired_status,
                        desired_reason.clone(),
                    ) {
                        Ok(()) => {
                            updated += 1;
                            self.notify_member(member, desired_status);
                        }
                        Err(err) => {
                            warn!(
                                account = %member.uid.0,
                                organization = %org_id.0,
                                error = %err,
                                "member status write failed"
                            );
                            failed.push(member.uid.clone());
                        }
                    }
                }
            }
        }

        if !failed.is_empty() {
            return Err(DirectoryServiceError::PartialCascadeFailure { updated, failed });
        }

        info!(
            organization = %org_id.0,
            status = target.label(),
            members_updated = updated,
            members_skipped = skipped,
            "organization status applied"
        );
        Ok(CascadeReport {
            organization: org_id.clone(),
            status: target,
            members_updated: updated,
            members_skipped: skipped,
        })
    }

    /// Record a reinstatement request on a suspended organization.
    ///
    /// Operators may only file for their own organization; the flag and
    /// message are cleared when an admin reactivates it.
    pub fn request_reactivation(
        &self,
        actor: &ActorContext,
        org_id: &OrgId,
        message: String,
    ) -> Result<(), DirectoryServiceError> {
        match actor.role {
            Role::Admin => {}
            Role::Institution | Role::Company => {
                let account = self.directory.account(&actor.actor)?.ok_or_else(|| {
                    DirectoryServiceError::UnknownAccount {
                        account: actor.actor.clone(),
                    }
                })?;
                if account.org_id.as_ref() != Some(org_id) {
                    return Err(DirectoryServiceError::Forbidden {
                        role: actor.role,
                        action: "request reactivation for another organization",
                    });
                }
            }
            Role::Student => {
                return Err(DirectoryServiceError::Forbidden {
                    role: actor.role,
                    action: "request organization reactivation",
                });
            }
        }

        let mut organization = self.directory.organization(org_id)?.ok_or_else(|| {
            DirectoryServiceError::UnknownOrganization {
                organization: org_id.clone(),
            }
        })?;
        if organization.status != AccessStatus::Suspended {
            return Err(DirectoryServiceError::NotSuspended {
                organization: org_id.clone(),
            });
        }

        organization.reactivation_requested = true;
        organization.reactivation_message = Some(message);
        organization.updated_at = Utc::now();
        self.directory.update_organization(organization)?;

        info!(organization = %org_id.0, "reactivation requested");
        Ok(())
    }

    /// Approve or deny an individual pending account.
    pub fn review_account(
        &self,
        actor: &ActorContext,
        uid: &UserId,
        decision: ReviewDecision,
    ) -> Result<UserAccount, DirectoryServiceError> {
        self.require_admin(actor, "review accounts")?;

        let account = self.directory.account(uid)?.ok_or_else(|| {
            DirectoryServiceError::UnknownAccount {
                account: uid.clone(),
            }
        })?;
        if account.status != AccessStatus::Pending {
            return Err(DirectoryServiceError::AccountNotReviewable {
                account: uid.clone(),
                status: account.status,
            });
        }

        let status = decision.target_status();
        self.directory.set_account_status(uid, status, None)?;

        let mut reviewed = account;
        reviewed.status = status;
        self.notify_member(&reviewed, status);

        info!(account = %uid.0, status = status.label(), "account reviewed");
        Ok(reviewed)
    }

    fn write_member_status(
        &self,
        uid: &UserId,
        status: AccessStatus,
        reason: Option<String>,
    ) -> Result<(), StoreError> {
        let mut attempts = 0;
        loop {
            match self.directory.set_account_status(uid, status, reason.clone()) {
                Ok(()) => return Ok(()),
                Err(StoreError::Unavailable(message)) => {
                    attempts += 1;
                    if attempts >= self.policy.commit_retry_limit {
                        return Err(StoreError::Unavailable(message));
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn notify_member(&self, account: &UserAccount, status: AccessStatus) {
        let message = match status {
            AccessStatus::Suspended => {
                "Your account has been suspended with your organization.".to_string()
            }
            AccessStatus::Approved => "Your account access has been approved.".to_string(),
            AccessStatus::Denied => "Your account access request was denied.".to_string(),
            AccessStatus::Pending => return,
        };
        let notification = Notification {
            recipient: account.uid.clone(),
            title: "Account access update".to_string(),
            message,
            kind: NotificationKind::OrgAccess,
        };
        if let Err(err) = self.notifications.deliver(notification) {
            warn!(
                account = %account.uid.0,
                error = %err,
                "notification delivery failed"
            );
        }
    }

    fn require_admin(
        &self,
        actor: &ActorContext,
        action: &'static str,
    ) -> Result<(), DirectoryServiceError> {
        if actor.role == Role::Admin {
            Ok(())
        } else {
            Err(DirectoryServiceError::Forbidden {
                role: actor.role,
                action,
            })
        }
    }
}

/// Error raised by the directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryServiceError {
    #[error(transparent)]
    Suspension(#[from] SuspensionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("organization {} not found", organization.0)]
    UnknownOrganization { organization: OrgId },
    #[error("account {} not found", account.0)]
    UnknownAccount { account: UserId },
    #[error("account {} is not awaiting review (status {})", account.0, status.label())]
    AccountNotReviewable {
        account: UserId,
        status: AccessStatus,
    },
    #[error("organization {} is not suspended", organization.0)]
    NotSuspended { organization: OrgId },
    #[error("cascade incomplete: {updated} member(s) updated, {} failed", failed.len())]
    PartialCascadeFailure { updated: usize, failed: Vec<UserId> },
    #[error("role {} may not {}", role.label(), action)]
    Forbidden { role: Role, action: &'static str },
}
