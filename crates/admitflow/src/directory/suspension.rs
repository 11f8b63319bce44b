use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{AccessStatus, Organization};
use crate::identity::OrgId;

/// Raised for organization status targets the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuspensionError {
    #[error("organization cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition {
        from: AccessStatus,
        to: AccessStatus,
    },
    #[error("a reason is required to suspend an organization")]
    ReasonRequired,
}

/// Member fan-out required after an organization status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberCascade {
    /// Push `Suspended` plus the reason to every member account.
    Suspend { reason: String },
    /// Push `Approved` and clear the stored reason on every member account.
    Reactivate,
}

/// The organization write plus the cascade it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgStatusChange {
    pub organization: Organization,
    pub cascade: Option<MemberCascade>,
}

/// Pure transition table for the organization lifecycle.
///
/// Re-applying the current status is always allowed and still yields its
/// cascade, so an interrupted fan-out can be completed by running the same
/// call again. `Pending` is never a valid target; initial approval or denial
/// of a pending organization touches no member accounts.
pub fn plan_status_change(
    organization: &Organization,
    target: AccessStatus,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<OrgStatusChange, SuspensionError> {
    use AccessStatus::{Approved, Denied, Pending, Suspended};

    let mut updated = organization.clone();
    updated.updated_at = now;

    let cascade = match (organization.status, target) {
        (from, Pending) => {
            return Err(SuspensionError::InvalidTransition { from, to: Pending });
        }
        (Approved | Suspended, Suspended) => {
            let reason = reason.ok_or(SuspensionError::ReasonRequired)?;
            updated.status = Suspended;
            updated.suspension_reason = Some(reason.clone());
            Some(MemberCascade::Suspend { reason })
        }
        (Pending, Approved) => {
            updated.status = Approved;
            None
        }
        (Suspended | Approved, Approved) => {
            updated.status = Approved;
            updated.suspension_reason = None;
            updated.reactivation_requested = false;
            updated.reactivation_message = None;
            Some(MemberCascade::Reactivate)
        }
        (Pending | Denied, Denied) => {
            updated.status = Denied;
            None
        }
        (from, to) => return Err(SuspensionError::InvalidTransition { from, to }),
    };

    Ok(OrgStatusChange {
        organization: updated,
        cascade,
    })
}

/// Summary of an applied organization status change.
///
/// `members_skipped` counts accounts already in the target state, so a re-run
/// after a partial failure reports only the writes it actually completed.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub organization: OrgId,
    pub status: AccessStatus,
    pub members_updated: usize,
    pub members_skipped: usize,
}
