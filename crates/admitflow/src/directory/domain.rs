use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{OrgId, Role, UserId};

/// The two organization flavors sharing one access lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgKind {
    Institution,
    Company,
}

impl OrgKind {
    pub const fn label(self) -> &'static str {
        match self {
            OrgKind::Institution => "institution",
            OrgKind::Company => "company",
        }
    }
}

/// Access lifecycle shared by organizations and user accounts.
///
/// Organizations start `Pending`, are approved or denied once, and may then
/// move between `Approved` and `Suspended` repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Pending,
    Approved,
    Denied,
    Suspended,
}

impl AccessStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AccessStatus::Pending => "pending",
            AccessStatus::Approved => "approved",
            AccessStatus::Denied => "denied",
            AccessStatus::Suspended => "suspended",
        }
    }
}

/// Stored organization document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub kind: OrgKind,
    pub name: String,
    pub status: AccessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    #[serde(default)]
    pub reactivation_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactivation_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Stored user account document. `org_id` links operators to the
/// organization whose lifecycle governs their access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub uid: UserId,
    pub role: Role,
    pub status: AccessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<OrgId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
}
