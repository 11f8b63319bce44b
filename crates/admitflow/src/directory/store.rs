use super::domain::{AccessStatus, Organization, UserAccount};
use crate::identity::{OrgId, UserId};
use crate::store::StoreError;

/// Storage abstraction for organization and account documents.
///
/// `set_account_status` must be an idempotent point write: re-applying the
/// same target state is a no-op, which is what makes cascade re-runs safe.
pub trait DirectoryStore: Send + Sync {
    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError>;

    fn update_organization(&self, organization: Organization) -> Result<(), StoreError>;

    /// Every account linked to the organization.
    fn member_accounts(&self, organization: &OrgId) -> Result<Vec<UserAccount>, StoreError>;

    fn account(&self, uid: &UserId) -> Result<Option<UserAccount>, StoreError>;

    fn set_account_status(
        &self,
        uid: &UserId,
        status: AccessStatus,
        suspension_reason: Option<String>,
    ) -> Result<(), StoreError>;
}
