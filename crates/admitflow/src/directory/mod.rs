//! Organization and account lifecycle: access review, suspension, reactivation.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;
pub mod suspension;

#[cfg(test)]
mod tests;

pub use domain::{AccessStatus, Organization, OrgKind, UserAccount};
pub use router::directory_router;
pub use service::{DirectoryService, DirectoryServiceError, ReviewDecision};
pub use store::DirectoryStore;
pub use suspension::{
    plan_status_change, CascadeReport, MemberCascade, OrgStatusChange, SuspensionError,
};
