//! Admissions intake, eligibility evaluation, and the decision state machine.

pub mod constraints;
pub mod decision;
pub mod domain;
pub mod eligibility;
pub mod grades;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use constraints::{ConstraintChecker, SubmissionDenial};
pub use decision::{build_plan, transition, DecisionError, DecisionPlan, StatusWrite};
pub use domain::{
    AcademicRecord, AdmissionDecision, Application, ApplicationId, ApplicationStatus,
    ApplicationStatusView, Course, CourseId, RequirementSet, SubjectResult,
};
pub use eligibility::{is_eligible, unmet_requirements, UnmetRequirement};
pub use grades::{Grade, InvalidGrade};
pub use router::admissions_router;
pub use service::{
    AdmissionsService, AdmissionsServiceError, DecisionOutcome, RosterEntry,
};
pub use store::{ApplicationStore, CatalogStore, SubmissionGuard};
