use super::decision::DecisionPlan;
use super::domain::{AcademicRecord, Application, ApplicationId, Course, CourseId};
use crate::identity::{OrgId, UserId};
use crate::store::StoreError;

/// Snapshot backing a guarded insert. The store must refuse the commit when
/// the duplicate-free and count preconditions no longer hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionGuard {
    pub student: UserId,
    pub course: CourseId,
    pub institution: OrgId,
    /// Applications the student held at the institution when checks ran.
    pub seen_at_institution: usize,
}

/// Storage abstraction for application documents so the service module can be
/// exercised in isolation.
///
/// The two commit operations are the only serialized sections the engine
/// needs from a backend; everything else is plain reads.
pub trait ApplicationStore: Send + Sync {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;

    /// Every application the student holds, across institutions.
    fn student_applications(&self, student: &UserId) -> Result<Vec<Application>, StoreError>;

    /// Every application submitted to the institution.
    fn institution_applications(
        &self,
        institution: &OrgId,
    ) -> Result<Vec<Application>, StoreError>;

    /// Insert the application only while the guard still holds: no existing
    /// application for `(student, course)` and the student's count at the
    /// institution still equals `seen_at_institution`. A violated guard fails
    /// with [`StoreError::Conflict`] and must write nothing.
    fn insert_guarded(
        &self,
        application: Application,
        guard: &SubmissionGuard,
    ) -> Result<Application, StoreError>;

    /// Apply every write in the plan atomically if each listed application is
    /// still `Pending`; otherwise fail with [`StoreError::Conflict`] and write
    /// nothing.
    fn commit_decision(&self, plan: &DecisionPlan) -> Result<(), StoreError>;
}

/// Read-only access to the course catalog and student academic records.
pub trait CatalogStore: Send + Sync {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError>;

    fn academic_record(&self, student: &UserId) -> Result<Option<AcademicRecord>, StoreError>;
}
