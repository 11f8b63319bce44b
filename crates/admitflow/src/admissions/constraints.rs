use serde::{Deserialize, Serialize};

use super::domain::{AcademicRecord, Application, Course, CourseId};
use super::eligibility::{unmet_requirements, UnmetRequirement};
use crate::config::PolicyConfig;

/// Typed reasons a submission is refused. All are user-correctable and map to
/// client errors at the HTTP boundary, never to 5xx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SubmissionDenial {
    #[error("an application for course {} already exists", course.0)]
    AlreadyApplied { course: CourseId },
    #[error("institution application limit of {cap} reached")]
    InstitutionLimitReached { cap: usize },
    #[error("course requirements not met for {} subject(s)", unmet.len())]
    RequirementsNotMet { unmet: Vec<UnmetRequirement> },
}

/// Guard evaluating submission rules in a fixed order: duplicate course,
/// institution cap, then eligibility. The first failing rule wins so clients
/// see a stable denial for the same state.
#[derive(Debug, Clone)]
pub struct ConstraintChecker {
    cap: usize,
}

impl ConstraintChecker {
    pub fn new(policy: &PolicyConfig) -> Self {
        Self {
            cap: policy.institution_cap,
        }
    }

    /// Check a prospective submission against the student's existing
    /// applications across all institutions.
    ///
    /// Every existing application counts toward the institution cap whatever
    /// its status; a rejection does not free the slot.
    pub fn check(
        &self,
        course: &Course,
        record: &AcademicRecord,
        existing: &[Application],
    ) -> Result<(), SubmissionDenial> {
        if existing.iter().any(|app| app.course_id == course.id) {
            return Err(SubmissionDenial::AlreadyApplied {
                course: course.id.clone(),
            });
        }

        let at_institution = existing
            .iter()
            .filter(|app| app.institution_id == course.institution_id)
            .count();
        if at_institution >= self.cap {
            return Err(SubmissionDenial::InstitutionLimitReached { cap: self.cap });
        }

        let unmet = unmet_requirements(record, &course.requirements);
        if !unmet.is_empty() {
            return Err(SubmissionDenial::RequirementsNotMet { unmet });
        }

        Ok(())
    }
}
