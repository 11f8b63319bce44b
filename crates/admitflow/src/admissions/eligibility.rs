use serde::{Deserialize, Serialize};

use super::domain::{AcademicRecord, RequirementSet};
use super::grades::Grade;

/// One course requirement the student's record fails to satisfy.
///
/// `achieved` is `None` when the subject is missing from the record entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetRequirement {
    pub subject: String,
    pub required: Grade,
    pub achieved: Option<Grade>,
}

/// Evaluate a record against a requirement set, returning every shortfall.
///
/// Matching is conjunctive with no partial credit: each required subject must
/// be present with a grade at least as strong as the requirement. The
/// evaluation never errors; an empty requirement set yields an empty result.
pub fn unmet_requirements(
    record: &AcademicRecord,
    requirements: &RequirementSet,
) -> Vec<UnmetRequirement> {
    requirements
        .iter()
        .filter_map(|(subject, required)| match record.grade_for(subject) {
            Some(achieved) if achieved.meets_or_exceeds(*required) => None,
            achieved => Some(UnmetRequirement {
                subject: subject.clone(),
                required: *required,
                achieved,
            }),
        })
        .collect()
}

/// True when the record satisfies every requirement.
pub fn is_eligible(record: &AcademicRecord, requirements: &RequirementSet) -> bool {
    unmet_requirements(record, requirements).is_empty()
}
