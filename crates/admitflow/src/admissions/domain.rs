use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::grades::Grade;
use crate::identity::{OrgId, UserId};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for catalog courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// A single subject outcome on a student's academic record.
///
/// Legacy result documents store a bare grade letter where newer ones store an
/// object with the grade and the raw mark, so deserialization accepts both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectResult {
    pub grade: Grade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<u16>,
}

impl SubjectResult {
    pub fn new(grade: Grade) -> Self {
        Self { grade, mark: None }
    }

    pub fn with_mark(grade: Grade, mark: u16) -> Self {
        Self {
            grade,
            mark: Some(mark),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubjectResultRepr {
    Detailed {
        grade: Grade,
        #[serde(default)]
        mark: Option<u16>,
    },
    Letter(String),
}

impl<'de> Deserialize<'de> for SubjectResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match SubjectResultRepr::deserialize(deserializer)? {
            SubjectResultRepr::Detailed { grade, mark } => Ok(SubjectResult { grade, mark }),
            SubjectResultRepr::Letter(raw) => {
                let grade = raw.parse::<Grade>().map_err(D::Error::custom)?;
                Ok(SubjectResult { grade, mark: None })
            }
        }
    }
}

/// Immutable snapshot of a student's graded subjects at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcademicRecord(pub BTreeMap<String, SubjectResult>);

impl AcademicRecord {
    pub fn grade_for(&self, subject: &str) -> Option<Grade> {
        self.0.get(subject).map(|result| result.grade)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, SubjectResult>> for AcademicRecord {
    fn from(value: BTreeMap<String, SubjectResult>) -> Self {
        Self(value)
    }
}

/// Minimum grade per subject required for admission to a course.
///
/// An empty set is vacuously satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementSet(pub BTreeMap<String, Grade>);

impl RequirementSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Grade)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Grade>> for RequirementSet {
    fn from(value: BTreeMap<String, Grade>) -> Self {
        Self(value)
    }
}

/// Catalog entry students apply to. Owned by an institution, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub faculty_id: String,
    pub institution_id: OrgId,
    #[serde(default)]
    pub requirements: RequirementSet,
}

/// Lifecycle states of an application. `Pending` is the only state the
/// decision engine will transition out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Admitted,
    Rejected,
    Waitlisted,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Admitted => "admitted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Waitlisted => "waitlisted",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Reviewer commands applied to a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    Admit,
    Reject,
    Waitlist,
}

impl AdmissionDecision {
    pub const fn target_status(self) -> ApplicationStatus {
        match self {
            AdmissionDecision::Admit => ApplicationStatus::Admitted,
            AdmissionDecision::Reject => ApplicationStatus::Rejected,
            AdmissionDecision::Waitlist => ApplicationStatus::Waitlisted,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AdmissionDecision::Admit => "admit",
            AdmissionDecision::Reject => "reject",
            AdmissionDecision::Waitlist => "waitlist",
        }
    }
}

/// Stored application document. Applications are never deleted, only
/// transitioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub faculty_id: String,
    pub institution_id: OrgId,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            student_id: self.student_id.clone(),
            course_id: self.course_id.clone(),
            institution_id: self.institution_id.clone(),
            status: self.status.label(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub institution_id: OrgId,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
}
