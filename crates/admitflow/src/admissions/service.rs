use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::constraints::{ConstraintChecker, SubmissionDenial};
use super::decision::{build_plan, DecisionError};
use super::domain::{
    AdmissionDecision, Application, ApplicationId, ApplicationStatus, ApplicationStatusView,
    CourseId,
};
use super::store::{ApplicationStore, CatalogStore, SubmissionGuard};
use crate::config::PolicyConfig;
use crate::identity::{ActorContext, OrgId, Role, UserId};
use crate::notify::{Notification, NotificationKind, NotificationSink};
use crate::store::StoreError;

/// Service composing the constraint checker, decision engine, stores, and the
/// notification sink. All mutations retry bounded times on commit conflicts,
/// re-reading and re-checking before each attempt.
pub struct AdmissionsService<S, C, N> {
    applications: Arc<S>,
    catalog: Arc<C>,
    notifications: Arc<N>,
    checker: ConstraintChecker,
    policy: PolicyConfig,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

impl<S, C, N> AdmissionsService<S, C, N>
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        applications: Arc<S>,
        catalog: Arc<C>,
        notifications: Arc<N>,
        policy: PolicyConfig,
    ) -> Self {
        let checker = ConstraintChecker::new(&policy);
        Self {
            applications,
            catalog,
            notifications,
            checker,
            policy,
        }
    }

    /// Submit a new application for the acting student.
    ///
    /// Checks run against a fresh read each attempt; a guarded insert that
    /// loses its race is re-read and re-checked so the caller always gets
    /// the typed denial a racer caused rather than a bare conflict.
    pub fn submit(
        &self,
        actor: &ActorContext,
        course_id: &CourseId,
    ) -> Result<ApplicationStatusView, AdmissionsServiceError> {
        if actor.role != Role::Student {
            return Err(AdmissionsServiceError::Forbidden {
                role: actor.role,
                action: "submit applications",
            });
        }
        let student = actor.actor.clone();

        let record = self
            .catalog
            .academic_record(&student)?
            .ok_or(AdmissionsServiceError::ProfileIncomplete)?;
        let course = self
            .catalog
            .course(course_id)?
            .ok_or_else(|| AdmissionsServiceError::UnknownCourse {
                course: course_id.clone(),
            })?;

        let mut attempts = 0;
        loop {
            let existing = self.applications.student_applications(&student)?;
            self.checker.check(&course, &record, &existing)?;

            let seen_at_institution = existing
                .iter()
                .filter(|app| app.institution_id == course.institution_id)
                .count();
            let guard = SubmissionGuard {
                student: student.clone(),
                course: course.id.clone(),
                institution: course.institution_id.clone(),
                seen_at_institution,
            };
            let application = Application {
                id: next_application_id(),
                student_id: student.clone(),
                course_id: course.id.clone(),
                faculty_id: course.faculty_id.clone(),
                institution_id: course.institution_id.clone(),
                status: ApplicationStatus::Pending,
                submitted_at: Utc::now(),
            };

            match self.applications.insert_guarded(application, &guard) {
                Ok(stored) => {
                    info!(
                        application = %stored.id.0,
                        student = %student.0,
                        course = %course.id.0,
                        "application submitted"
                    );
                    return Ok(stored.status_view());
                }
                Err(StoreError::Conflict) => {
                    attempts += 1;
                    if attempts >= self.policy.commit_retry_limit {
                        return Err(StoreError::Unavailable(format!(
                            "submission contention persisted after {attempts} attempts"
                        ))
                        .into());
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Apply a reviewer decision to a pending application.
    ///
    /// The pending status is re-checked server-side against a fresh read on
    /// every attempt. An admit also rejects the student's other pending
    /// applications at the institution in the same atomic commit.
    pub fn decide(
        &self,
        actor: &ActorContext,
        application_id: &ApplicationId,
        decision: AdmissionDecision,
    ) -> Result<DecisionOutcome, AdmissionsServiceError> {
        let mut attempts = 0;
        loop {
            let application = self.applications.fetch(application_id)?.ok_or_else(|| {
                AdmissionsServiceError::UnknownApplication {
                    application: application_id.clone(),
                }
            })?;
            self.authorize_reviewer(actor, &application.institution_id, "decide applications")?;

            let siblings = self
                .applications
                .student_applications(&application.student_id)?;
            let plan = build_plan(&application, decision, &siblings)?;

            match self.applications.commit_decision(&plan) {
                Ok(()) => {
                    let mut decided = application;
                    decided.status = decision.target_status();
                    let cascaded = plan.cascaded_ids();

                    self.notify_status(&decided);
                    for id in &cascaded {
                        if let Some(sibling) = siblings.iter().find(|app| app.id == *id) {
                            let mut rejected = sibling.clone();
                            rejected.status = ApplicationStatus::Rejected;
                            self.notify_status(&rejected);
                        }
                    }

                    info!(
                        application = %decided.id.0,
                        decision = decision.label(),
                        cascaded = cascaded.len(),
                        "admission decision committed"
                    );
                    return Ok(DecisionOutcome {
                        application: decided.status_view(),
                        cascaded,
                    });
                }
                Err(StoreError::Conflict) => {
                    attempts += 1;
                    if attempts >= self.policy.commit_retry_limit {
                        return Err(StoreError::Unavailable(format!(
                            "decision contention persisted after {attempts} attempts"
                        ))
                        .into());
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Fetch an application's current status for API responses.
    pub fn application_status(
        &self,
        actor: &ActorContext,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, AdmissionsServiceError> {
        let application = self.applications.fetch(application_id)?.ok_or_else(|| {
            AdmissionsServiceError::UnknownApplication {
                application: application_id.clone(),
            }
        })?;

        let permitted = match actor.role {
            Role::Admin => true,
            Role::Student => application.student_id == actor.actor,
            Role::Institution => actor.is_org(&application.institution_id),
            Role::Company => false,
        };
        if !permitted {
            return Err(AdmissionsServiceError::Forbidden {
                role: actor.role,
                action: "view this application",
            });
        }

        Ok(application.status_view())
    }

    /// Roster of placed students at an institution, derived at read time.
    ///
    /// A student's admitted application suppresses their waitlisted ones;
    /// waitlisted entries only appear while no admitted one exists. Pending
    /// and rejected applications never appear.
    pub fn admissions_roster(
        &self,
        actor: &ActorContext,
        institution: &OrgId,
    ) -> Result<Vec<RosterEntry>, AdmissionsServiceError> {
        self.authorize_reviewer(actor, institution, "view the admissions roster")?;

        let applications = self.applications.institution_applications(institution)?;
        let mut grouped: BTreeMap<&UserId, Vec<&Application>> = BTreeMap::new();
        for application in &applications {
            grouped
                .entry(&application.student_id)
                .or_default()
                .push(application);
        }

        let mut roster = Vec::new();
        for entries in grouped.values() {
            let has_admitted = entries
                .iter()
                .any(|app| app.status == ApplicationStatus::Admitted);
            let shown = if has_admitted {
                ApplicationStatus::Admitted
            } else {
                ApplicationStatus::Waitlisted
            };
            roster.extend(
                entries
                    .iter()
                    .filter(|app| app.status == shown)
                    .map(|app| RosterEntry {
                        application_id: app.id.clone(),
                        student_id: app.student_id.clone(),
                        course_id: app.course_id.clone(),
                        status: app.status.label(),
                    }),
            );
        }

        Ok(roster)
    }

    fn authorize_reviewer(
        &self,
        actor: &ActorContext,
        institution: &OrgId,
        action: &'static str,
    ) -> Result<(), AdmissionsServiceError> {
        let permitted = match actor.role {
            Role::Admin => true,
            Role::Institution => actor.is_org(institution),
            Role::Student | Role::Company => false,
        };
        if permitted {
            Ok(())
        } else {
            Err(AdmissionsServiceError::Forbidden {
                role: actor.role,
                action,
            })
        }
    }

    fn notify_status(&self, application: &Application) {
        let notification = Notification {
            recipient: application.student_id.clone(),
            title: "Application update".to_string(),
            message: format!(
                "Your application {} for course {} is now {}.",
                application.id.0,
                application.course_id.0,
                application.status.label()
            ),
            kind: NotificationKind::Admission,
        };
        if let Err(err) = self.notifications.deliver(notification) {
            warn!(
                application = %application.id.0,
                error = %err,
                "notification delivery failed"
            );
        }
    }
}

/// Result of a committed decision: the decided application plus the sibling
/// applications rejected by an admit cascade.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub application: ApplicationStatusView,
    pub cascaded: Vec<ApplicationId>,
}

/// One line of the institution's admissions roster.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub application_id: ApplicationId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub status: &'static str,
}

/// Error raised by the admissions service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsServiceError {
    #[error(transparent)]
    Denied(#[from] SubmissionDenial),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("student has no academic results on file")]
    ProfileIncomplete,
    #[error("course {} is not in the catalog", course.0)]
    UnknownCourse { course: CourseId },
    #[error("application {} not found", application.0)]
    UnknownApplication { application: ApplicationId },
    #[error("role {} may not {}", role.label(), action)]
    Forbidden { role: Role, action: &'static str },
}
