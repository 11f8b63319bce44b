use serde::{Deserialize, Serialize};

use super::domain::{AdmissionDecision, Application, ApplicationId, ApplicationStatus};

/// Raised when a decision targets an application that already left `Pending`.
/// The current status is echoed so reviewers see what happened first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("application already decided: status is {}", current.label())]
    AlreadyDecided { current: ApplicationStatus },
}

/// Pure transition function for the application state machine.
///
/// `Pending` is the only state a decision may leave; every decided state is
/// terminal for the engine. Callers re-run this against a fresh read before
/// every commit, so a stale client decision cannot overwrite a concurrent one.
pub fn transition(
    current: ApplicationStatus,
    decision: AdmissionDecision,
) -> Result<ApplicationStatus, DecisionError> {
    if current != ApplicationStatus::Pending {
        return Err(DecisionError::AlreadyDecided { current });
    }
    Ok(decision.target_status())
}

/// One status write inside a decision plan. The commit precondition for every
/// write is that the application is still `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusWrite {
    pub application: ApplicationId,
    pub status: ApplicationStatus,
}

/// Full write set for one decision, committed all-or-nothing.
///
/// The first write is always the target application; on an admit the plan also
/// rejects every pending sibling application the student holds at the same
/// institution, which is what keeps "at most one admitted per student and
/// institution" true under concurrency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPlan {
    pub target: ApplicationId,
    pub writes: Vec<StatusWrite>,
}

impl DecisionPlan {
    /// Sibling applications rejected alongside the target.
    pub fn cascaded_ids(&self) -> Vec<ApplicationId> {
        self.writes
            .iter()
            .skip(1)
            .map(|write| write.application.clone())
            .collect()
    }
}

/// Build the write set for a decision against a fresh snapshot of the target
/// and the student's other applications.
pub fn build_plan(
    target: &Application,
    decision: AdmissionDecision,
    siblings: &[Application],
) -> Result<DecisionPlan, DecisionError> {
    let next = transition(target.status, decision)?;

    let mut writes = vec![StatusWrite {
        application: target.id.clone(),
        status: next,
    }];

    if decision == AdmissionDecision::Admit {
        for sibling in siblings {
            if sibling.id == target.id {
                continue;
            }
            if sibling.student_id != target.student_id
                || sibling.institution_id != target.institution_id
            {
                continue;
            }
            if sibling.status != ApplicationStatus::Pending {
                continue;
            }
            writes.push(StatusWrite {
                application: sibling.id.clone(),
                status: ApplicationStatus::Rejected,
            });
        }
    }

    Ok(DecisionPlan {
        target: target.id.clone(),
        writes,
    })
}
