use crate::infra::{
    sample_catalog, sample_directory, InMemoryApplicationStore, InMemoryCatalog,
    InMemoryNotificationSink,
};
use admitflow::admissions::{
    AdmissionDecision, AdmissionsService, AdmissionsServiceError, ApplicationId, CatalogStore,
    CourseId, SubmissionDenial,
};
use admitflow::config::PolicyConfig;
use admitflow::directory::{AccessStatus, DirectoryService, ReviewDecision};
use admitflow::error::AppError;
use admitflow::identity::{ActorContext, OrgId, Role, UserId};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the organization suspension portion of the demo.
    #[arg(long)]
    pub(crate) skip_directory: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { skip_directory } = args;

    let policy = PolicyConfig::default();
    let applications = Arc::new(InMemoryApplicationStore::default());
    let catalog = Arc::new(sample_catalog());
    let directory = Arc::new(sample_directory());
    let notifications = Arc::new(InMemoryNotificationSink::default());

    let admissions = Arc::new(AdmissionsService::new(
        applications,
        catalog.clone(),
        notifications.clone(),
        policy.clone(),
    ));
    let lifecycle = Arc::new(DirectoryService::new(
        directory,
        notifications.clone(),
        policy.clone(),
    ));

    let avery = ActorContext::new(UserId("stu-avery".to_string()), Role::Student);
    let blake = ActorContext::new(UserId("stu-blake".to_string()), Role::Student);
    let metro_reviewer = ActorContext::new(UserId("uni-metro".to_string()), Role::Institution);
    let coastal_operator = ActorContext::new(UserId("uni-coastal".to_string()), Role::Institution);
    let admin = ActorContext::new(UserId("admin-1".to_string()), Role::Admin);

    println!("Admissions portal demo");
    print_catalog(&catalog);

    println!("\nApplication intake");
    let first = submit_and_report(&admissions, &avery, "bsc-software-eng");
    submit_and_report(&admissions, &avery, "bcom-commerce");
    submit_and_report(&admissions, &avery, "bsc-data-science");
    submit_and_report(&admissions, &avery, "bsc-software-eng");
    submit_and_report(&admissions, &avery, "bsc-marine-bio");
    submit_and_report(&admissions, &blake, "bsc-software-eng");

    let Some(target) = first else {
        println!("  Intake produced no application to decide; stopping early");
        return Ok(());
    };

    println!("\nDecision round");
    match admissions.decide(&metro_reviewer, &target, AdmissionDecision::Admit) {
        Ok(outcome) => {
            println!(
                "- {} admitted {} for {}",
                metro_reviewer.actor.0, outcome.application.application_id.0, avery.actor.0
            );
            if outcome.cascaded.is_empty() {
                println!("  No sibling applications to close out");
            } else {
                for id in &outcome.cascaded {
                    println!("  Cascade rejected {}", id.0);
                }
            }
        }
        Err(err) => {
            println!("  Decision unavailable: {}", err);
            return Ok(());
        }
    }
    match admissions.decide(&metro_reviewer, &target, AdmissionDecision::Waitlist) {
        Ok(_) => println!("- repeat decision unexpectedly succeeded"),
        Err(err) => println!("- repeat decision refused: {}", err),
    }

    match admissions.application_status(&avery, &target) {
        Ok(view) => match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("  Public status payload:\n{}", json),
            Err(err) => println!("  Public status payload unavailable: {}", err),
        },
        Err(err) => println!("  Status lookup failed: {}", err),
    }

    println!("\nAdmissions roster for uni-metro");
    match admissions.admissions_roster(&metro_reviewer, &OrgId("uni-metro".to_string())) {
        Ok(roster) if roster.is_empty() => println!("- no placed students yet"),
        Ok(roster) => {
            for entry in roster {
                println!(
                    "- {}: {} ({})",
                    entry.student_id.0, entry.course_id.0, entry.status
                );
            }
        }
        Err(err) => println!("  Roster unavailable: {}", err),
    }

    if skip_directory {
        print_notifications(&notifications);
        return Ok(());
    }

    println!("\nOrganization lifecycle");
    let coastal = OrgId("uni-coastal".to_string());
    match lifecycle.set_org_status(
        &admin,
        &coastal,
        AccessStatus::Suspended,
        Some("accreditation review".to_string()),
    ) {
        Ok(report) => println!(
            "- suspended {}: {} member account(s) locked out",
            coastal.0, report.members_updated
        ),
        Err(err) => println!("  Suspension failed: {}", err),
    }
    match lifecycle.request_reactivation(
        &coastal_operator,
        &coastal,
        "Accreditation review closed in our favor.".to_string(),
    ) {
        Ok(()) => println!("- {} filed a reactivation request", coastal.0),
        Err(err) => println!("  Reactivation request refused: {}", err),
    }
    match lifecycle.set_org_status(&admin, &coastal, AccessStatus::Approved, None) {
        Ok(report) => println!(
            "- reactivated {}: {} member account(s) restored",
            coastal.0, report.members_updated
        ),
        Err(err) => println!("  Reactivation failed: {}", err),
    }
    match lifecycle.review_account(&admin, &UserId("com-talent".to_string()), ReviewDecision::Approve)
    {
        Ok(account) => println!(
            "- reviewed account {}: {}",
            account.uid.0,
            account.status.label()
        ),
        Err(err) => println!("  Account review failed: {}", err),
    }

    print_notifications(&notifications);
    Ok(())
}

fn print_catalog(catalog: &InMemoryCatalog) {
    println!("\nCourse catalog");
    for id in [
        "bsc-software-eng",
        "bsc-data-science",
        "bcom-commerce",
        "bsc-marine-bio",
    ] {
        let course = match catalog.course(&CourseId(id.to_string())) {
            Ok(Some(course)) => course,
            Ok(None) => continue,
            Err(err) => {
                println!("  Catalog unavailable: {}", err);
                return;
            }
        };
        let requirements: Vec<String> = course
            .requirements
            .iter()
            .map(|(subject, grade)| format!("{} >= {}", subject, grade))
            .collect();
        let requirements = if requirements.is_empty() {
            "open enrollment".to_string()
        } else {
            requirements.join(", ")
        };
        println!(
            "- {} | {} @ {} | {}",
            course.id.0, course.name, course.institution_id.0, requirements
        );
    }
}

fn submit_and_report(
    admissions: &AdmissionsService<
        InMemoryApplicationStore,
        InMemoryCatalog,
        InMemoryNotificationSink,
    >,
    actor: &ActorContext,
    course: &str,
) -> Option<ApplicationId> {
    let course_id = CourseId(course.to_string());
    match admissions.submit(actor, &course_id) {
        Ok(view) => {
            println!(
                "- {} -> {}: accepted as {} (status {})",
                actor.actor.0, course, view.application_id.0, view.status
            );
            Some(view.application_id)
        }
        Err(AdmissionsServiceError::Denied(SubmissionDenial::RequirementsNotMet { unmet })) => {
            println!("- {} -> {}: requirements not met", actor.actor.0, course);
            for shortfall in unmet {
                match shortfall.achieved {
                    Some(achieved) => println!(
                        "    {}: required {}, achieved {}",
                        shortfall.subject, shortfall.required, achieved
                    ),
                    None => println!(
                        "    {}: required {}, no result on record",
                        shortfall.subject, shortfall.required
                    ),
                }
            }
            None
        }
        Err(err) => {
            println!("- {} -> {}: {}", actor.actor.0, course, err);
            None
        }
    }
}

fn print_notifications(notifications: &InMemoryNotificationSink) {
    let events = notifications.events();
    if events.is_empty() {
        println!("\nNotification feed: empty");
        return;
    }

    println!("\nNotification feed");
    for event in events {
        println!("- [{:?}] {}: {}", event.kind, event.recipient.0, event.message);
    }
}
