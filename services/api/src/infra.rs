use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;

use admitflow::admissions::{
    AcademicRecord, Application, ApplicationId, ApplicationStatus, ApplicationStore, CatalogStore,
    Course, CourseId, DecisionPlan, Grade, RequirementSet, SubjectResult, SubmissionGuard,
};
use admitflow::directory::domain::{AccessStatus, Organization, OrgKind, UserAccount};
use admitflow::directory::store::DirectoryStore;
use admitflow::identity::{OrgId, Role, UserId};
use admitflow::notify::{Notification, NotificationSink, NotifyError};
use admitflow::store::StoreError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    applications: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationStore for InMemoryApplicationStore {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn student_applications(&self, student: &UserId) -> Result<Vec<Application>, StoreError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        let mut found: Vec<Application> = guard
            .values()
            .filter(|application| &application.student_id == student)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(found)
    }

    fn institution_applications(
        &self,
        institution: &OrgId,
    ) -> Result<Vec<Application>, StoreError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        let mut found: Vec<Application> = guard
            .values()
            .filter(|application| &application.institution_id == institution)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(found)
    }

    fn insert_guarded(
        &self,
        application: Application,
        guard: &SubmissionGuard,
    ) -> Result<Application, StoreError> {
        let mut applications = self.applications.lock().expect("store mutex poisoned");
        let duplicate = applications.values().any(|existing| {
            existing.student_id == guard.student && existing.course_id == guard.course
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        let at_institution = applications
            .values()
            .filter(|existing| {
                existing.student_id == guard.student
                    && existing.institution_id == guard.institution
            })
            .count();
        if at_institution != guard.seen_at_institution {
            return Err(StoreError::Conflict);
        }
        applications.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn commit_decision(&self, plan: &DecisionPlan) -> Result<(), StoreError> {
        let mut applications = self.applications.lock().expect("store mutex poisoned");
        for write in &plan.writes {
            match applications.get(&write.application) {
                Some(existing) if existing.status == ApplicationStatus::Pending => {}
                Some(_) => return Err(StoreError::Conflict),
                None => return Err(StoreError::NotFound),
            }
        }
        for write in &plan.writes {
            if let Some(existing) = applications.get_mut(&write.application) {
                existing.status = write.status;
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCatalog {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    records: Arc<Mutex<HashMap<UserId, AcademicRecord>>>,
}

impl InMemoryCatalog {
    pub(crate) fn insert_course(&self, course: Course) {
        self.courses
            .lock()
            .expect("catalog mutex poisoned")
            .insert(course.id.clone(), course);
    }

    pub(crate) fn insert_record(&self, student: UserId, record: AcademicRecord) {
        self.records
            .lock()
            .expect("catalog mutex poisoned")
            .insert(student, record);
    }
}

impl CatalogStore for InMemoryCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        let guard = self.courses.lock().expect("catalog mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn academic_record(&self, student: &UserId) -> Result<Option<AcademicRecord>, StoreError> {
        let guard = self.records.lock().expect("catalog mutex poisoned");
        Ok(guard.get(student).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDirectory {
    organizations: Arc<Mutex<HashMap<OrgId, Organization>>>,
    accounts: Arc<Mutex<HashMap<UserId, UserAccount>>>,
}

impl InMemoryDirectory {
    pub(crate) fn insert_organization(&self, organization: Organization) {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(organization.id.clone(), organization);
    }

    pub(crate) fn insert_account(&self, account: UserAccount) {
        self.accounts
            .lock()
            .expect("directory mutex poisoned")
            .insert(account.uid.clone(), account);
    }
}

impl DirectoryStore for InMemoryDirectory {
    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        let guard = self.organizations.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_organization(&self, organization: Organization) -> Result<(), StoreError> {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(organization.id.clone(), organization);
        Ok(())
    }

    fn member_accounts(&self, organization: &OrgId) -> Result<Vec<UserAccount>, StoreError> {
        let guard = self.accounts.lock().expect("directory mutex poisoned");
        let mut members: Vec<UserAccount> = guard
            .values()
            .filter(|account| account.org_id.as_ref() == Some(organization))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.uid.0.cmp(&b.uid.0));
        Ok(members)
    }

    fn account(&self, uid: &UserId) -> Result<Option<UserAccount>, StoreError> {
        let guard = self.accounts.lock().expect("directory mutex poisoned");
        Ok(guard.get(uid).cloned())
    }

    fn set_account_status(
        &self,
        uid: &UserId,
        status: AccessStatus,
        suspension_reason: Option<String>,
    ) -> Result<(), StoreError> {
        let mut guard = self.accounts.lock().expect("directory mutex poisoned");
        match guard.get_mut(uid) {
            Some(account) => {
                account.status = status;
                account.suspension_reason = suspension_reason;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for InMemoryNotificationSink {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("sink mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationSink {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

/// Starter catalog so the service answers submissions out of the box.
pub(crate) fn sample_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::default();

    catalog.insert_course(course(
        "bsc-software-eng",
        "BSc Software Engineering",
        "fac-computing",
        "uni-metro",
        &[("Mathematics", Grade::B), ("English", Grade::C)],
    ));
    catalog.insert_course(course(
        "bsc-data-science",
        "BSc Data Science",
        "fac-computing",
        "uni-metro",
        &[("Mathematics", Grade::B)],
    ));
    catalog.insert_course(course(
        "bcom-commerce",
        "BCom Commerce",
        "fac-business",
        "uni-metro",
        &[("Mathematics", Grade::C)],
    ));
    catalog.insert_course(course(
        "bsc-marine-bio",
        "BSc Marine Biology",
        "fac-science",
        "uni-coastal",
        &[("Biology", Grade::C)],
    ));

    catalog.insert_record(
        UserId("stu-avery".to_string()),
        AcademicRecord::from(BTreeMap::from([
            (
                "Mathematics".to_string(),
                SubjectResult::with_mark(Grade::A, 82),
            ),
            ("English".to_string(), SubjectResult::with_mark(Grade::B, 71)),
            ("Biology".to_string(), SubjectResult::with_mark(Grade::C, 58)),
        ])),
    );
    catalog.insert_record(
        UserId("stu-blake".to_string()),
        AcademicRecord::from(BTreeMap::from([
            (
                "Mathematics".to_string(),
                SubjectResult::with_mark(Grade::D, 44),
            ),
            ("English".to_string(), SubjectResult::with_mark(Grade::C, 55)),
        ])),
    );

    catalog
}

/// Starter organizations and accounts matching [`sample_catalog`].
pub(crate) fn sample_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::default();

    directory.insert_organization(organization(
        "uni-metro",
        OrgKind::Institution,
        "Metropolitan University",
        AccessStatus::Approved,
    ));
    directory.insert_organization(organization(
        "uni-coastal",
        OrgKind::Institution,
        "Coastal Science Institute",
        AccessStatus::Approved,
    ));
    directory.insert_organization(organization(
        "com-talent",
        OrgKind::Company,
        "TalentBridge Recruiting",
        AccessStatus::Pending,
    ));

    // Operator accounts sign in under their organization's id.
    directory.insert_account(account("admin-1", Role::Admin, AccessStatus::Approved, None));
    directory.insert_account(account(
        "uni-metro",
        Role::Institution,
        AccessStatus::Approved,
        Some("uni-metro"),
    ));
    directory.insert_account(account(
        "uni-coastal",
        Role::Institution,
        AccessStatus::Approved,
        Some("uni-coastal"),
    ));
    directory.insert_account(account(
        "staff-records",
        Role::Institution,
        AccessStatus::Approved,
        Some("uni-coastal"),
    ));
    directory.insert_account(account(
        "com-talent",
        Role::Company,
        AccessStatus::Pending,
        Some("com-talent"),
    ));
    directory.insert_account(account(
        "stu-avery",
        Role::Student,
        AccessStatus::Approved,
        None,
    ));
    directory.insert_account(account(
        "stu-blake",
        Role::Student,
        AccessStatus::Approved,
        None,
    ));

    directory
}

fn course(
    id: &str,
    name: &str,
    faculty: &str,
    institution: &str,
    requirements: &[(&str, Grade)],
) -> Course {
    Course {
        id: CourseId(id.to_string()),
        name: name.to_string(),
        faculty_id: faculty.to_string(),
        institution_id: OrgId(institution.to_string()),
        requirements: RequirementSet::from(
            requirements
                .iter()
                .map(|(subject, grade)| (subject.to_string(), *grade))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

fn organization(id: &str, kind: OrgKind, name: &str, status: AccessStatus) -> Organization {
    Organization {
        id: OrgId(id.to_string()),
        kind,
        name: name.to_string(),
        status,
        suspension_reason: None,
        reactivation_requested: false,
        reactivation_message: None,
        updated_at: Utc::now(),
    }
}

fn account(uid: &str, role: Role, status: AccessStatus, org: Option<&str>) -> UserAccount {
    UserAccount {
        uid: UserId(uid.to_string()),
        role,
        status,
        org_id: org.map(|id| OrgId(id.to_string())),
        suspension_reason: None,
    }
}
