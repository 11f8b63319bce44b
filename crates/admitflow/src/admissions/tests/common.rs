use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::admissions::decision::DecisionPlan;
use crate::admissions::domain::{
    AcademicRecord, Application, ApplicationId, ApplicationStatus, Course, CourseId,
    RequirementSet, SubjectResult,
};
use crate::admissions::grades::Grade;
use crate::admissions::store::{ApplicationStore, CatalogStore, SubmissionGuard};
use crate::admissions::{admissions_router, AdmissionsService};
use crate::config::PolicyConfig;
use crate::identity::{ActorContext, OrgId, Role, UserId, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::notify::{Notification, NotificationSink, NotifyError};
use crate::store::StoreError;

pub(super) fn policy() -> PolicyConfig {
    PolicyConfig::default()
}

pub(super) fn student(id: &str) -> ActorContext {
    ActorContext::new(UserId(id.to_string()), Role::Student)
}

pub(super) fn institution_actor(id: &str) -> ActorContext {
    ActorContext::new(UserId(id.to_string()), Role::Institution)
}

pub(super) fn admin() -> ActorContext {
    ActorContext::new(UserId("admin-1".to_string()), Role::Admin)
}

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn course(id: &str, institution: &str, requirements: &[(&str, Grade)]) -> Course {
    Course {
        id: CourseId(id.to_string()),
        name: format!("Course {id}"),
        faculty_id: "fac-eng".to_string(),
        institution_id: OrgId(institution.to_string()),
        requirements: RequirementSet(
            requirements
                .iter()
                .map(|(subject, grade)| (subject.to_string(), *grade))
                .collect(),
        ),
    }
}

pub(super) fn record(subjects: &[(&str, Grade)]) -> AcademicRecord {
    AcademicRecord(
        subjects
            .iter()
            .map(|(subject, grade)| (subject.to_string(), SubjectResult::new(*grade)))
            .collect(),
    )
}

pub(super) fn application(
    id: &str,
    student: &str,
    course: &str,
    institution: &str,
    status: ApplicationStatus,
) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        student_id: UserId(student.to_string()),
        course_id: CourseId(course.to_string()),
        faculty_id: "fac-eng".to_string(),
        institution_id: OrgId(institution.to_string()),
        status,
        submitted_at: fixed_time(),
    }
}

pub(super) fn build_service() -> (
    AdmissionsService<MemoryStore, MemoryCatalog, MemorySink>,
    Arc<MemoryStore>,
    Arc<MemoryCatalog>,
    Arc<MemorySink>,
) {
    let store = Arc::new(MemoryStore::default());
    let catalog = Arc::new(MemoryCatalog::default());
    let sink = Arc::new(MemorySink::default());
    let service = AdmissionsService::new(store.clone(), catalog.clone(), sink.clone(), policy());
    (service, store, catalog, sink)
}

/// Catalog baseline shared by the service and routing tests: two courses at
/// uni-1 (one with requirements), one at uni-2, and results for stu-1.
pub(super) fn seed_standard_catalog(catalog: &MemoryCatalog) {
    catalog.put_course(course("cs-101", "uni-1", &[("Mathematics", Grade::B)]));
    catalog.put_course(course("cs-102", "uni-1", &[]));
    catalog.put_course(course("bio-201", "uni-2", &[]));
    catalog.put_record(
        "stu-1",
        record(&[("Mathematics", Grade::A), ("English", Grade::C)]),
    );
}

#[derive(Default)]
pub(super) struct MemoryStore {
    applications: Mutex<HashMap<ApplicationId, Application>>,
}

impl MemoryStore {
    pub(super) fn seed(&self, applications: impl IntoIterator<Item = Application>) {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        for application in applications {
            guard.insert(application.id.clone(), application);
        }
    }

    pub(super) fn get(&self, id: &ApplicationId) -> Option<Application> {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn len(&self) -> usize {
        self.applications.lock().expect("store mutex poisoned").len()
    }
}

impl ApplicationStore for MemoryStore {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self
            .applications
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn student_applications(&self, student: &UserId) -> Result<Vec<Application>, StoreError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        let mut found: Vec<Application> = guard
            .values()
            .filter(|app| app.student_id == *student)
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
            .filter(|app| app.institution_id == *institution)
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
        let duplicate = applications
            .values()
            .any(|app| app.student_id == guard.student && app.course_id == guard.course);
        if duplicate {
            return Err(StoreError::Conflict);
        }
        let at_institution = applications
            .values()
            .filter(|app| {
                app.student_id == guard.student && app.institution_id == guard.institution
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
            let current = applications
                .get(&write.application)
                .ok_or(StoreError::NotFound)?;
            if current.status != ApplicationStatus::Pending {
                return Err(StoreError::Conflict);
            }
        }
        for write in &plan.writes {
            if let Some(application) = applications.get_mut(&write.application) {
                application.status = write.status;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    courses: Mutex<HashMap<CourseId, Course>>,
    records: Mutex<HashMap<UserId, AcademicRecord>>,
}

impl MemoryCatalog {
    pub(super) fn put_course(&self, course: Course) {
        self.courses
            .lock()
            .expect("catalog mutex poisoned")
            .insert(course.id.clone(), course);
    }

    pub(super) fn put_record(&self, student: &str, record: AcademicRecord) {
        self.records
            .lock()
            .expect("catalog mutex poisoned")
            .insert(UserId(student.to_string()), record);
    }
}

impl CatalogStore for MemoryCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self
            .courses
            .lock()
            .expect("catalog mutex poisoned")
            .get(id)
            .cloned())
    }

    fn academic_record(&self, student: &UserId) -> Result<Option<AcademicRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("catalog mutex poisoned")
            .get(student)
            .cloned())
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Store double whose next N guarded writes lose their race before the
/// backing store takes over.
pub(super) struct ContendedStore {
    inner: MemoryStore,
    conflicts_left: Mutex<usize>,
}

impl ContendedStore {
    pub(super) fn with_conflicts(conflicts: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            conflicts_left: Mutex::new(conflicts),
        }
    }

    pub(super) fn seed(&self, applications: impl IntoIterator<Item = Application>) {
        self.inner.seed(applications);
    }

    pub(super) fn get(&self, id: &ApplicationId) -> Option<Application> {
        self.inner.get(id)
    }

    fn consume_conflict(&self) -> bool {
        let mut left = self.conflicts_left.lock().expect("conflict mutex poisoned");
        if *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

impl ApplicationStore for ContendedStore {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.fetch(id)
    }

    fn student_applications(&self, student: &UserId) -> Result<Vec<Application>, StoreError> {
        self.inner.student_applications(student)
    }

    fn institution_applications(
        &self,
        institution: &OrgId,
    ) -> Result<Vec<Application>, StoreError> {
        self.inner.institution_applications(institution)
    }

    fn insert_guarded(
        &self,
        application: Application,
        guard: &SubmissionGuard,
    ) -> Result<Application, StoreError> {
        if self.consume_conflict() {
            return Err(StoreError::Conflict);
        }
        self.inner.insert_guarded(application, guard)
    }

    fn commit_decision(&self, plan: &DecisionPlan) -> Result<(), StoreError> {
        if self.consume_conflict() {
            return Err(StoreError::Conflict);
        }
        self.inner.commit_decision(plan)
    }
}

pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn student_applications(&self, _student: &UserId) -> Result<Vec<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn institution_applications(
        &self,
        _institution: &OrgId,
    ) -> Result<Vec<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn insert_guarded(
        &self,
        _application: Application,
        _guard: &SubmissionGuard,
    ) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn commit_decision(&self, _plan: &DecisionPlan) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("feed offline".to_string()))
    }
}

pub(super) fn actor_headers(id: &str, role: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACTOR_ID_HEADER,
        HeaderValue::from_str(id).expect("header value"),
    );
    headers.insert(
        ACTOR_ROLE_HEADER,
        HeaderValue::from_str(role).expect("header value"),
    );
    headers
}

pub(super) fn post_json(
    uri: &str,
    actor: (&str, &str),
    body: &Value,
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .header(ACTOR_ID_HEADER, actor.0)
        .header(ACTOR_ROLE_HEADER, actor.1)
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serialize body"),
        ))
        .expect("request builds")
}

pub(super) fn get_request(
    uri: &str,
    actor: (&str, &str),
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .header(ACTOR_ID_HEADER, actor.0)
        .header(ACTOR_ROLE_HEADER, actor.1)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn admissions_router_with_service(
    service: AdmissionsService<MemoryStore, MemoryCatalog, MemorySink>,
) -> axum::Router {
    admissions_router(Arc::new(service))
}
