use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::constraints::SubmissionDenial;
use super::decision::DecisionError;
use super::domain::{AdmissionDecision, ApplicationId, CourseId};
use super::service::{AdmissionsService, AdmissionsServiceError};
use super::store::{ApplicationStore, CatalogStore};
use crate::identity::{ActorContext, OrgId};
use crate::notify::NotificationSink;
use crate::store::StoreError;

/// Router builder exposing the admissions endpoints.
pub fn admissions_router<S, C, N>(service: Arc<AdmissionsService<S, C, N>>) -> Router
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/applications",
            post(submit_handler::<S, C, N>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id",
            get(status_handler::<S, C, N>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/decision",
            post(decision_handler::<S, C, N>),
        )
        .route(
            "/api/v1/admissions/institutions/:institution_id/roster",
            get(roster_handler::<S, C, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub(crate) course_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) decision: AdmissionDecision,
}

pub(crate) async fn submit_handler<S, C, N>(
    State(service): State<Arc<AdmissionsService<S, C, N>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.submit(&actor, &CourseId(request.course_id)) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<S, C, N>(
    State(service): State<Arc<AdmissionsService<S, C, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.application_status(&actor, &ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<S, C, N>(
    State(service): State<Arc<AdmissionsService<S, C, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.decide(&actor, &ApplicationId(application_id), request.decision) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn roster_handler<S, C, N>(
    State(service): State<Arc<AdmissionsService<S, C, N>>>,
    Path(institution_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.admissions_roster(&actor, &OrgId(institution_id)) {
        Ok(roster) => (StatusCode::OK, axum::Json(roster)).into_response(),
        Err(error) => error_response(error),
    }
}

fn require_actor(headers: &HeaderMap) -> Result<ActorContext, Response> {
    ActorContext::from_headers(headers).map_err(|error| {
        let payload = json!({ "error": error.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

fn error_response(error: AdmissionsServiceError) -> Response {
    let status = match &error {
        AdmissionsServiceError::Denied(SubmissionDenial::AlreadyApplied { .. }) => {
            StatusCode::CONFLICT
        }
        AdmissionsServiceError::Denied(_) | AdmissionsServiceError::ProfileIncomplete => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AdmissionsServiceError::Decision(DecisionError::AlreadyDecided { .. }) => {
            StatusCode::CONFLICT
        }
        AdmissionsServiceError::UnknownCourse { .. }
        | AdmissionsServiceError::UnknownApplication { .. }
        | AdmissionsServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        AdmissionsServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AdmissionsServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = match &error {
        AdmissionsServiceError::Denied(SubmissionDenial::RequirementsNotMet { unmet }) => {
            json!({ "error": error.to_string(), "unmet": unmet })
        }
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}
