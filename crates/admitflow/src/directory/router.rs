use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::AccessStatus;
use super::service::{DirectoryService, DirectoryServiceError, ReviewDecision};
use super::store::DirectoryStore;
use super::suspension::SuspensionError;
use crate::identity::{ActorContext, OrgId, UserId};
use crate::notify::NotificationSink;
use crate::store::StoreError;

/// Router builder exposing the organization lifecycle endpoints.
pub fn directory_router<D, N>(service: Arc<DirectoryService<D, N>>) -> Router
where
    D: DirectoryStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/directory/organizations/:org_id/status",
            post(org_status_handler::<D, N>),
        )
        .route(
            "/api/v1/directory/organizations/:org_id/reactivation-request",
            post(reactivation_request_handler::<D, N>),
        )
        .route(
            "/api/v1/directory/accounts/:uid/review",
            post(account_review_handler::<D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrgStatusRequest {
    pub(crate) status: AccessStatus,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReactivationRequest {
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountReviewRequest {
    pub(crate) decision: ReviewDecision,
}

pub(crate) async fn org_status_handler<D, N>(
    State(service): State<Arc<DirectoryService<D, N>>>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<OrgStatusRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.set_org_status(&actor, &OrgId(org_id), request.status, request.reason) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reactivation_request_handler<D, N>(
    State(service): State<Arc<DirectoryService<D, N>>>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ReactivationRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.request_reactivation(&actor, &OrgId(org_id), request.message) {
        Ok(()) => {
            let payload = json!({ "status": "recorded" });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn account_review_handler<D, N>(
    State(service): State<Arc<DirectoryService<D, N>>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AccountReviewRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    N: NotificationSink + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.review_account(&actor, &UserId(uid), request.decision) {
        Ok(account) => {
            let payload = json!({
                "uid": account.uid.0,
                "status": account.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn require_actor(headers: &HeaderMap) -> Result<ActorContext, Response> {
    ActorContext::from_headers(headers).map_err(|error| {
        let payload = json!({ "error": error.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

fn error_response(error: DirectoryServiceError) -> Response {
    let status = match &error {
        DirectoryServiceError::Suspension(SuspensionError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        DirectoryServiceError::Suspension(SuspensionError::ReasonRequired) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DirectoryServiceError::UnknownOrganization { .. }
        | DirectoryServiceError::UnknownAccount { .. }
        | DirectoryServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        DirectoryServiceError::AccountNotReviewable { .. }
        | DirectoryServiceError::NotSuspended { .. } => StatusCode::CONFLICT,
        DirectoryServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        DirectoryServiceError::PartialCascadeFailure { .. }
        | DirectoryServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = match &error {
        DirectoryServiceError::PartialCascadeFailure { updated, failed } => {
            json!({
                "error": error.to_string(),
                "updated": updated,
                "failed": failed.iter().map(|uid| uid.0.clone()).collect::<Vec<_>>(),
                "retriable": true,
            })
        }
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}
