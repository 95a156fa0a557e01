use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::domain::TaskId;
use super::queue::TaskQueue;
use super::repository::{StoreError, TaskStore};
use super::service::{ProvisioningRequestService, SubmissionError, RECENT_TASK_LIMIT};
use crate::auth::{require_bearer, Authenticator};

/// Router exposing login, authenticated submission, and task listing.
pub fn provisioning_router<S, Q>(
    service: Arc<ProvisioningRequestService<S, Q>>,
    authenticator: Arc<Authenticator>,
) -> Router
where
    S: TaskStore + 'static,
    Q: TaskQueue + 'static,
{
    let protected = Router::new()
        .route("/submit-resource", post(submit_handler::<S, Q>))
        .route_layer(middleware::from_fn_with_state(
            authenticator.clone(),
            require_bearer,
        ))
        .with_state(service.clone());

    let public = Router::new()
        .route("/tasks", get(list_handler::<S, Q>))
        .route("/tasks/:task_id", get(task_handler::<S, Q>))
        .with_state(service);

    let login = Router::new()
        .route("/login", post(login_handler))
        .with_state(authenticator);

    protected.merge(public).merge(login)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

pub(crate) async fn login_handler(
    State(authenticator): State<Arc<Authenticator>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(credentials) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let payload = json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match authenticator.login(&credentials.username, &credentials.password) {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn submit_handler<S, Q>(
    State(service): State<Arc<ProvisioningRequestService<S, Q>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: TaskStore + 'static,
    Q: TaskQueue + 'static,
{
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let payload = json!({
                "error": "request body is not valid JSON",
                "details": [{ "loc": "body", "message": rejection.body_text() }],
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    match service.submit(payload) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(SubmissionError::Validation(err)) => {
            let payload = json!({
                "error": "validation failed",
                "details": err.issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(other) => internal_error(&other),
    }
}

pub(crate) async fn list_handler<S, Q>(
    State(service): State<Arc<ProvisioningRequestService<S, Q>>>,
) -> Response
where
    S: TaskStore + 'static,
    Q: TaskQueue + 'static,
{
    match service.recent(RECENT_TASK_LIMIT) {
        Ok(tasks) => (StatusCode::OK, Json(tasks)).into_response(),
        Err(err) => internal_error(&err),
    }
}

pub(crate) async fn task_handler<S, Q>(
    State(service): State<Arc<ProvisioningRequestService<S, Q>>>,
    Path(task_id): Path<u64>,
) -> Response
where
    S: TaskStore + 'static,
    Q: TaskQueue + 'static,
{
    match service.get(TaskId(task_id)) {
        Ok(task) => (StatusCode::OK, Json(task.summary_view())).into_response(),
        Err(SubmissionError::Store(StoreError::NotFound(id))) => {
            let payload = json!({ "error": format!("task {id} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => internal_error(&err),
    }
}

fn internal_error(err: &SubmissionError) -> Response {
    error!(error = %err, "provisioning request failed");
    let payload = json!({ "error": "internal server error" });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
