use crate::admission::handle_review;
use crate::backend::spawn_delivery;
use crate::error::AdmissionError;
use crate::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use kube::core::DynamicObject;
use kube::core::admission::AdmissionReview;
use tracing::warn;

pub async fn readiness_probe() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn liveness_probe() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/validate", post(validate).fallback(method_not_allowed))
        .route("/healthz", get(liveness_probe).fallback(method_not_allowed))
        .route(
            "/health/live",
            get(liveness_probe).fallback(method_not_allowed),
        )
        .route(
            "/health/ready",
            get(readiness_probe).fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdmissionReview<DynamicObject>>, AdmissionError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        return Err(AdmissionError::BadRequest(
            "expected application/json content-type".to_string(),
        ));
    }

    let outcome = handle_review(&body, &state.dispatch, state.policy.as_ref()).inspect_err(|e| {
        warn!(status = %e.status_code(), "Rejecting admission request: {}", e);
    })?;

    if let Some(backend) = &state.backend {
        spawn_delivery(backend.clone(), &outcome.review);
    }

    Ok(Json(outcome.response))
}

async fn method_not_allowed(method: Method) -> AdmissionError {
    AdmissionError::MethodNotAllowed(method)
}
