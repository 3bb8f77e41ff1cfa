use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::image_reference::ParseError;

/// Terminal failures of a single admission request.
///
/// None of these fall back to an allowed response.
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("{0}")]
    BadRequest(String),

    #[error("malformed image reference: {0}")]
    InvalidImage(#[from] ParseError),

    #[error("resource kind {kind} ({api_version}) not implemented")]
    UnsupportedKind { api_version: String, kind: String },

    #[error("resource kind {kind} not implemented for apiVersion {api_version}")]
    UnsupportedVersion { api_version: String, kind: String },

    #[error("{0} method not allowed")]
    MethodNotAllowed(Method),
}

impl AdmissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::BadRequest(_) | AdmissionError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            AdmissionError::UnsupportedKind { .. } | AdmissionError::UnsupportedVersion { .. } => {
                StatusCode::NOT_IMPLEMENTED
            }
            AdmissionError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<serde_json::Error> for AdmissionError {
    fn from(err: serde_json::Error) -> Self {
        AdmissionError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
