use crate::dispatch::DispatchTable;
use crate::error::AdmissionError;
use crate::image_reference::Image;
use crate::policy::{AdmissionPolicy, Decision};
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One decoded admission request together with the images found in its workload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReview {
    pub uid: String,
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub images: Vec<Image>,
}

pub struct ReviewOutcome {
    pub response: AdmissionReview<DynamicObject>,
    pub review: WorkloadReview,
}

/// Decodes an `AdmissionReview`, extracts the images of the embedded workload
/// and builds the response envelope.
///
/// The response echoes the envelope's own apiVersion/kind and the request uid.
/// Any error is terminal: no response envelope is produced.
pub fn handle_review(
    raw: &[u8],
    table: &DispatchTable,
    policy: &dyn AdmissionPolicy,
) -> Result<ReviewOutcome, AdmissionError> {
    let review: AdmissionReview<DynamicObject> = serde_json::from_slice(raw)?;
    let request: AdmissionRequest<DynamicObject> = review
        .try_into()
        .map_err(|e| AdmissionError::BadRequest(format!("invalid AdmissionReview: {}", e)))?;

    let object = request.object.as_ref().ok_or_else(|| {
        AdmissionError::BadRequest(format!(
            "admission request {} carries no object",
            request.uid
        ))
    })?;

    // The object's own type is authoritative, request.kind covers objects sent without it.
    let (api_version, kind) = match &object.types {
        Some(types) => (types.api_version.clone(), types.kind.clone()),
        None => (request.kind.api_version(), request.kind.kind.clone()),
    };

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        api_version = %api_version,
        kind = %kind,
        "Processing admission request"
    );

    let body = serde_json::to_vec(object)?;
    let images = table.dispatch(&api_version, &kind, &body)?;

    let mut response = AdmissionResponse::from(&request);
    match policy.evaluate(&images) {
        Decision::Allow => {
            info!(
                uid = %request.uid,
                kind = %kind,
                name = %request.name,
                images = images.len(),
                "Admission request allowed"
            );
        }
        Decision::Deny { reason } => {
            warn!(
                uid = %request.uid,
                kind = %kind,
                name = %request.name,
                policy = policy.name(),
                reason = %reason,
                "Admission request denied"
            );
            response = response.deny(reason);
        }
    }

    Ok(ReviewOutcome {
        response: response.into_review(),
        review: WorkloadReview {
            uid: request.uid.clone(),
            api_version,
            kind,
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            images,
        },
    })
}
