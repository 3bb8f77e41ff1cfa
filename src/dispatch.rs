use crate::error::AdmissionError;
use crate::image_reference::Image;
use crate::workload::Workload;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use std::collections::HashMap;
use tracing::debug;

type Handler = fn(&[u8]) -> Result<Vec<Image>, AdmissionError>;

/// Maps a workload kind and API version to the decoder that knows where that
/// kind nests its pod template.
///
/// Built once at startup and only read afterwards.
pub struct DispatchTable {
    // kind -> apiVersion -> handler
    handlers: HashMap<String, HashMap<String, Handler>>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<W: Workload>(mut self) -> Self {
        self.handlers
            .entry(W::KIND.to_string())
            .or_default()
            .insert(W::API_VERSION.to_string(), extract::<W>);
        self
    }

    pub fn supported(&self) -> Vec<String> {
        let mut supported: Vec<String> = self
            .handlers
            .iter()
            .flat_map(|(kind, versions)| {
                versions
                    .keys()
                    .map(move |api_version| format!("{}/{}", api_version, kind))
            })
            .collect();
        supported.sort();
        supported
    }

    pub fn dispatch(
        &self,
        api_version: &str,
        kind: &str,
        raw: &[u8],
    ) -> Result<Vec<Image>, AdmissionError> {
        let versions = self
            .handlers
            .get(kind)
            .ok_or_else(|| AdmissionError::UnsupportedKind {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })?;
        let handler =
            versions
                .get(api_version)
                .ok_or_else(|| AdmissionError::UnsupportedVersion {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                })?;

        debug!(api_version, kind, "Decoding workload");
        handler(raw)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::empty()
            .register::<Pod>()
            .register::<Job>()
            .register::<CronJob>()
            .register::<Deployment>()
            .register::<DaemonSet>()
            .register::<StatefulSet>()
            .register::<ReplicaSet>()
    }
}

fn extract<W: Workload>(raw: &[u8]) -> Result<Vec<Image>, AdmissionError> {
    let workload: W = serde_json::from_slice(raw).map_err(|e| {
        AdmissionError::BadRequest(format!("failed to decode {}: {}", W::KIND, e))
    })?;
    Ok(workload.images()?)
}
