use crate::image_reference::{Image, ParseError};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use serde::de::DeserializeOwned;

/// A Kubernetes object that embeds a pod template somewhere in its spec.
///
/// The API version and kind used for dispatch come from the
/// [`k8s_openapi::Resource`] constants of the implementing type.
pub trait Workload
where
    Self: k8s_openapi::Resource + DeserializeOwned + 'static,
{
    fn pod_spec(&self) -> Option<&PodSpec>;

    fn images(&self) -> Result<Vec<Image>, ParseError> {
        self.pod_spec()
            .map(collect_images)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl Workload for Pod {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref()
    }
}

impl Workload for Job {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    }
}

//https://kubernetes.io/docs/reference/kubernetes-api/workload-resources/cron-job-v1/#CronJobSpec
impl Workload for CronJob {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec
            .as_ref()
            .and_then(|s| s.job_template.spec.as_ref())
            .and_then(|s| s.template.spec.as_ref())
    }
}

impl Workload for Deployment {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    }
}

impl Workload for DaemonSet {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    }
}

impl Workload for StatefulSet {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    }
}

//https://kubernetes.io/docs/reference/kubernetes-api/workload-resources/replica-set-v1/#ReplicaSetSpec
impl Workload for ReplicaSet {
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec
            .as_ref()
            .and_then(|s| s.template.as_ref())
            .and_then(|t| t.spec.as_ref())
    }
}

/// Parses the image of every init container, then of every regular container,
/// each list in spec order. Ephemeral containers are ignored.
///
/// A container without an image yields a zero-valued [`Image`] so the output
/// always has one entry per container.
pub fn collect_images(spec: &PodSpec) -> Result<Vec<Image>, ParseError> {
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .map(container_image)
        .collect()
}

fn container_image(container: &Container) -> Result<Image, ParseError> {
    Image::parse(container.image.as_deref().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod_template(init: &[&str], containers: &[&str]) -> serde_json::Value {
        let to_containers = |images: &[&str]| {
            images
                .iter()
                .enumerate()
                .map(|(i, image)| json!({ "name": format!("c{}", i), "image": image }))
                .collect::<Vec<_>>()
        };
        json!({
            "initContainers": to_containers(init),
            "containers": to_containers(containers),
        })
    }

    fn image(registry: &str, repository: &str, tag: &str) -> Image {
        Image {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_images_init_containers_first() {
        let spec: PodSpec = serde_json::from_value(pod_template(
            &["busybox:1.28"],
            &["ghcr.io/stefanprodan/podinfo:6.3.6"],
        ))
        .unwrap();

        let images = collect_images(&spec).unwrap();
        assert_eq!(
            images,
            vec![
                image("docker.io", "busybox", "1.28"),
                image("ghcr.io", "stefanprodan/podinfo", "6.3.6"),
            ]
        );
    }

    #[test]
    fn test_collect_images_keeps_order_and_duplicates() {
        let spec: PodSpec = serde_json::from_value(pod_template(
            &["alpine:3", "busybox"],
            &["nginx", "redis:7", "nginx"],
        ))
        .unwrap();

        let images = collect_images(&spec).unwrap();
        assert_eq!(images.len(), 5);
        let repositories: Vec<_> = images.iter().map(|i| i.repository.as_str()).collect();
        assert_eq!(
            repositories,
            vec!["alpine", "busybox", "nginx", "redis", "nginx"]
        );
    }

    #[test]
    fn test_collect_images_missing_image_is_zero_valued() {
        let spec: PodSpec = serde_json::from_value(json!({
            "containers": [{ "name": "no-image" }, { "name": "web", "image": "nginx" }]
        }))
        .unwrap();

        let images = collect_images(&spec).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0], Image::default());
        assert_eq!(images[1], image("docker.io", "nginx", "latest"));
    }

    #[test]
    fn test_collect_images_ignores_ephemeral_containers() {
        let spec: PodSpec = serde_json::from_value(json!({
            "containers": [{ "name": "web", "image": "nginx" }],
            "ephemeralContainers": [{ "name": "debug", "image": "busybox" }]
        }))
        .unwrap();

        assert_eq!(collect_images(&spec).unwrap().len(), 1);
    }

    #[test]
    fn test_collect_images_propagates_malformed_digest() {
        let spec: PodSpec = serde_json::from_value(pod_template(&[], &["nginx@sha256"])).unwrap();
        assert!(collect_images(&spec).is_err());
    }

    #[test]
    fn test_cron_job_uses_job_template() {
        let cron_job: CronJob = serde_json::from_value(json!({
            "apiVersion": "batch/v1",
            "kind": "CronJob",
            "metadata": { "name": "backup" },
            "spec": {
                "schedule": "*/5 * * * *",
                "jobTemplate": {
                    "spec": { "template": { "spec": pod_template(&[], &["restic/restic:0.17"]) } }
                }
            }
        }))
        .unwrap();

        assert_eq!(
            cron_job.images().unwrap(),
            vec![image("docker.io", "restic/restic", "0.17")]
        );
    }

    #[test]
    fn test_replica_set_without_template_has_no_images() {
        let replica_set: ReplicaSet = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": { "name": "web" },
            "spec": { "selector": { "matchLabels": { "app": "web" } } }
        }))
        .unwrap();

        assert!(replica_set.pod_spec().is_none());
        assert!(replica_set.images().unwrap().is_empty());
    }

    #[test]
    fn test_resource_constants() {
        assert_eq!(<Pod as k8s_openapi::Resource>::API_VERSION, "v1");
        assert_eq!(<CronJob as k8s_openapi::Resource>::API_VERSION, "batch/v1");
        assert_eq!(<StatefulSet as k8s_openapi::Resource>::API_VERSION, "apps/v1");
        assert_eq!(<DaemonSet as k8s_openapi::Resource>::KIND, "DaemonSet");
    }
}
