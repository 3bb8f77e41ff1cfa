use crate::admission::WorkloadReview;
use crate::config::{self, BackendProtocol};
use crate::secret_string::SecretString;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::AUTHORIZATION;
use reqwest::{Certificate, Client};
use serde::Serialize;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Out-of-band receiver of the images found in admitted workloads.
///
/// Delivery never influences the admission decision.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    fn send(&self, review: &WorkloadReview) -> BoxFuture<'static, Result<()>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    #[serde(flatten)]
    pub review: WorkloadReview,
    pub observed_at: DateTime<Utc>,
}

pub struct HttpBackend {
    client: Client,
    url: String,
    token: Option<SecretString>,
}

impl HttpBackend {
    pub fn new(client: Client, url: String, token: Option<SecretString>) -> Self {
        Self { client, url, token }
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn send(&self, review: &WorkloadReview) -> BoxFuture<'static, Result<()>> {
        let report = ImageReport {
            review: review.clone(),
            observed_at: Utc::now(),
        };
        let mut request = self.client.post(&self.url).json(&report);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token.bearer());
        }
        let url = self.url.clone();

        async move {
            debug!("Sending {} images to {}", report.review.images.len(), url);
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send image report to {}", url))?;

            if !response.status().is_success() {
                anyhow::bail!(
                    "Backend {} returned error status {} for image report",
                    url,
                    response.status()
                );
            }
            Ok(())
        }
        .boxed()
    }
}

pub fn create_client(config: &config::Backend) -> Result<Client> {
    info!("Initializing backend HTTP client");
    // System certificates are loaded automatically with rustls-tls-native-roots
    let mut client_builder =
        Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

    for file_path in &config.ca_certificate_paths {
        let file_content = fs::read(file_path)
            .with_context(|| format!("Failed to read file {}", file_path.display()))?;
        let cert = Certificate::from_pem(&file_content).context("Failed to parse certificate")?;
        client_builder = client_builder.add_root_certificate(cert);
    }

    client_builder
        .build()
        .context("Failed to build HTTP client")
}

pub fn create_backend(config: &config::Backend) -> Result<Option<Arc<dyn Backend>>> {
    match config.protocol {
        BackendProtocol::None => {
            info!("No backend configured, image reports are only logged");
            Ok(None)
        }
        BackendProtocol::Http => {
            let url = config
                .url
                .clone()
                .context("Backend protocol http requires a url")?;
            info!("Reporting images to {}", url);
            let client = create_client(config)?;
            Ok(Some(Arc::new(HttpBackend::new(
                client,
                url,
                config.token.clone(),
            ))))
        }
    }
}

/// Sends the review on a background task; failures are only logged.
pub fn spawn_delivery(backend: Arc<dyn Backend>, review: &WorkloadReview) {
    let delivery = backend.send(review);
    let uid = review.uid.clone();
    tokio::spawn(async move {
        if let Err(e) = delivery.await {
            warn!(uid = %uid, backend = backend.name(), "Failed to deliver image report: {:?}", e);
        }
    });
}
