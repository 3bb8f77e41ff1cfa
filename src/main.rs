use crate::config::{Cli, Config};
use crate::dispatch::DispatchTable;
use crate::policy::AllowAll;
use crate::state::AppState;
use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod admission;
mod backend;
mod config;
mod dispatch;
mod error;
mod image_reference;
mod policy;
mod secret_string;
mod state;
mod webserver;
mod workload;

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting kube-image-admission {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    let addr = config.socket_addr()?;

    let dispatch = DispatchTable::default();
    info!("Supported workloads: {}", dispatch.supported().join(", "));

    let backend = backend::create_backend(&config.backend)?;
    let state = AppState::new(dispatch, Arc::new(AllowAll), backend);
    let app = webserver::create_app(state);

    match (&config.tls.cert_file, &config.tls.key_file) {
        (Some(cert_file), Some(key_file)) if config.tls.enabled => {
            let tls = RustlsConfig::from_pem_file(cert_file, key_file)
                .await
                .with_context(|| {
                    format!(
                        "Unable to load cert {} or key {}",
                        cert_file.display(),
                        key_file.display()
                    )
                })?;
            info!("Starting webserver on {} with TLS", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            info!("Starting webserver on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
