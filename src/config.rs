use crate::secret_string::SecretString;
use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use regex::Regex;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::{env, fs, path::Path};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default)]
    pub tls: Tls,
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    #[serde(default)]
    pub enabled: bool,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProtocol {
    #[default]
    None,
    Http,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    #[serde(default)]
    pub protocol: BackendProtocol,
    pub url: Option<String>,
    pub token: Option<SecretString>,
    #[serde(default)]
    pub ca_certificate_paths: Vec<PathBuf>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            protocol: BackendProtocol::None,
            url: None,
            token: None,
            ca_certificate_paths: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            tls: Tls::default(),
            backend: Backend::default(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    5
}

/// Command line flags. Each falls back to its `AG_*` environment variable and,
/// when given, wins over the value from the config file.
#[derive(Debug, Default, Parser)]
#[command(name = "kube-image-admission")]
#[command(about = "Admission webhook that extracts container image references from workloads")]
#[command(version)]
pub struct Cli {
    /// Config file location
    #[arg(long = "config", env = "AG_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Server listen address
    #[arg(long, env = "AG_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Serve the webhook over TLS
    #[arg(long, env = "AG_TLS_ENABLED", num_args = 0..=1, default_missing_value = "true")]
    pub tls_enabled: Option<bool>,

    /// TLS certificate to serve
    #[arg(long, env = "AG_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key
    #[arg(long, env = "AG_TLS_KEY")]
    pub tls_key: Option<PathBuf>,
}

impl Config {
    /// Loads the `--config` file if given, otherwise starts from defaults,
    /// then overlays the command line flags and validates.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config_file {
            Some(path) => load_config(path)?,
            None => {
                info!("No config file given, using default configuration");
                Config::default()
            }
        };
        config.apply_flags(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_flags(&mut self, cli: &Cli) {
        if let Some(addr) = &cli.listen_address {
            self.listen_address = addr.clone();
        }
        if let Some(enabled) = cli.tls_enabled {
            self.tls.enabled = enabled;
        }
        if let Some(cert) = &cli.tls_cert {
            self.tls.cert_file = Some(cert.clone());
        }
        if let Some(key) = &cli.tls_key {
            self.tls.key_file = Some(key.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.tls.enabled {
            ensure!(self.tls.cert_file.is_some(), "must supply certificate file");
            ensure!(self.tls.key_file.is_some(), "must supply private key file");
        }
        if self.backend.protocol == BackendProtocol::Http && self.backend.url.is_none() {
            bail!("backend protocol http requires a url");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address
            .parse()
            .with_context(|| format!("Invalid listen address {}", self.listen_address))
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    info!("Loading config from file {}", path.as_ref().display());
    let yaml_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let expanded = expand_env_vars(&yaml_str)?;

    let config = serde_yaml_ng::from_str(&expanded)
        .context("Failed to parse YAML config after environment variable expansion")?;

    Ok(config)
}

/// Replaces `${VAR}` placeholders with environment variables values.
/// Returns an error naming every missing variable.
fn expand_env_vars(input: &str) -> Result<String> {
    let re =
        Regex::new(r"\$\{([^}]+)}").context("Invalid regex pattern for env var substitution")?;

    let mut missing = Vec::new();
    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| {
            missing.push(var_name.to_string());
            String::new()
        })
    });

    if !missing.is_empty() {
        bail!("Missing environment variable: {}", missing.join(", "));
    }
    Ok(result.into_owned())
}
