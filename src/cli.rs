//! # Command Line Interface
//!
//! Loads secret fixtures and pod manifests from JSON, registers the pods with
//! the configured manager and resolves every secret they reference.

use crate::config::{AppConfig, ManagerMode};
use crate::domain::{ObjectKey, Pod, Secret};
use crate::secrets::{new_secret_manager, InMemorySecretSource, SecretManager};
use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "secret-cache")]
#[command(about = "Pod-scoped secret cache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Manager mode override (caching or simple)
    #[arg(long, global = true)]
    pub mode: Option<ManagerMode>,

    /// TTL override in seconds
    #[arg(long, global = true)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register pods and resolve every secret they reference
    Resolve {
        /// JSON array of secrets served by the in-memory source
        #[arg(long)]
        secrets: PathBuf,

        /// JSON array of pod manifests
        #[arg(long)]
        pods: PathBuf,
    },
}

/// Outcome of resolving one referenced secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub pod: ObjectKey,
    pub secret: ObjectKey,
    /// Resource version and data keys on success, the error text otherwise.
    pub outcome: std::result::Result<(u64, Vec<String>), String>,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Ok((version, keys)) => write!(
                f,
                "{} -> {} (version {}, keys: {})",
                self.pod,
                self.secret,
                version,
                keys.join(", ")
            ),
            Err(message) => write!(f, "{} -> {} error: {}", self.pod, self.secret, message),
        }
    }
}

/// Apply command line overrides on top of the loaded configuration.
pub fn apply_overrides(cli: &Cli, config: &mut AppConfig) -> crate::Result<()> {
    if let Some(mode) = cli.mode {
        config.cache.mode = mode;
    }
    if let Some(ttl) = cli.ttl_seconds {
        config.cache.ttl_seconds = ttl;
    }
    config.validate()
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<Vec<Resolution>> {
    match cli.command {
        Commands::Resolve { secrets, pods } => {
            let secrets: Vec<Secret> = read_json(&secrets)?;
            let pods: Vec<Pod> = read_json(&pods)?;

            let source = Arc::new(InMemorySecretSource::new());
            for secret in secrets {
                source.insert(secret).await;
            }

            let manager = new_secret_manager(&config.cache, source);
            Ok(resolve_pods(manager.as_ref(), &pods).await)
        }
    }
}

/// Register `pods`, read each referenced secret concurrently, then unregister them.
pub async fn resolve_pods(manager: &dyn SecretManager, pods: &[Pod]) -> Vec<Resolution> {
    for pod in pods {
        manager.register_pod(pod);
    }

    let reads = pods.iter().flat_map(|pod| {
        pod.secret_keys().into_iter().map(move |key| async move {
            let outcome = match manager.get_secret(&key.namespace, &key.name).await {
                Ok(secret) => Ok((secret.version(), secret.data.keys().cloned().collect())),
                Err(e) => Err(e.to_string()),
            };
            Resolution { pod: pod.key(), secret: key, outcome }
        })
    });
    let resolutions = join_all(reads).await;

    for pod in pods {
        manager.unregister_pod(pod);
    }
    resolutions
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
