use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::cluster::DEFAULT_NODES_PREFIX;
use crate::ingest::{DEFAULT_IMAGE_BUILDER, DEFAULT_REGISTRY};
use crate::jobs::RetryPolicy;
use crate::registry::DEFAULT_INDEX_KEY;
use crate::scheduler::Weights;

/// Backend for the dock registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    /// Process-local; for development only. State is lost on restart.
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(anyhow!("unknown store '{other}', expected redis or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub store: StoreKind,
    pub redis_url: String,
    pub index_key: String,
    pub weights: Weights,
    pub prev_dock_override: bool,
    pub image_builder: String,
    pub registry: String,
    pub consul_url: String,
    pub swarm_nodes_prefix: String,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let listen_addr = var("DOCKYARD_LISTEN_ADDR", "127.0.0.1:8080")
            .parse()
            .context("DOCKYARD_LISTEN_ADDR")?;

        let log_level = var("DOCKYARD_LOG_LEVEL", "info");

        let store = var("DOCKYARD_STORE", "redis").parse()?;
        let redis_url = var("REDIS_URL", "redis://127.0.0.1:6379");
        let index_key = var("DOCKYARD_INDEX_KEY", DEFAULT_INDEX_KEY);

        let defaults = Weights::default();
        let weights = Weights {
            build: parse_or(&lookup, "DOCKYARD_BUILD_WEIGHT", defaults.build)?,
            container: parse_or(&lookup, "DOCKYARD_CONTAINER_WEIGHT", defaults.container)?,
            history: parse_or(&lookup, "DOCKYARD_HISTORY_WEIGHT", defaults.history)?,
        };
        if let Err(e) = weights.validate() {
            bail!("invalid scoring weights: {e}");
        }

        let prev_dock_override = lookup("DOCKYARD_PREV_DOCK_OVERRIDE")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let image_builder = var("DOCKYARD_IMAGE_BUILDER", DEFAULT_IMAGE_BUILDER);
        let registry = var("DOCKYARD_REGISTRY", DEFAULT_REGISTRY);
        let consul_url = var("DOCKYARD_CONSUL_URL", "http://127.0.0.1:8500");
        let swarm_nodes_prefix = var("DOCKYARD_SWARM_NODES_PREFIX", DEFAULT_NODES_PREFIX);

        let default_retry = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "DOCKYARD_JOB_MAX_ATTEMPTS", default_retry.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(
                &lookup,
                "DOCKYARD_JOB_BACKOFF_MS",
                default_retry.base_delay.as_millis() as u64,
            )?),
            ..default_retry
        };

        Ok(Self {
            listen_addr,
            log_level,
            store,
            redis_url,
            index_key,
            weights,
            prev_dock_override,
            image_builder,
            registry,
            consul_url,
            swarm_nodes_prefix,
            retry,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name}={raw} is not valid")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.store, StoreKind::Redis);
        assert_eq!(config.index_key, "dockyard:docks");
        assert_eq!(config.weights, Weights::default());
        assert!(!config.prev_dock_override);
        assert_eq!(config.image_builder, "image-builder");
        assert_eq!(config.registry, "registry.runnable.com");
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("DOCKYARD_STORE", "memory"),
            ("DOCKYARD_HISTORY_WEIGHT", "2.5"),
            ("DOCKYARD_PREV_DOCK_OVERRIDE", "true"),
            ("DOCKYARD_JOB_MAX_ATTEMPTS", "3"),
        ])
        .unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.weights.history, 2.5);
        assert!(config.prev_dock_override);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_with(&[("DOCKYARD_BUILD_WEIGHT", "-1")]).is_err());
        assert!(config_with(&[("DOCKYARD_CONTAINER_WEIGHT", "lots")]).is_err());
        assert!(config_with(&[("DOCKYARD_STORE", "postgres")]).is_err());
        assert!(config_with(&[("DOCKYARD_LISTEN_ADDR", "nowhere")]).is_err());
    }
}
