//! Process configuration: a base file (TOML/YAML, selected by extension)
//! layered with `MSGHUB_`-prefixed environment overrides, following the
//! same `config`-crate layering most network services in the retrieval
//! pack reach for. Produced once at startup as an `Arc<HubConfig>` and
//! never mutated afterward; every component reads through the shared
//! snapshot rather than a global.

use message_hub_domain::TenantConfig;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Which queue transport the binary wires up. Durable broker support is a
/// named variant so the loader can validate it eagerly; only `InProcess`
/// has an implementation today.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueTransportKind {
    InProcess,
    DurableBroker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSettings {
    pub database_url: Option<String>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self { database_url: None }
    }
}

/// The full process configuration: bind address, persistence driver, queue
/// transport selection, and the tenant map keyed by `subscription_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default = "default_queue_transport")]
    pub queue_transport: QueueTransportKind,
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,
}

fn default_queue_transport() -> QueueTransportKind {
    QueueTransportKind::InProcess
}

impl HubConfig {
    /// Loads `path` (if it exists) as a base layer, then applies
    /// `MSGHUB_`-prefixed environment overrides with `__` as the nested-key
    /// separator (e.g. `MSGHUB_SERVER__BIND_ADDRESS`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MSGHUB")
                .separator("__")
                .try_parsing(true),
        );
        let raw = builder.build()?;
        Ok(raw.try_deserialize()?)
    }

    pub fn tenant(&self, subscription_key: &str) -> Option<&TenantConfig> {
        self.tenants.get(subscription_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        assert_eq!(ServerSettings::default().bind_address, "0.0.0.0:8080");
        assert_eq!(default_queue_transport(), QueueTransportKind::InProcess);
    }

    #[test]
    fn tenant_lookup_is_keyed_by_subscription_key() {
        let mut tenants = HashMap::new();
        tenants.insert(
            "demo-key".to_string(),
            TenantConfig {
                subscription_key: "demo-key".to_string(),
                name: "Demo".to_string(),
                http: None,
                smpp: None,
            },
        );
        let config = HubConfig {
            server: ServerSettings::default(),
            persistence: PersistenceSettings::default(),
            queue_transport: QueueTransportKind::InProcess,
            tenants,
        };

        assert!(config.tenant("demo-key").is_some());
        assert!(config.tenant("missing").is_none());
    }
}
