//! Per-tenant channel configuration, loaded once at startup and read-only
//! thereafter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP SMS provider whose payload shape the template engine should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Generic,
    Twilio,
    Vonage,
    MessageBird,
    TextMagic,
    Custom,
}

/// How the HTTP channel authenticates outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Bearer,
    ApiKey,
    Basic,
    Hmac,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    #[serde(with = "duration_secs")]
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Tenant-scoped HTTP channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default)]
    pub custom_headers: std::collections::HashMap<String, String>,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    pub max_retries: usize,
    pub max_requests_per_second: usize,
    pub circuit_breaker: CircuitBreakerSettings,
    pub provider: ProviderType,
    pub sender_id: Option<String>,
    /// Required iff `provider == ProviderType::Custom`.
    pub custom_payload_template: Option<String>,
    pub auth_type: AuthType,
}

/// How the SMPP client binds to the SMSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmppBindType {
    Transceiver,
    Transmitter,
    Receiver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    pub min_connections: usize,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    pub recovery_delay_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            idle_timeout_secs: 300,
            connect_timeout: Duration::from_secs(10),
            recovery_delay_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSettings {
    pub max_messages_per_second: u32,
    pub burst: u32,
    pub window_ms: u64,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            max_messages_per_second: 10,
            burst: 20,
            window_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlrSettings {
    pub enabled: bool,
    pub dlr_mask: u8,
    pub retention_days: u32,
}

impl Default for DlrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dlr_mask: 1,
            retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottlingSettings {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for ThrottlingSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedMessageSettings {
    pub max_retries: u32,
    pub retry_delay_minutes: Vec<u32>,
    pub dead_letter_after_days: u32,
}

impl Default for FailedMessageSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_minutes: vec![1, 5, 30],
            dead_letter_after_days: 3,
        }
    }
}

/// Tenant-scoped SMPP channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmppChannelConfig {
    pub host: String,
    pub port: u16,
    pub system_id: String,
    pub password: String,
    pub source_address: String,
    pub bind_type: SmppBindType,
    #[serde(default)]
    pub use_tls: bool,
    pub enquire_link_interval_ms: u64,
    pub inactivity_timeout_ms: u64,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub rate: RateSettings,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub delivery_receipt: DlrSettings,
    #[serde(default)]
    pub throttling: ThrottlingSettings,
    #[serde(default)]
    pub failed_message: FailedMessageSettings,
}

/// A tenant's full channel configuration. At least one of `http`/`smpp` must
/// be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub subscription_key: String,
    pub name: String,
    pub http: Option<HttpChannelConfig>,
    pub smpp: Option<SmppChannelConfig>,
}

impl TenantConfig {
    /// Whether this tenant has the given channel configured.
    pub fn supports(&self, channel: crate::ChannelType) -> bool {
        match channel {
            crate::ChannelType::Http => self.http.is_some(),
            crate::ChannelType::Smpp => self.smpp.is_some(),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_supports_only_configured_channels() {
        let tenant = TenantConfig {
            subscription_key: "demo".into(),
            name: "Demo".into(),
            http: Some(HttpChannelConfig {
                endpoint: "https://example.com".into(),
                api_key: None,
                api_secret: None,
                custom_headers: Default::default(),
                timeout: Duration::from_secs(5),
                max_retries: 1,
                max_requests_per_second: 10,
                circuit_breaker: CircuitBreakerSettings::default(),
                provider: ProviderType::Generic,
                sender_id: None,
                custom_payload_template: None,
                auth_type: AuthType::Bearer,
            }),
            smpp: None,
        };

        assert!(tenant.supports(crate::ChannelType::Http));
        assert!(!tenant.supports(crate::ChannelType::Smpp));
    }
}
