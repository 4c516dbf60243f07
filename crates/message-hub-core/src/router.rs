//! Dispatches a message to its configured channel and normalizes each
//! channel's own error type into [`HubError`], the single vocabulary the
//! delivery worker and submission handler reason about.

use message_hub_domain::{ChannelType, HubError, TenantConfig};
use message_hub_http::{HttpChannel, HttpSendError};
use message_hub_smpp::{DlrHook, SmppChannel, SmppSendError};
use uuid::Uuid;

pub struct SendOutcome {
    pub external_message_id: Option<String>,
}

/// Owns both channel implementations; constructed once at startup and
/// shared by the delivery worker.
pub struct ChannelRouter {
    http: HttpChannel,
    smpp: SmppChannel,
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self {
            http: HttpChannel::new(),
            smpp: SmppChannel::new(),
        }
    }

    pub async fn send(
        &self,
        channel_type: ChannelType,
        tenant: &TenantConfig,
        message_id: Uuid,
        recipient: &str,
        content: &str,
    ) -> Result<SendOutcome, HubError> {
        match channel_type {
            ChannelType::Http => {
                let config = tenant.http.as_ref().ok_or_else(|| HubError::ChannelNotConfigured {
                    tenant: tenant.subscription_key.clone(),
                    channel: "HTTP".to_string(),
                })?;
                self.http
                    .send(&tenant.subscription_key, config, message_id, recipient, content)
                    .await
                    .map(|outcome| SendOutcome {
                        external_message_id: outcome.external_message_id,
                    })
                    .map_err(map_http_error)
            }
            ChannelType::Smpp => {
                let config = tenant.smpp.as_ref().ok_or_else(|| HubError::ChannelNotConfigured {
                    tenant: tenant.subscription_key.clone(),
                    channel: "SMPP".to_string(),
                })?;
                self.smpp
                    .send(&tenant.subscription_key, config, message_id, recipient, content)
                    .await
                    .map(|outcome| SendOutcome {
                        external_message_id: outcome.external_message_id,
                    })
                    .map_err(map_smpp_error)
            }
        }
    }

    pub fn sweep_idle(&self, idle_after: std::time::Duration, dlr_retention: std::time::Duration) {
        self.http.sweep_idle_rate_limiters(idle_after);
        self.smpp.sweep_dlr_correlations(dlr_retention);
    }

    /// Registers the callback run whenever an SMPP `deliver_sm` receipt
    /// resolves a correlation. Must be set before the first SMPP send.
    pub fn set_smpp_dlr_hook(&self, hook: DlrHook) {
        self.smpp.set_dlr_hook(hook);
    }
}

fn map_http_error(err: HttpSendError) -> HubError {
    match err {
        HttpSendError::Request(msg) => HubError::TransientNetwork(msg),
        HttpSendError::Timeout => HubError::TransientNetwork("request timed out".to_string()),
        HttpSendError::CircuitOpen => HubError::CircuitOpen("http".to_string()),
        HttpSendError::RateLimited => HubError::RateLimited("http".to_string()),
        HttpSendError::ProviderStatus { status, body } if is_retryable_status(status) => {
            HubError::TransientNetwork(format!("HTTP {status}: {body}"))
        }
        HttpSendError::ProviderStatus { status, body } => {
            HubError::PermanentProvider(format!("HTTP {status}: {body}"))
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

fn map_smpp_error(err: SmppSendError) -> HubError {
    match err {
        SmppSendError::Transient(msg) => HubError::TransientNetwork(msg),
        SmppSendError::Permanent(msg) => HubError::PermanentProvider(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_provider_status_splits_transient_from_permanent() {
        assert!(matches!(
            map_http_error(HttpSendError::ProviderStatus { status: 503, body: String::new() }),
            HubError::TransientNetwork(_)
        ));
        assert!(matches!(
            map_http_error(HttpSendError::ProviderStatus { status: 400, body: String::new() }),
            HubError::PermanentProvider(_)
        ));
    }

    #[test]
    fn http_circuit_and_rate_limit_map_to_named_variants() {
        assert!(matches!(map_http_error(HttpSendError::CircuitOpen), HubError::CircuitOpen(_)));
        assert!(matches!(map_http_error(HttpSendError::RateLimited), HubError::RateLimited(_)));
    }

    #[test]
    fn smpp_transient_and_permanent_map_through() {
        assert!(matches!(
            map_smpp_error(SmppSendError::Transient("x".into())),
            HubError::TransientNetwork(_)
        ));
        assert!(matches!(
            map_smpp_error(SmppSendError::Permanent("x".into())),
            HubError::PermanentProvider(_)
        ));
    }
}
