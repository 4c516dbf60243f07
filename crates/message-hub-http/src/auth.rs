//! Auth header construction for outbound provider requests.
//!
//! Defaults to `Bearer` when `auth_type` is unset but an API key is present,
//! matching the fallback the payload template engine uses for an unset
//! provider.

use hmac::{Hmac, Mac};
use message_hub_domain::{AuthType, HttpChannelConfig};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Builds the header map to attach to an outbound request, given the
/// rendered body (HMAC signs over it).
pub fn build_headers(config: &HttpChannelConfig, body: &str) -> HashMap<String, String> {
    let mut headers = config.custom_headers.clone();
    headers
        .entry("Content-Type".to_string())
        .or_insert_with(|| "application/json".to_string());

    let auth_type = config.auth_type;
    match auth_type {
        AuthType::Bearer => {
            if let Some(key) = &config.api_key {
                headers.insert("Authorization".to_string(), format!("Bearer {key}"));
            }
        }
        AuthType::ApiKey => {
            if let Some(key) = &config.api_key {
                headers.insert("X-Api-Key".to_string(), key.clone());
            }
        }
        AuthType::Basic => {
            if let Some(key) = &config.api_key {
                let secret = config.api_secret.as_deref().unwrap_or_default();
                let encoded = base64_encode(&format!("{key}:{secret}"));
                headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
            }
        }
        AuthType::Hmac => {
            if let Some(secret) = &config.api_secret {
                let signature = sign_hmac(secret, body);
                headers.insert("X-Signature".to_string(), signature);
                if let Some(key) = &config.api_key {
                    headers.insert("X-Api-Key".to_string(), key.clone());
                }
            }
        }
    }

    headers
}

fn sign_hmac(secret: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn base64_encode(input: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_hub_domain::{CircuitBreakerSettings, ProviderType};
    use std::time::Duration;

    fn base_config(auth_type: AuthType) -> HttpChannelConfig {
        HttpChannelConfig {
            endpoint: "https://example.com/send".into(),
            api_key: Some("key123".into()),
            api_secret: Some("secret456".into()),
            custom_headers: HashMap::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            max_requests_per_second: 10,
            circuit_breaker: CircuitBreakerSettings::default(),
            provider: ProviderType::Generic,
            sender_id: None,
            custom_payload_template: None,
            auth_type,
        }
    }

    #[test]
    fn bearer_uses_authorization_header() {
        let headers = build_headers(&base_config(AuthType::Bearer), "{}");
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer key123");
    }

    #[test]
    fn api_key_uses_x_api_key_header() {
        let headers = build_headers(&base_config(AuthType::ApiKey), "{}");
        assert_eq!(headers.get("X-Api-Key").unwrap(), "key123");
        assert!(!headers.contains_key("Authorization"));
    }

    #[test]
    fn basic_base64_encodes_key_and_secret() {
        let headers = build_headers(&base_config(AuthType::Basic), "{}");
        assert_eq!(
            headers.get("Authorization").unwrap(),
            "Basic a2V5MTIzOnNlY3JldDQ1Ng=="
        );
    }

    #[test]
    fn hmac_signature_is_deterministic_for_same_body() {
        let config = base_config(AuthType::Hmac);
        let h1 = build_headers(&config, "{\"a\":1}");
        let h2 = build_headers(&config, "{\"a\":1}");
        assert_eq!(h1.get("X-Signature"), h2.get("X-Signature"));

        let h3 = build_headers(&config, "{\"a\":2}");
        assert_ne!(h1.get("X-Signature"), h3.get("X-Signature"));
    }

    #[test]
    fn content_type_defaults_but_respects_custom_headers() {
        let mut config = base_config(AuthType::Bearer);
        config
            .custom_headers
            .insert("Content-Type".to_string(), "application/custom".to_string());
        let headers = build_headers(&config, "{}");
        assert_eq!(headers.get("Content-Type").unwrap(), "application/custom");
    }
}
