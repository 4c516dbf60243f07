//! Builds the provider-specific JSON body for an outbound SMS send.

use chrono::Utc;
use message_hub_domain::{HttpChannelConfig, ProviderType};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_SENDER: &str = "MessageHub";

/// Renders the outbound body for `config.provider`, falling back to
/// `Generic` (with a `tracing::warn!`) when a `Custom` template is absent or
/// fails to render.
pub fn render_payload(
    config: &HttpChannelConfig,
    message_id: Uuid,
    tenant_key: &str,
    recipient: &str,
    content: &str,
) -> Value {
    let sender = config.sender_id.as_deref().unwrap_or(DEFAULT_SENDER);

    match config.provider {
        ProviderType::Generic => generic_body(recipient, content, sender),
        ProviderType::Twilio => json!({
            "To": recipient,
            "From": sender,
            "Body": content,
        }),
        ProviderType::Vonage => json!({
            "api_key": config.api_key.clone().unwrap_or_default(),
            "api_secret": config.api_secret.clone().unwrap_or_default(),
            "to": recipient,
            "from": sender,
            "text": content,
            "type": "text",
        }),
        ProviderType::MessageBird => json!({
            "recipients": [recipient],
            "originator": sender,
            "body": content,
            "params": { "datacoding": "auto" },
        }),
        ProviderType::TextMagic => json!({
            "text": content,
            "phones": recipient,
            "from": sender,
        }),
        ProviderType::Custom => match &config.custom_payload_template {
            Some(template) => match render_custom(template, message_id, tenant_key, recipient, content, sender, config) {
                Some(value) => value,
                None => {
                    warn_custom_fallback(tenant_key, "template failed to render");
                    generic_body(recipient, content, sender)
                }
            },
            None => {
                warn_custom_fallback(tenant_key, "no custom_payload_template configured");
                generic_body(recipient, content, sender)
            }
        },
    }
}

fn generic_body(recipient: &str, content: &str, sender: &str) -> Value {
    json!({
        "to": recipient,
        "text": content,
        "from": sender,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

fn warn_custom_fallback(tenant_key: &str, reason: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(tenant = tenant_key, reason, "falling back to generic payload shape");
    #[cfg(not(feature = "tracing"))]
    let _ = (tenant_key, reason);
}

/// Substitutes `{{variable}}` placeholders in a user-supplied JSON template,
/// then parses the result. Returns `None` on any substitution target that
/// isn't valid JSON once filled in.
fn render_custom(
    template: &str,
    message_id: Uuid,
    tenant_key: &str,
    recipient: &str,
    content: &str,
    sender: &str,
    config: &HttpChannelConfig,
) -> Option<Value> {
    let rendered = template
        .replace("{{recipient}}", &escape(recipient))
        .replace("{{message}}", &escape(content))
        .replace("{{senderId}}", &escape(sender))
        .replace("{{apiKey}}", &escape(config.api_key.as_deref().unwrap_or("")))
        .replace("{{timestamp}}", &Utc::now().to_rfc3339())
        .replace("{{messageId}}", &message_id.to_string())
        .replace("{{tenantId}}", &escape(tenant_key));

    serde_json::from_str(&rendered).ok()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_hub_domain::CircuitBreakerSettings;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config(provider: ProviderType) -> HttpChannelConfig {
        HttpChannelConfig {
            endpoint: "https://example.com/send".into(),
            api_key: Some("key123".into()),
            api_secret: Some("secret456".into()),
            custom_headers: HashMap::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            max_requests_per_second: 10,
            circuit_breaker: CircuitBreakerSettings::default(),
            provider,
            sender_id: None,
            custom_payload_template: None,
            auth_type: message_hub_domain::AuthType::Bearer,
        }
    }

    #[test]
    fn generic_body_defaults_sender_to_message_hub() {
        let body = render_payload(&config(ProviderType::Generic), Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["to"], "+1555");
        assert_eq!(body["text"], "hi");
        assert_eq!(body["from"], "MessageHub");
    }

    #[test]
    fn twilio_body_uses_pascal_case_fields() {
        let body = render_payload(&config(ProviderType::Twilio), Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["To"], "+1555");
        assert_eq!(body["Body"], "hi");
    }

    #[test]
    fn vonage_body_includes_credentials() {
        let body = render_payload(&config(ProviderType::Vonage), Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["api_key"], "key123");
        assert_eq!(body["type"], "text");
    }

    #[test]
    fn message_bird_body_wraps_recipient_in_array() {
        let body = render_payload(&config(ProviderType::MessageBird), Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["recipients"][0], "+1555");
        assert_eq!(body["params"]["datacoding"], "auto");
    }

    #[test]
    fn custom_without_template_falls_back_to_generic() {
        let body = render_payload(&config(ProviderType::Custom), Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["to"], "+1555");
    }

    #[test]
    fn custom_with_valid_template_substitutes_variables() {
        let mut cfg = config(ProviderType::Custom);
        cfg.custom_payload_template =
            Some(r#"{"dest":"{{recipient}}","msg":"{{message}}"}"#.to_string());
        let body = render_payload(&cfg, Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["dest"], "+1555");
        assert_eq!(body["msg"], "hi");
    }

    #[test]
    fn custom_with_malformed_template_falls_back_to_generic() {
        let mut cfg = config(ProviderType::Custom);
        cfg.custom_payload_template = Some("not valid json {{recipient}}".to_string());
        let body = render_payload(&cfg, Uuid::new_v4(), "t", "+1555", "hi");
        assert_eq!(body["to"], "+1555");
    }
}
