mod auth;
mod dto;
mod error;
mod handlers;
mod state;

pub use auth::{require_subscription_key, TenantKey, SUBSCRIPTION_KEY_HEADER};
pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::{middleware, Router};

/// Builds the axum router: the subscription-key middleware runs ahead of
/// every handler, per the header check required on all five endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/api/message", post(handlers::submit_message))
        .route("/api/messages", post(handlers::submit_batch))
        .route("/api/messages/history", get(handlers::message_history))
        .route("/api/messages/{id}/status", get(handlers::message_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_subscription_key))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use message_hub_core::{HubConfig, PersistenceSettings, QueueTransportKind, ServerSettings, SubmissionHandler};
    use message_hub_domain::TenantConfig;
    use message_hub_queue::InProcessQueueTransport;
    use message_hub_repository::InMemoryMessageRepository;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state() -> AppState {
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
        let config = Arc::new(HubConfig {
            server: ServerSettings::default(),
            persistence: PersistenceSettings::default(),
            queue_transport: QueueTransportKind::InProcess,
            tenants,
        });
        let repository = Arc::new(InMemoryMessageRepository::new());
        let queue = Arc::new(InProcessQueueTransport::new(8, 3));
        let submission = Arc::new(SubmissionHandler::new(config.clone(), repository.clone(), queue));

        AppState { config, submission, repository }
    }

    #[tokio::test]
    async fn ping_requires_no_body_but_still_requires_auth_header() {
        let app = router(test_state());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("ocp-apim-subscription-key", "demo-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_subscription_key_is_rejected() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/messages/history")
                    .header("ocp-apim-subscription-key", "not-a-real-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_without_configured_channel_returns_400() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/message")
                    .header("ocp-apim-subscription-key", "demo-key")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"recipient":"+15551234567","message":"hi","channelType":"HTTP"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_message_status_returns_404() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/messages/{}/status", Uuid::new_v4()))
                    .header("ocp-apim-subscription-key", "demo-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
