//! The five endpoints in `SPEC_FULL.md` §6.

use crate::auth::TenantKey;
use crate::dto::{
    HistoryQuery, MessageStatusResponse, SubmitBatchRequest, SubmitBatchResponse,
    SubmitMessageRequest, SubmitMessageResponse,
};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use message_hub_core::SubmitRequest;
use message_hub_domain::MessageStatus;
use message_hub_repository::ListFilter;
use uuid::Uuid;

pub async fn ping() -> &'static str {
    "Service is alive"
}

pub async fn submit_message(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantKey>,
    Json(body): Json<SubmitMessageRequest>,
) -> Result<Json<SubmitMessageResponse>, ApiError> {
    let result = state
        .submission
        .submit(
            &tenant.0,
            SubmitRequest {
                recipient: body.recipient,
                content: body.message,
                channel_type: body.channel_type,
            },
        )
        .await?;

    Ok(Json(SubmitMessageResponse::from(result)))
}

pub async fn submit_batch(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantKey>,
    Json(body): Json<SubmitBatchRequest>,
) -> Result<Json<SubmitBatchResponse>, ApiError> {
    let requests = body
        .messages
        .into_iter()
        .map(|m| SubmitRequest {
            recipient: m.recipient,
            content: m.message,
            channel_type: m.channel_type,
        })
        .collect();

    let result = state.submission.submit_batch(&tenant.0, requests).await?;
    Ok(Json(SubmitBatchResponse::from(result)))
}

pub async fn message_status(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantKey>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageStatusResponse>, ApiError> {
    let message = state
        .repository
        .get_by_id_for_tenant(id, &tenant.0)
        .await
        .map_err(|e| ApiError::from(message_hub_domain::HubError::Repository(e.to_string())))?
        .ok_or(ApiError::from(message_hub_domain::HubError::MessageNotFound(id)))?;

    Ok(Json(MessageStatusResponse::from(message)))
}

pub async fn message_history(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantKey>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageStatusResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(ApiError::from)?;

    let filter = ListFilter {
        status,
        limit: query.limit.unwrap_or(50),
    };

    let messages = state
        .repository
        .list_for_tenant(&tenant.0, filter)
        .await
        .map_err(|e| ApiError::from(message_hub_domain::HubError::Repository(e.to_string())))?;

    Ok(Json(messages.into_iter().map(MessageStatusResponse::from).collect()))
}

fn parse_status(raw: &str) -> Result<MessageStatus, message_hub_domain::HubError> {
    match raw {
        "Queued" => Ok(MessageStatus::Queued),
        "Processing" => Ok(MessageStatus::Processing),
        "Sent" => Ok(MessageStatus::Sent),
        "Delivered" => Ok(MessageStatus::Delivered),
        "Failed" => Ok(MessageStatus::Failed),
        other => Err(message_hub_domain::HubError::Validation(format!(
            "unknown status filter: {other}"
        ))),
    }
}
