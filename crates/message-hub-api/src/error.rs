//! Maps `HubError` to the status codes in `SPEC_FULL.md` §6: a thin,
//! explicit mapping layer rather than a blanket catch-all, in the same
//! spirit as the teacher's wrapper error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use message_hub_domain::HubError;
use serde_json::json;

pub struct ApiError(pub HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HubError::Validation(_) | HubError::UnknownChannel(_) | HubError::ChannelNotConfigured { .. } => {
                StatusCode::BAD_REQUEST
            }
            HubError::UnknownTenant(_) => StatusCode::UNAUTHORIZED,
            HubError::MessageNotFound(_) => StatusCode::NOT_FOUND,
            HubError::Configuration(_)
            | HubError::TransientNetwork(_)
            | HubError::RateLimited(_)
            | HubError::CircuitOpen(_)
            | HubError::PermanentProvider(_)
            | HubError::QueuePublishFailed
            | HubError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "errorMessage": self.0.to_string() }))).into_response()
    }
}
