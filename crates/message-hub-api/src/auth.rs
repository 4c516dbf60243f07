//! Subscription-key authentication: every route requires a valid
//! `ocp-apim-subscription-key` header, checked before the handler runs.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

pub const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";

/// The tenant's subscription key, inserted into request extensions once
/// validated so handlers don't re-parse the header.
#[derive(Debug, Clone)]
pub struct TenantKey(pub String);

pub async fn require_subscription_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let key = request
        .headers()
        .get(SUBSCRIPTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(key) = key else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if state.config.tenant(&key).is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(TenantKey(key));
    Ok(next.run(request).await)
}
