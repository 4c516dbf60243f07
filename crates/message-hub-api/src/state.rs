use message_hub_core::{HubConfig, SubmissionHandler};
use message_hub_repository::MessageRepository;
use std::sync::Arc;

/// Shared, cloneable handle axum passes to every handler. Cloning is cheap:
/// every field is already `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HubConfig>,
    pub submission: Arc<SubmissionHandler>,
    pub repository: Arc<dyn MessageRepository>,
}
