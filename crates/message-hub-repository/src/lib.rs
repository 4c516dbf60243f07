//! The message repository: a narrow, tenant-scoped persistence capability
//! set, with an in-memory implementation for tests and an optional
//! Postgres-backed implementation for production (`postgres` feature).

mod error;
mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use error::RepositoryError;
pub use in_memory::InMemoryMessageRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresMessageRepository;

use async_trait::async_trait;
use message_hub_domain::{Message, MessageStatus};
use uuid::Uuid;

/// Optional filter applied to tenant-scoped listing queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub status: Option<MessageStatus>,
    pub limit: usize,
}

/// Storage-agnostic message persistence.
///
/// Every read is scoped to a tenant's `subscription_key`; the repository
/// itself does not enforce the status DAG (see [`MessageStatus`]) — it
/// trusts its single writer (the delivery worker, or the SMPP DLR
/// correlator) to apply legal transitions.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError>;

    /// Idempotent: re-applying the same `(id, status, external_message_id)`
    /// yields the same observable state.
    async fn update_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        external_message_id: Option<String>,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError>;

    async fn get_by_id_for_tenant(
        &self,
        id: Uuid,
        tenant_key: &str,
    ) -> Result<Option<Message>, RepositoryError>;

    async fn list_for_tenant(
        &self,
        tenant_key: &str,
        filter: ListFilter,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Atomically increments `retry_count` and returns the value after the
    /// increment, so the caller can compare it against a tenant's
    /// configured retry budget without a separate read-modify-write.
    async fn increment_retry_count(&self, id: Uuid) -> Result<u32, RepositoryError>;
}
