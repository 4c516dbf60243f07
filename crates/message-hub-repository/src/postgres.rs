//! Postgres-backed repository. Queries are built with `sqlx::query`/`query_as`
//! at runtime rather than the `query!` compile-time macros, since this
//! workspace is built without a live `DATABASE_URL` available to check
//! against.

use crate::{ListFilter, MessageRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use message_hub_domain::{ChannelType, Message, MessageStatus};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// A `sqlx::PgPool`-backed [`MessageRepository`].
///
/// Expects a `messages` table matching the shape documented in
/// `SPEC_FULL.md` §6, with indexes on `(subscription_key, created_at desc)`
/// and `(status, created_at)`.
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `messages` table and its indexes if absent. Intended for
    /// local development and test fixtures; production deployments should
    /// run migrations out of band.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id                   UUID PRIMARY KEY,
                subscription_key     TEXT NOT NULL,
                content              TEXT NOT NULL,
                recipient            TEXT NOT NULL,
                channel_type         TEXT NOT NULL,
                status               TEXT NOT NULL,
                created_at           TIMESTAMPTZ NOT NULL,
                updated_at           TIMESTAMPTZ NOT NULL,
                external_message_id  TEXT,
                error_message        TEXT,
                retry_count          INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS messages_tenant_created_idx \
             ON messages (subscription_key, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS messages_status_created_idx \
             ON messages (status, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<Message, RepositoryError> {
        let channel_type: String = row.try_get("channel_type")?;
        let status: String = row.try_get("status")?;
        Ok(Message {
            id: row.try_get("id")?,
            subscription_key: row.try_get("subscription_key")?,
            content: row.try_get("content")?,
            recipient: row.try_get("recipient")?,
            channel_type: ChannelType::parse(&channel_type)
                .unwrap_or(ChannelType::Http),
            status: parse_status(&status),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            external_message_id: row.try_get("external_message_id")?,
            error_message: row.try_get("error_message")?,
            retry_count: row.try_get::<i32, _>("retry_count")? as u32,
        })
    }
}

fn status_to_str(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Queued => "QUEUED",
        MessageStatus::Processing => "PROCESSING",
        MessageStatus::Sent => "SENT",
        MessageStatus::Delivered => "DELIVERED",
        MessageStatus::Failed => "FAILED",
    }
}

fn parse_status(s: &str) -> MessageStatus {
    match s {
        "PROCESSING" => MessageStatus::Processing,
        "SENT" => MessageStatus::Sent,
        "DELIVERED" => MessageStatus::Delivered,
        "FAILED" => MessageStatus::Failed,
        _ => MessageStatus::Queued,
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, subscription_key, content, recipient, channel_type, status,
                 created_at, updated_at, external_message_id, error_message, retry_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(message.id)
        .bind(&message.subscription_key)
        .bind(&message.content)
        .bind(&message.recipient)
        .bind(message.channel_type.to_string())
        .bind(status_to_str(message.status))
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(&message.external_message_id)
        .bind(&message.error_message)
        .bind(message.retry_count as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        external_message_id: Option<String>,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE messages
            SET status = $2,
                external_message_id = COALESCE(external_message_id, $3),
                error_message = COALESCE($4, error_message),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_to_str(status))
        .bind(external_message_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_retry_count(&self, id: Uuid) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE messages
            SET retry_count = retry_count + 1,
                updated_at = now()
            WHERE id = $1
            RETURNING retry_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(row.try_get::<i32, _>("retry_count")? as u32)
    }

    async fn get_by_id_for_tenant(
        &self,
        id: Uuid,
        tenant_key: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = $1 AND subscription_key = $2")
            .bind(id)
            .bind(tenant_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn list_for_tenant(
        &self,
        tenant_key: &str,
        filter: ListFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        let limit = if filter.limit == 0 {
            100
        } else {
            filter.limit.min(100)
        } as i64;

        let rows = match filter.status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM messages WHERE subscription_key = $1 AND status = $2 \
                     ORDER BY created_at DESC LIMIT $3",
                )
                .bind(tenant_key)
                .bind(status_to_str(status))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM messages WHERE subscription_key = $1 \
                     ORDER BY created_at DESC LIMIT $2",
                )
                .bind(tenant_key)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::row_to_message).collect()
    }
}
