use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("message not found: {0}")]
    NotFound(uuid::Uuid),

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
