use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
    #[error("queue is full")]
    Full,
}
