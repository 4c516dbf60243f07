mod config;
mod router;
mod submission;
mod worker;

pub use config::{ConfigError, HubConfig, PersistenceSettings, QueueTransportKind, ServerSettings};
pub use router::{ChannelRouter, SendOutcome};
pub use submission::{
    BatchItemResult, BatchResult, SubmissionHandler, SubmitRequest, SubmitResult, MAX_BATCH_SIZE,
};
pub use worker::DeliveryWorker;
