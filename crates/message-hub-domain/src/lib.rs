//! Core domain types shared by every message hub crate: the message record
//! and its status DAG, per-tenant channel configuration, and the hub-wide
//! error taxonomy.

mod error;
mod message;
mod tenant;

pub use error::HubError;
pub use message::{ChannelType, Message, MessageStatus, MessageQueuedEvent};
pub use tenant::{
    AuthType, CircuitBreakerSettings, DlrSettings, FailedMessageSettings, HttpChannelConfig,
    PoolSettings, ProviderType, RateSettings, SmppBindType, SmppChannelConfig, TenantConfig,
    ThrottlingSettings,
};
