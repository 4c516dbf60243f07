use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SmppError {
    #[error("PDU codec error: {0}")]
    Codec(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("bind rejected: {0}")]
    BindRejected(CommandStatusDisplay),

    #[error("no connection available within timeout")]
    PoolExhausted,

    #[error("send-speed limit exceeded for tenant")]
    RateLimited,

    #[error("throttled by SMSC, retry after backoff")]
    Throttled,

    #[error("transient SMPP error: {0}")]
    Transient(CommandStatusDisplay),

    #[error("SMPP: {0}")]
    Permanent(CommandStatusDisplay),

    #[error("connection closed")]
    Closed,
}

/// Wraps a raw `command_status` for display without pulling `pdu` into
/// every error variant's type signature.
#[derive(Debug, Clone, Copy)]
pub struct CommandStatusDisplay(pub u32);

impl std::fmt::Display for CommandStatusDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<crate::pdu::CommandStatus> for CommandStatusDisplay {
    fn from(status: crate::pdu::CommandStatus) -> Self {
        CommandStatusDisplay(status.0)
    }
}
