mod channel;
mod codec;
mod dlr;
mod error;
mod pdu;
mod pool;
mod rate_limiter;

pub use channel::{SmppChannel, SmppSendError, SmppSendOutcome};
pub use codec::SmppCodec;
pub use dlr::{DeliveryReceipt, DlrCorrelator, DlrHook};
pub use error::SmppError;
pub use pdu::{BindKind, CommandId, CommandStatus, Pdu, PduBody, ShortMessage};
pub use pool::{SmppConnection, SmppPool};
pub use rate_limiter::SmppRateLimiter;
