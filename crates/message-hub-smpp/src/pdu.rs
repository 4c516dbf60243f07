//! SMPP 3.4 PDU types: the fixed header plus the body shapes this channel
//! actually speaks. Deliberately narrower than the full protocol — only the
//! PDU set a bind/submit/deliver/enquire/unbind lifecycle needs.

use std::fmt;

/// `command_id` values for the PDU set this channel speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandId {
    BindReceiver = 0x0000_0001,
    BindTransmitter = 0x0000_0002,
    SubmitSm = 0x0000_0004,
    DeliverSm = 0x0000_0005,
    Unbind = 0x0000_0006,
    BindTransceiver = 0x0000_0009,
    EnquireLink = 0x0000_0015,
    GenericNack = 0x8000_0000,
    BindReceiverResp = 0x8000_0001,
    BindTransmitterResp = 0x8000_0002,
    SubmitSmResp = 0x8000_0004,
    DeliverSmResp = 0x8000_0005,
    UnbindResp = 0x8000_0006,
    BindTransceiverResp = 0x8000_0009,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    pub fn from_u32(value: u32) -> Option<Self> {
        use CommandId::*;
        Some(match value {
            0x0000_0001 => BindReceiver,
            0x0000_0002 => BindTransmitter,
            0x0000_0004 => SubmitSm,
            0x0000_0005 => DeliverSm,
            0x0000_0006 => Unbind,
            0x0000_0009 => BindTransceiver,
            0x0000_0015 => EnquireLink,
            0x8000_0000 => GenericNack,
            0x8000_0001 => BindReceiverResp,
            0x8000_0002 => BindTransmitterResp,
            0x8000_0004 => SubmitSmResp,
            0x8000_0005 => DeliverSmResp,
            0x8000_0006 => UnbindResp,
            0x8000_0009 => BindTransceiverResp,
            0x8000_0015 => EnquireLinkResp,
            _ => return None,
        })
    }
}

/// `command_status` values this channel distinguishes; everything else is
/// preserved as its raw `u32` and treated as a permanent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus(pub u32);

impl CommandStatus {
    pub const OK: CommandStatus = CommandStatus(0x0000_0000);
    pub const MSGQFUL: CommandStatus = CommandStatus(0x0000_0014);
    pub const SUBMITFAIL: CommandStatus = CommandStatus(0x0000_0045);
    pub const SYSERR: CommandStatus = CommandStatus(0x0000_0008);
    pub const THROTTLED: CommandStatus = CommandStatus(0x0000_0058);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Statuses the channel treats as transient: worth retrying without
    /// failing the message outright (`ESME_RTHROTTLED` is handled
    /// separately with its own backoff, not folded in here).
    pub fn is_transient(self) -> bool {
        matches!(self, Self::MSGQFUL | Self::SUBMITFAIL | Self::SYSERR)
    }

    pub fn is_throttled(self) -> bool {
        self == Self::THROTTLED
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// The 16-byte SMPP fixed header.
#[derive(Debug, Clone, Copy)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

pub const HEADER_LEN: usize = 16;

/// How the client should bind to the SMSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindKind {
    pub fn command_id(self) -> CommandId {
        match self {
            BindKind::Transmitter => CommandId::BindTransmitter,
            BindKind::Receiver => CommandId::BindReceiver,
            BindKind::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn resp_command_id(self) -> CommandId {
        match self {
            BindKind::Transmitter => CommandId::BindTransmitterResp,
            BindKind::Receiver => CommandId::BindReceiverResp,
            BindKind::Transceiver => CommandId::BindTransceiverResp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindRequest {
    pub kind: BindKind,
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: u8,
    pub addr_ton: u8,
    pub addr_npi: u8,
    pub address_range: String,
}

#[derive(Debug, Clone)]
pub struct BindResponse {
    pub kind: BindKind,
    pub system_id: String,
}

/// `submit_sm` and `deliver_sm` share this body shape in SMPP 3.4.
#[derive(Debug, Clone)]
pub struct ShortMessage {
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Vec<u8>,
    /// TLV tail: `receipted_message_id` (0x001E) and `message_state`
    /// (0x0427) on inbound `deliver_sm` DLR receipts.
    pub receipted_message_id: Option<String>,
    pub message_state: Option<u8>,
}

impl ShortMessage {
    /// A freshly built outbound submission with no optional TLVs.
    pub fn outbound(source_addr: String, destination_addr: String, text: &[u8]) -> Self {
        Self {
            service_type: String::new(),
            source_addr_ton: 0,
            source_addr_npi: 0,
            source_addr,
            dest_addr_ton: 0,
            dest_addr_npi: 1,
            destination_addr,
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: text.to_vec(),
            receipted_message_id: None,
            message_state: None,
        }
    }

    /// Sets `registered_delivery` to request a delivery receipt, per the
    /// tenant's configured DLR mask.
    pub fn with_registered_delivery(mut self, mask: u8) -> Self {
        self.registered_delivery = mask;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SubmitSmResp {
    pub message_id: String,
}

#[derive(Debug, Clone)]
pub struct DeliverSmResp {
    pub message_id: String,
}

/// The parsed body of one PDU, dispatched on `command_id`.
#[derive(Debug, Clone)]
pub enum PduBody {
    Bind(BindRequest),
    BindResp(BindResponse),
    SubmitSm(ShortMessage),
    SubmitSmResp(SubmitSmResp),
    DeliverSm(ShortMessage),
    DeliverSmResp(DeliverSmResp),
    EnquireLink,
    EnquireLinkResp,
    Unbind,
    UnbindResp,
    GenericNack,
}

impl PduBody {
    pub fn command_id(&self) -> CommandId {
        match self {
            PduBody::Bind(req) => req.kind.command_id(),
            PduBody::BindResp(resp) => resp.kind.resp_command_id(),
            PduBody::SubmitSm(_) => CommandId::SubmitSm,
            PduBody::SubmitSmResp(_) => CommandId::SubmitSmResp,
            PduBody::DeliverSm(_) => CommandId::DeliverSm,
            PduBody::DeliverSmResp(_) => CommandId::DeliverSmResp,
            PduBody::EnquireLink => CommandId::EnquireLink,
            PduBody::EnquireLinkResp => CommandId::EnquireLinkResp,
            PduBody::Unbind => CommandId::Unbind,
            PduBody::UnbindResp => CommandId::UnbindResp,
            PduBody::GenericNack => CommandId::GenericNack,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pdu {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub body: PduBody,
}

impl Pdu {
    pub fn new(sequence_number: u32, body: PduBody) -> Self {
        Self {
            command_status: CommandStatus::OK,
            sequence_number,
            body,
        }
    }

    pub fn with_status(mut self, status: CommandStatus) -> Self {
        self.command_status = status;
        self
    }
}
