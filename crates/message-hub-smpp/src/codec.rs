//! Length-prefixed PDU framing, grounded on the same `tokio_util::codec`
//! idiom the retrieval pack's other network transports use: a `Decoder`
//! that waits for a complete frame before producing an item, and an
//! `Encoder` that writes it back out.

use crate::error::SmppError;
use crate::pdu::{
    BindKind, BindRequest, BindResponse, CommandId, CommandStatus, DeliverSmResp, Pdu, PduBody,
    ShortMessage, SubmitSmResp, HEADER_LEN,
};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const TAG_RECEIPTED_MESSAGE_ID: u16 = 0x001E;
const TAG_MESSAGE_STATE: u16 = 0x0427;

#[derive(Debug, Default)]
pub struct SmppCodec;

impl Decoder for SmppCodec {
    type Item = Pdu;
    type Error = SmppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Pdu>, SmppError> {
        if src.len() < 4 {
            return Ok(None);
        }
        let command_length = u32::from_be_bytes(src[0..4].try_into().unwrap()) as usize;
        if command_length < HEADER_LEN {
            return Err(SmppError::Codec(format!(
                "command_length {command_length} smaller than header"
            )));
        }
        if src.len() < command_length {
            src.reserve(command_length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(command_length);
        frame.advance(4); // command_length already consumed
        let command_id = frame.get_u32();
        let command_status = CommandStatus(frame.get_u32());
        let sequence_number = frame.get_u32();

        let id = CommandId::from_u32(command_id)
            .ok_or_else(|| SmppError::Codec(format!("unknown command_id 0x{command_id:08X}")))?;

        let body = decode_body(id, &mut frame)?;
        Ok(Some(Pdu {
            command_status,
            sequence_number,
            body,
        }))
    }
}

impl Encoder<Pdu> for SmppCodec {
    type Error = SmppError;

    fn encode(&mut self, pdu: Pdu, dst: &mut BytesMut) -> Result<(), SmppError> {
        let mut body_buf = BytesMut::new();
        encode_body(&pdu.body, &mut body_buf)?;

        let command_length = HEADER_LEN + body_buf.len();
        dst.reserve(command_length);
        dst.put_u32(command_length as u32);
        dst.put_u32(pdu.body.command_id() as u32);
        dst.put_u32(pdu.command_status.0);
        dst.put_u32(pdu.sequence_number);
        dst.extend_from_slice(&body_buf);
        Ok(())
    }
}

fn decode_body(id: CommandId, buf: &mut BytesMut) -> Result<PduBody, SmppError> {
    Ok(match id {
        CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver => {
            let kind = match id {
                CommandId::BindTransmitter => BindKind::Transmitter,
                CommandId::BindReceiver => BindKind::Receiver,
                _ => BindKind::Transceiver,
            };
            PduBody::Bind(BindRequest {
                kind,
                system_id: read_cstring(buf)?,
                password: read_cstring(buf)?,
                system_type: read_cstring(buf)?,
                interface_version: read_u8(buf)?,
                addr_ton: read_u8(buf)?,
                addr_npi: read_u8(buf)?,
                address_range: read_cstring(buf)?,
            })
        }
        CommandId::BindTransmitterResp
        | CommandId::BindReceiverResp
        | CommandId::BindTransceiverResp => {
            let kind = match id {
                CommandId::BindTransmitterResp => BindKind::Transmitter,
                CommandId::BindReceiverResp => BindKind::Receiver,
                _ => BindKind::Transceiver,
            };
            PduBody::BindResp(BindResponse {
                kind,
                system_id: read_cstring(buf)?,
            })
        }
        CommandId::SubmitSm => PduBody::SubmitSm(read_short_message(buf)?),
        CommandId::DeliverSm => PduBody::DeliverSm(read_short_message(buf)?),
        CommandId::SubmitSmResp => PduBody::SubmitSmResp(SubmitSmResp {
            message_id: read_cstring(buf)?,
        }),
        CommandId::DeliverSmResp => PduBody::DeliverSmResp(DeliverSmResp {
            message_id: read_cstring(buf)?,
        }),
        CommandId::EnquireLink => PduBody::EnquireLink,
        CommandId::EnquireLinkResp => PduBody::EnquireLinkResp,
        CommandId::Unbind => PduBody::Unbind,
        CommandId::UnbindResp => PduBody::UnbindResp,
        CommandId::GenericNack => PduBody::GenericNack,
    })
}

fn encode_body(body: &PduBody, buf: &mut BytesMut) -> Result<(), SmppError> {
    match body {
        PduBody::Bind(req) => {
            write_cstring(buf, &req.system_id);
            write_cstring(buf, &req.password);
            write_cstring(buf, &req.system_type);
            buf.put_u8(req.interface_version);
            buf.put_u8(req.addr_ton);
            buf.put_u8(req.addr_npi);
            write_cstring(buf, &req.address_range);
        }
        PduBody::BindResp(resp) => write_cstring(buf, &resp.system_id),
        PduBody::SubmitSm(sm) | PduBody::DeliverSm(sm) => write_short_message(buf, sm),
        PduBody::SubmitSmResp(resp) => write_cstring(buf, &resp.message_id),
        PduBody::DeliverSmResp(resp) => write_cstring(buf, &resp.message_id),
        PduBody::EnquireLink
        | PduBody::EnquireLinkResp
        | PduBody::Unbind
        | PduBody::UnbindResp
        | PduBody::GenericNack => {}
    }
    Ok(())
}

fn read_short_message(buf: &mut BytesMut) -> Result<ShortMessage, SmppError> {
    let service_type = read_cstring(buf)?;
    let source_addr_ton = read_u8(buf)?;
    let source_addr_npi = read_u8(buf)?;
    let source_addr = read_cstring(buf)?;
    let dest_addr_ton = read_u8(buf)?;
    let dest_addr_npi = read_u8(buf)?;
    let destination_addr = read_cstring(buf)?;
    let esm_class = read_u8(buf)?;
    let protocol_id = read_u8(buf)?;
    let priority_flag = read_u8(buf)?;
    let schedule_delivery_time = read_cstring(buf)?;
    let validity_period = read_cstring(buf)?;
    let registered_delivery = read_u8(buf)?;
    let replace_if_present_flag = read_u8(buf)?;
    let data_coding = read_u8(buf)?;
    let sm_default_msg_id = read_u8(buf)?;
    let sm_length = read_u8(buf)? as usize;
    if buf.remaining() < sm_length {
        return Err(SmppError::Codec("short_message truncated".into()));
    }
    let short_message = buf.split_to(sm_length).to_vec();

    let mut receipted_message_id = None;
    let mut message_state = None;
    while buf.remaining() >= 4 {
        let tag = buf.get_u16();
        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return Err(SmppError::Codec("TLV truncated".into()));
        }
        let value = buf.split_to(len);
        match tag {
            TAG_RECEIPTED_MESSAGE_ID => {
                let trimmed = value.strip_suffix(&[0]).unwrap_or(&value);
                receipted_message_id =
                    Some(String::from_utf8_lossy(trimmed).into_owned());
            }
            TAG_MESSAGE_STATE => {
                if let Some(&b) = value.first() {
                    message_state = Some(b);
                }
            }
            _ => {}
        }
    }

    Ok(ShortMessage {
        service_type,
        source_addr_ton,
        source_addr_npi,
        source_addr,
        dest_addr_ton,
        dest_addr_npi,
        destination_addr,
        esm_class,
        protocol_id,
        priority_flag,
        schedule_delivery_time,
        validity_period,
        registered_delivery,
        replace_if_present_flag,
        data_coding,
        sm_default_msg_id,
        short_message,
        receipted_message_id,
        message_state,
    })
}

fn write_short_message(buf: &mut BytesMut, sm: &ShortMessage) {
    write_cstring(buf, &sm.service_type);
    buf.put_u8(sm.source_addr_ton);
    buf.put_u8(sm.source_addr_npi);
    write_cstring(buf, &sm.source_addr);
    buf.put_u8(sm.dest_addr_ton);
    buf.put_u8(sm.dest_addr_npi);
    write_cstring(buf, &sm.destination_addr);
    buf.put_u8(sm.esm_class);
    buf.put_u8(sm.protocol_id);
    buf.put_u8(sm.priority_flag);
    write_cstring(buf, &sm.schedule_delivery_time);
    write_cstring(buf, &sm.validity_period);
    buf.put_u8(sm.registered_delivery);
    buf.put_u8(sm.replace_if_present_flag);
    buf.put_u8(sm.data_coding);
    buf.put_u8(sm.sm_default_msg_id);
    buf.put_u8(sm.short_message.len() as u8);
    buf.extend_from_slice(&sm.short_message);
}

fn read_u8(buf: &mut BytesMut) -> Result<u8, SmppError> {
    if buf.remaining() < 1 {
        return Err(SmppError::Codec("buffer underrun reading u8".into()));
    }
    Ok(buf.get_u8())
}

/// SMPP strings are NUL-terminated ("C-octet strings"); this reads up to and
/// consuming the terminator.
fn read_cstring(buf: &mut BytesMut) -> Result<String, SmppError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| SmppError::Codec("unterminated C-string".into()))?;
    let bytes = buf.split_to(end);
    buf.advance(1); // the NUL terminator
    String::from_utf8(bytes.to_vec()).map_err(|e| SmppError::Codec(e.to_string()))
}

fn write_cstring(buf: &mut BytesMut, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.put_u8(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enquire_link_round_trips() {
        let mut codec = SmppCodec;
        let mut buf = BytesMut::new();
        let pdu = Pdu::new(7, PduBody::EnquireLink);
        codec.encode(pdu, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.sequence_number, 7);
        assert!(matches!(decoded.body, PduBody::EnquireLink));
    }

    #[test]
    fn submit_sm_round_trips_including_short_message() {
        let mut codec = SmppCodec;
        let mut buf = BytesMut::new();
        let sm = ShortMessage::outbound("HUB".into(), "+15551234567".into(), b"hello world");
        let pdu = Pdu::new(1, PduBody::SubmitSm(sm));
        codec.encode(pdu, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        match decoded.body {
            PduBody::SubmitSm(sm) => {
                assert_eq!(sm.source_addr, "HUB");
                assert_eq!(sm.destination_addr, "+15551234567");
                assert_eq!(sm.short_message, b"hello world");
            }
            other => panic!("expected SubmitSm, got {other:?}"),
        }
    }

    #[test]
    fn decoder_waits_for_a_complete_frame() {
        let mut codec = SmppCodec;
        let mut buf = BytesMut::new();
        let pdu = Pdu::new(2, PduBody::EnquireLinkResp);
        codec.encode(pdu, &mut buf).unwrap();

        let mut partial = buf.split_to(buf.len() - 1);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&buf);
        assert!(codec.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn deliver_sm_dlr_tlvs_round_trip() {
        let mut codec = SmppCodec;
        let mut buf = BytesMut::new();
        let mut sm = ShortMessage::outbound("SMSC".into(), "HUB".into(), b"id:1 sub:001 dlvrd:001 submit date:2601010000 done date:2601010001 stat:DELIVRD err:000 text:");
        sm.receipted_message_id = Some("abc123".into());
        sm.message_state = Some(2);

        // Manually append TLVs the way the encoder would for a response we
        // build ourselves (the encoder here intentionally does not emit
        // outbound TLVs, since the hub never originates deliver_sm).
        let mut body = BytesMut::new();
        write_short_message(&mut body, &sm);
        body.put_u16(0x001E);
        let id_bytes = b"abc123\0";
        body.put_u16(id_bytes.len() as u16);
        body.extend_from_slice(id_bytes);
        body.put_u16(0x0427);
        body.put_u16(1);
        body.put_u8(2);

        let command_length = HEADER_LEN + body.len();
        buf.put_u32(command_length as u32);
        buf.put_u32(CommandId::DeliverSm as u32);
        buf.put_u32(0);
        buf.put_u32(42);
        buf.extend_from_slice(&body);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        match decoded.body {
            PduBody::DeliverSm(sm) => {
                assert_eq!(sm.receipted_message_id.as_deref(), Some("abc123"));
                assert_eq!(sm.message_state, Some(2));
            }
            other => panic!("expected DeliverSm, got {other:?}"),
        }
    }
}
