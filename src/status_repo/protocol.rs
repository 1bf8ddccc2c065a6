// Java edition "server list ping": VarInt framing, handshake and status request packets.
// Packet on the wire: [length: VarInt][packet id: VarInt][payload].

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::StatusError;

/// Protocol version sent in the handshake. Servers answer status pings for any version.
pub const PROTOCOL_VERSION: i32 = 47;

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_REQUEST_ID: i32 = 0x00;
const STATUS_RESPONSE_ID: i32 = 0x00;
/// Handshake "next state" value selecting the status protocol.
const NEXT_STATE_STATUS: i32 = 1;

/// Upper bound on a status response frame (the JSON document plus headers).
pub const MAX_FRAME_LEN: usize = 1 << 21;

const MAX_VARINT_LEN: usize = 5;

pub fn put_varint(buf: &mut BytesMut, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            buf.put_u8(v as u8);
            return;
        }
        buf.put_u8(((v & 0x7F) | 0x80) as u8);
        v >>= 7;
    }
}

/// Reads one VarInt. `Ok(None)` when `buf` ends before the VarInt does.
pub fn get_varint(buf: &mut impl Buf) -> Result<Option<i32>, StatusError> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Ok(None);
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some(value as i32));
        }
    }
    Err(StatusError::Protocol("VarInt longer than 5 bytes".into()))
}

fn put_string(buf: &mut BytesMut, s: &str) {
    put_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

fn frame(packet_id: i32, payload: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(payload.len() + MAX_VARINT_LEN);
    put_varint(&mut body, packet_id);
    body.put_slice(payload);
    let mut out = BytesMut::with_capacity(body.len() + MAX_VARINT_LEN);
    put_varint(&mut out, body.len() as i32);
    out.put_slice(&body);
    out.freeze()
}

pub fn handshake_packet(host: &str, port: u16) -> Bytes {
    let mut payload = BytesMut::new();
    put_varint(&mut payload, PROTOCOL_VERSION);
    put_string(&mut payload, host);
    payload.put_u16(port);
    put_varint(&mut payload, NEXT_STATE_STATUS);
    frame(HANDSHAKE_ID, &payload)
}

pub fn status_request_packet() -> Bytes {
    frame(STATUS_REQUEST_ID, &[])
}

/// Builds the server's status response frame (for test servers and tooling).
pub fn status_response_packet(json: &str) -> Bytes {
    let mut payload = BytesMut::new();
    put_string(&mut payload, json);
    frame(STATUS_RESPONSE_ID, &payload)
}

/// Splits one complete frame off the front of `buf`. `Ok(None)` while more bytes are needed.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, StatusError> {
    let mut peek = &buf[..];
    let before = peek.remaining();
    let Some(len) = get_varint(&mut peek)? else {
        return Ok(None);
    };
    let header_len = before - peek.remaining();
    let len = usize::try_from(len)
        .map_err(|_| StatusError::Protocol(format!("negative frame length {len}")))?;
    if len > MAX_FRAME_LEN {
        return Err(StatusError::Protocol(format!(
            "frame length {len} exceeds {MAX_FRAME_LEN}"
        )));
    }
    if peek.remaining() < len {
        return Ok(None);
    }
    buf.advance(header_len);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Decodes a status response frame body into its JSON text.
pub fn decode_status_response(mut body: Bytes) -> Result<String, StatusError> {
    let id = get_varint(&mut body)?
        .ok_or_else(|| StatusError::Protocol("empty status response".into()))?;
    if id != STATUS_RESPONSE_ID {
        return Err(StatusError::Protocol(format!(
            "unexpected packet id {id:#04x} in status response"
        )));
    }
    let len = get_varint(&mut body)?
        .ok_or_else(|| StatusError::Protocol("truncated status string length".into()))?;
    let len = usize::try_from(len)
        .map_err(|_| StatusError::Protocol(format!("negative string length {len}")))?;
    if body.remaining() < len {
        return Err(StatusError::Protocol(format!(
            "status string declares {len} bytes, {} available",
            body.remaining()
        )));
    }
    let raw = body.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| StatusError::Protocol(format!("status string is not UTF-8: {e}")))
}
