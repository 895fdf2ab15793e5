//! The 12-byte handshake envelope header and its option-map body (§4.5,
//! §6.1). This is the wire-compatibility boundary that never changes.

use openrti_buffer::{ProtocolError, VariableLengthData};

use crate::option_map::{decode_option_map, encode_option_map, OptionMap};

/// `"OpenRTI\0"`, 8 bytes, literal.
pub const MAGIC: [u8; 8] = *b"OpenRTI\0";

/// Header size: 8-byte magic plus a 4-byte big-endian length.
pub const HEADER_LEN: usize = 12;

/// Encodes a complete envelope: header plus option-map body. The advertised
/// length always equals the actual length.
#[must_use]
pub fn encode_envelope(map: &OptionMap) -> Vec<u8> {
    let body = encode_option_map(map);
    let total_len = HEADER_LEN + body.size();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(body.data());
    out
}

/// Parses and validates the 12-byte header, returning the body length that
/// must still be read from the stream.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize, ProtocolError> {
    if header[..8] != MAGIC {
        return Err(ProtocolError::other("bad OpenRTI envelope magic"));
    }
    let total_len = u32::from_be_bytes(header[8..12].try_into().unwrap()) as usize;
    if total_len <= HEADER_LEN {
        return Err(ProtocolError::other(
            "envelope length must exceed the 12-byte header",
        ));
    }
    Ok(total_len - HEADER_LEN)
}

/// Decodes a body previously sized by [`decode_header`].
pub fn decode_body(body: &[u8]) -> Result<OptionMap, ProtocolError> {
    decode_option_map(body)
}

/// Convenience: decode a full in-memory envelope (header + body) at once.
/// Used by tests and by callers that already have the whole packet.
pub fn decode_envelope(bytes: &[u8]) -> Result<OptionMap, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::ReadBeyondEnd);
    }
    let header: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
    let body_len = decode_header(&header)?;
    let body = bytes
        .get(HEADER_LEN..HEADER_LEN + body_len)
        .ok_or(ProtocolError::ReadBeyondEnd)?;
    decode_body(body)
}

#[must_use]
pub fn blob(map: &OptionMap) -> VariableLengthData {
    VariableLengthData::from_vec(encode_envelope(map))
}
