// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conformance decoder.
//!
//! Parses any token/option/payload layout a conformant peer may send, so
//! encoded requests can be verified option-by-option. Malformed input
//! returns `Err`, never panics.

use super::{
    Header, EXT16_BASE, EXT8_BASE, HEADER_SIZE, NIBBLE_EXT16, NIBBLE_EXT8, NIBBLE_RESERVED,
    OPTION_CONTENT_FORMAT, OPTION_URI_PATH, OPTION_URI_QUERY, PAYLOAD_MARKER, VERSION,
};
use crate::error::DecodeError;

/// Maximum token length defined by the protocol.
const MAX_TOKEN_LEN: u8 = 8;

/// One option with its absolute number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOption {
    pub number: u16,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub header: Header,
    pub token: Vec<u8>,
    pub options: Vec<DecodedOption>,
    pub payload: Vec<u8>,
}

impl DecodedMessage {
    /// Values of every option with the given number, in wire order.
    pub fn option_values(&self, number: u16) -> impl Iterator<Item = &[u8]> {
        self.options
            .iter()
            .filter(move |o| o.number == number)
            .map(|o| o.value.as_slice())
    }

    /// Uri-Path segments, lossily decoded as UTF-8.
    pub fn uri_path(&self) -> Vec<String> {
        self.option_values(OPTION_URI_PATH)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }

    pub fn uri_query(&self) -> Vec<String> {
        self.option_values(OPTION_URI_QUERY)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }

    /// First Content-Format option as an unsigned integer.
    pub fn content_format(&self) -> Option<u32> {
        self.option_values(OPTION_CONTENT_FORMAT)
            .next()
            .filter(|v| v.len() <= 4)
            .map(|v| v.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }
}

/// Decode one complete message.
pub fn decode_message(bytes: &[u8]) -> Result<DecodedMessage, DecodeError> {
    let header = Header::parse(bytes)?;
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    if header.token_length > MAX_TOKEN_LEN {
        return Err(DecodeError::InvalidTokenLength(header.token_length));
    }

    let mut pos = HEADER_SIZE;
    let token = take(bytes, &mut pos, usize::from(header.token_length))?.to_vec();

    let mut options = Vec::new();
    let mut payload = Vec::new();
    let mut number: u32 = 0;

    while pos < bytes.len() {
        let first = bytes[pos];
        pos += 1;

        if first == PAYLOAD_MARKER {
            if pos == bytes.len() {
                return Err(DecodeError::EmptyPayload);
            }
            payload = bytes[pos..].to_vec();
            break;
        }

        let delta = read_extended(first >> 4, bytes, &mut pos)?;
        let length = read_extended(first & 0x0F, bytes, &mut pos)?;

        number += delta as u32;
        let option_number = u16::try_from(number).map_err(|_| DecodeError::OptionNumberOverflow)?;
        let value = take(bytes, &mut pos, length)?.to_vec();
        options.push(DecodedOption {
            number: option_number,
            value,
        });
    }

    Ok(DecodedMessage {
        header,
        token,
        options,
        payload,
    })
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], DecodeError> {
    let end = pos.checked_add(n).ok_or(DecodeError::Truncated)?;
    let slice = bytes.get(*pos..end).ok_or(DecodeError::Truncated)?;
    *pos = end;
    Ok(slice)
}

fn read_extended(nibble: u8, bytes: &[u8], pos: &mut usize) -> Result<usize, DecodeError> {
    match nibble {
        NIBBLE_EXT8 => {
            let ext = take(bytes, pos, 1)?;
            Ok(EXT8_BASE + usize::from(ext[0]))
        }
        NIBBLE_EXT16 => {
            let ext = take(bytes, pos, 2)?;
            Ok(EXT16_BASE + usize::from(u16::from_be_bytes([ext[0], ext[1]])))
        }
        NIBBLE_RESERVED => Err(DecodeError::ReservedNibble),
        n => Ok(usize::from(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{MessageType, CONTENT_FORMAT_JSON};

    #[test]
    fn test_decode_sensor_post() {
        let mut bytes = vec![0x40, 0x02, 0x12, 0x34, 0xB6];
        bytes.extend_from_slice(b"sensor");
        bytes.push(0x09);
        bytes.extend_from_slice(b"send-data");
        bytes.extend_from_slice(&[0x11, 50, 0xFF]);
        bytes.extend_from_slice(b"{\"t\":1}");

        let msg = decode_message(&bytes).unwrap();
        assert_eq!(msg.header.message_type, MessageType::Confirmable);
        assert_eq!(msg.header.code, 0x02);
        assert_eq!(msg.header.message_id, 0x1234);
        assert!(msg.token.is_empty());
        assert_eq!(msg.uri_path(), ["sensor", "send-data"]);
        assert_eq!(msg.content_format(), Some(u32::from(CONTENT_FORMAT_JSON)));
        assert_eq!(msg.payload, b"{\"t\":1}");
    }

    #[test]
    fn test_decode_token_and_extended_fields() {
        // tkl=2, option 60 (delta 13+47) empty, option 2060 (delta 269+1731) len 1
        let bytes = [0x42, 0x01, 0, 1, 0xAA, 0xBB, 0xD0, 47, 0xE1, 0x06, 0xC3, 7];
        let msg = decode_message(&bytes).unwrap();
        assert_eq!(msg.token, [0xAA, 0xBB]);
        assert_eq!(msg.options.len(), 2);
        assert_eq!(msg.options[0].number, 60);
        assert!(msg.options[0].value.is_empty());
        assert_eq!(msg.options[1].number, 2060);
        assert_eq!(msg.options[1].value, [7]);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_message(&[0x40, 0x02]), Err(DecodeError::Truncated));
        assert_eq!(
            decode_message(&[0x80, 0x02, 0, 0]),
            Err(DecodeError::UnsupportedVersion(2))
        );
        assert_eq!(
            decode_message(&[0x49, 0x02, 0, 0]),
            Err(DecodeError::InvalidTokenLength(9))
        );
        assert_eq!(decode_message(&[0x42, 0x02, 0, 0, 1]), Err(DecodeError::Truncated));
        assert_eq!(
            decode_message(&[0x40, 0x02, 0, 0, 0xF1, 0]),
            Err(DecodeError::ReservedNibble)
        );
        assert_eq!(
            decode_message(&[0x40, 0x02, 0, 0, 0x1F]),
            Err(DecodeError::ReservedNibble)
        );
        assert_eq!(decode_message(&[0x40, 0x02, 0, 0, 0xD1]), Err(DecodeError::Truncated));
        assert_eq!(
            decode_message(&[0x40, 0x02, 0, 0, 0x13, b'a']),
            Err(DecodeError::Truncated)
        );
        assert_eq!(
            decode_message(&[0x40, 0x02, 0, 0, 0xFF]),
            Err(DecodeError::EmptyPayload)
        );
        // 65535 + 269 overflows the option number space
        assert_eq!(
            decode_message(&[0x40, 0x02, 0, 0, 0xE0, 0xFF, 0xFF]),
            Err(DecodeError::OptionNumberOverflow)
        );
    }

    #[test]
    fn test_decode_never_panics_on_noise() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..2_000 {
            let len = rng.usize(0..48);
            let bytes: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
            let _ = decode_message(&bytes);
        }
    }
}
