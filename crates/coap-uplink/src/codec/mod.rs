// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// CoAP request wire format (RFC 7252 subset).
//
// Layout produced by this crate:
//
//   +-----------+----------------------------+------+---------+
//   | header(4) | options (delta-encoded)    | 0xFF | payload |
//   +-----------+----------------------------+------+---------+
//
// No token, no response handling. All builders write into a caller-owned
// fixed buffer and never run past its end.

mod builder;
mod decoder;
mod request;

pub use builder::{encoded_option_len, MessageBuilder};
pub use decoder::{decode_message, DecodedMessage, DecodedOption};
pub use request::{encode_request, EncoderProfile, QueryMode, RequestOptions};

use std::fmt::Write;

use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 4;

/// Protocol version carried in the top two header bits.
pub const VERSION: u8 = 1;

/// Request code 0.02 (POST).
pub const CODE_POST: u8 = 0x02;

// Option numbers
pub const OPTION_URI_PATH: u16 = 11;
pub const OPTION_CONTENT_FORMAT: u16 = 12;
pub const OPTION_URI_QUERY: u16 = 15;

/// Content-Format code for `application/json`.
pub const CONTENT_FORMAT_JSON: u16 = 50;

/// Marks the end of the options and the start of the payload.
pub const PAYLOAD_MARKER: u8 = 0xFF;

/// Placeholder message id; responses are never correlated.
pub const DEFAULT_MESSAGE_ID: u16 = 0x1234;

/// Largest value a delta or length nibble carries inline.
pub const NIBBLE_INLINE_MAX: usize = 12;

/// Nibble 13: one extension byte carrying `value - 13`.
pub const EXT8_BASE: usize = 13;

/// Nibble 14: two extension bytes carrying `value - 269`, big-endian.
pub const EXT16_BASE: usize = 269;

/// Largest delta or length the two-byte extension can express.
pub const MAX_EXTENDED_VALUE: usize = EXT16_BASE + u16::MAX as usize;

const NIBBLE_EXT8: u8 = 13;
const NIBBLE_EXT16: u8 = 14;
const NIBBLE_RESERVED: u8 = 15;

// ---------------------------------------------------------------------------
// Message type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Confirmable = 0,
    NonConfirmable = 1,
    Acknowledgement = 2,
    Reset = 3,
}

impl MessageType {
    pub fn from_bits(v: u8) -> Self {
        match v & 0x03 {
            0 => Self::Confirmable,
            1 => Self::NonConfirmable,
            2 => Self::Acknowledgement,
            _ => Self::Reset,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Fixed 4-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub message_type: MessageType,
    pub token_length: u8,
    pub code: u8,
    pub message_id: u16,
}

impl Header {
    /// Token-less header as written by [`MessageBuilder`].
    pub fn new(message_type: MessageType, code: u8, message_id: u16) -> Self {
        Self {
            version: VERSION,
            message_type,
            token_length: 0,
            code,
            message_id,
        }
    }

    /// Confirmable POST, the only request this crate sends.
    pub fn post(message_id: u16) -> Self {
        Self::new(MessageType::Confirmable, CODE_POST, message_id)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let id = self.message_id.to_be_bytes();
        [
            (self.version << 6) | (self.message_type.as_u8() << 4) | (self.token_length & 0x0F),
            self.code,
            id[0],
            id[1],
        ]
    }

    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated);
        }
        Ok(Self {
            version: buf[0] >> 6,
            message_type: MessageType::from_bits(buf[0] >> 4),
            token_length: buf[0] & 0x0F,
            code: buf[1],
            message_id: u16::from_be_bytes([buf[2], buf[3]]),
        })
    }
}

// ---------------------------------------------------------------------------
// Debug helpers
// ---------------------------------------------------------------------------

/// Space-separated hex of the first `limit` bytes, `...` appended when cut.
pub fn hex_dump(bytes: &[u8], limit: usize) -> String {
    let mut out = String::with_capacity(bytes.len().min(limit) * 3 + 3);
    for b in bytes.iter().take(limit) {
        let _ = write!(out, "{:02x} ", b);
    }
    if bytes.len() > limit {
        out.push_str("...");
    } else {
        out.truncate(out.trim_end().len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_header_bytes() {
        assert_eq!(Header::post(0x1234).to_bytes(), [0x40, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_header_parse_fields() {
        let hdr = Header::parse(&[0x52, 0x45, 0xAB, 0xCD]).unwrap();
        assert_eq!(hdr.version, 1);
        assert_eq!(hdr.message_type, MessageType::NonConfirmable);
        assert_eq!(hdr.token_length, 2);
        assert_eq!(hdr.code, 0x45);
        assert_eq!(hdr.message_id, 0xABCD);
        assert_eq!(Header::parse(&[0x40, 0x02]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x40, 0x02, 0xff], 50), "40 02 ff");
        assert_eq!(hex_dump(&[1, 2, 3], 2), "01 02 ...");
        assert_eq!(hex_dump(&[], 50), "");
    }
}
