// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-buffer message builder.
//!
//! Every append computes its exact size first (including extended
//! delta/length bytes) and is rejected before any byte is written when it
//! does not fit, so [`MessageBuilder::len`] only ever moves by whole
//! options or a whole payload.

use super::{
    Header, MessageType, EXT16_BASE, EXT8_BASE, HEADER_SIZE, MAX_EXTENDED_VALUE, NIBBLE_EXT16,
    NIBBLE_EXT8, PAYLOAD_MARKER,
};
use crate::error::EncodeError;

/// Nibble plus extension bytes for one option delta or length.
#[derive(Debug, Clone, Copy)]
struct Extended {
    nibble: u8,
    ext: [u8; 2],
    ext_len: usize,
}

impl Extended {
    /// Caller guarantees `value <= MAX_EXTENDED_VALUE`.
    fn of(value: usize) -> Self {
        if value < EXT8_BASE {
            Self {
                nibble: value as u8,
                ext: [0, 0],
                ext_len: 0,
            }
        } else if value < EXT16_BASE {
            Self {
                nibble: NIBBLE_EXT8,
                ext: [(value - EXT8_BASE) as u8, 0],
                ext_len: 1,
            }
        } else {
            Self {
                nibble: NIBBLE_EXT16,
                ext: ((value - EXT16_BASE) as u16).to_be_bytes(),
                ext_len: 2,
            }
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.ext[..self.ext_len]
    }
}

/// Exact encoded size of an option with the given delta and value length.
pub fn encoded_option_len(delta: u16, value_len: usize) -> usize {
    1 + Extended::of(usize::from(delta)).ext_len + Extended::of(value_len).ext_len + value_len
}

/// Minimal big-endian bytes of an unsigned option value (zero is empty).
fn uint_bytes(value: u32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut out = [0u8; 4];
    out[..4 - skip].copy_from_slice(&bytes[skip..]);
    (out, 4 - skip)
}

/// Builds one message into a caller-owned buffer.
///
/// # Example
///
/// ```
/// use coap_uplink::codec::{MessageBuilder, MessageType, CODE_POST, OPTION_URI_PATH};
///
/// let mut buf = [0u8; 64];
/// let mut msg = MessageBuilder::new(&mut buf, MessageType::Confirmable, CODE_POST, 0x1234)?;
/// msg.add_option(OPTION_URI_PATH, b"sensor")?;
/// msg.add_payload(b"{}")?;
/// assert_eq!(msg.finish().len(), 4 + 7 + 3);
/// # Ok::<(), coap_uplink::EncodeError>(())
/// ```
#[derive(Debug)]
pub struct MessageBuilder<'a> {
    buf: &'a mut [u8],
    len: usize,
    last_option: u16,
    payload_set: bool,
}

impl<'a> MessageBuilder<'a> {
    /// Start a message by writing its token-less header.
    pub fn new(
        buf: &'a mut [u8],
        message_type: MessageType,
        code: u8,
        message_id: u16,
    ) -> Result<Self, EncodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(EncodeError::BufferOverflow {
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }
        buf[..HEADER_SIZE].copy_from_slice(&Header::new(message_type, code, message_id).to_bytes());
        Ok(Self {
            buf,
            len: HEADER_SIZE,
            last_option: 0,
            payload_set: false,
        })
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: the header is written on construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Number of the most recently appended option (0 before any).
    pub fn last_option_number(&self) -> u16 {
        self.last_option
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Append one option. Numbers must be non-decreasing.
    pub fn add_option(&mut self, number: u16, value: &[u8]) -> Result<(), EncodeError> {
        if self.payload_set {
            return Err(EncodeError::PayloadAlreadySet);
        }
        if number < self.last_option {
            return Err(EncodeError::OptionOutOfOrder {
                number,
                last: self.last_option,
            });
        }
        if value.len() > MAX_EXTENDED_VALUE {
            return Err(EncodeError::ValueTooLong {
                len: value.len(),
                max: MAX_EXTENDED_VALUE,
            });
        }

        let delta = Extended::of(usize::from(number - self.last_option));
        let length = Extended::of(value.len());
        let needed = 1 + delta.ext_len + length.ext_len + value.len();
        self.ensure_fits(needed)?;

        let mut pos = self.len;
        self.buf[pos] = (delta.nibble << 4) | length.nibble;
        pos += 1;
        for part in [delta.bytes(), length.bytes(), value] {
            self.buf[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }

        self.len = pos;
        self.last_option = number;
        Ok(())
    }

    /// Append an option carrying an unsigned integer in minimal form.
    pub fn add_option_uint(&mut self, number: u16, value: u32) -> Result<(), EncodeError> {
        let (bytes, len) = uint_bytes(value);
        self.add_option(number, &bytes[..len])
    }

    /// Append the payload marker and payload. An empty payload writes nothing.
    pub fn add_payload(&mut self, payload: &[u8]) -> Result<(), EncodeError> {
        if self.payload_set {
            return Err(EncodeError::PayloadAlreadySet);
        }
        if payload.is_empty() {
            return Ok(());
        }
        self.ensure_fits(1 + payload.len())?;

        self.buf[self.len] = PAYLOAD_MARKER;
        self.buf[self.len + 1..self.len + 1 + payload.len()].copy_from_slice(payload);
        self.len += 1 + payload.len();
        self.payload_set = true;
        Ok(())
    }

    /// Consume the builder and return the encoded message.
    pub fn finish(self) -> &'a [u8] {
        let len = self.len;
        let buf: &'a [u8] = self.buf;
        &buf[..len]
    }

    fn ensure_fits(&self, needed: usize) -> Result<(), EncodeError> {
        if needed > self.remaining() {
            return Err(EncodeError::BufferOverflow {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CODE_POST, OPTION_CONTENT_FORMAT, OPTION_URI_PATH, OPTION_URI_QUERY};

    fn builder(buf: &mut [u8]) -> MessageBuilder<'_> {
        MessageBuilder::new(buf, MessageType::Confirmable, CODE_POST, 0x1234).unwrap()
    }

    #[test]
    fn test_header_only() {
        let mut buf = [0u8; 4];
        let msg = builder(&mut buf);
        assert_eq!(msg.finish(), &[0x40, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_header_does_not_fit() {
        let mut buf = [0u8; 3];
        let err = MessageBuilder::new(&mut buf, MessageType::Confirmable, CODE_POST, 1).unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferOverflow {
                needed: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_nibble_delta_and_length() {
        let mut buf = [0u8; 32];
        let mut msg = builder(&mut buf);
        msg.add_option(OPTION_URI_PATH, b"sensor").unwrap();
        msg.add_option(OPTION_URI_PATH, b"send-data").unwrap();
        msg.add_option_uint(OPTION_CONTENT_FORMAT, 50).unwrap();
        let bytes = msg.finish();
        assert_eq!(bytes[4], 0xB6);
        assert_eq!(&bytes[5..11], b"sensor");
        assert_eq!(bytes[11], 0x09);
        assert_eq!(&bytes[12..21], b"send-data");
        assert_eq!(&bytes[21..], &[0x11, 50]);
    }

    #[test]
    fn test_one_byte_extended_length() {
        let mut buf = [0u8; 64];
        let mut msg = builder(&mut buf);
        let value = [b'x'; 13];
        msg.add_option(OPTION_URI_PATH, &value).unwrap();
        let bytes = msg.finish();
        assert_eq!(bytes[4], 0xBD);
        assert_eq!(bytes[5], 0);
        assert_eq!(&bytes[6..], &value);

        let mut buf = [0u8; 300];
        let mut msg = builder(&mut buf);
        let value = [b'y'; 268];
        msg.add_option(OPTION_URI_PATH, &value).unwrap();
        assert_eq!(&msg.as_bytes()[4..6], &[0xBD, 255]);
    }

    #[test]
    fn test_two_byte_extended_length() {
        let mut buf = [0u8; 400];
        let mut msg = builder(&mut buf);
        let value = [b'z'; 300];
        msg.add_option(OPTION_URI_PATH, &value).unwrap();
        let bytes = msg.finish();
        assert_eq!(bytes[4], 0xBE);
        assert_eq!(&bytes[5..7], &31u16.to_be_bytes());
        assert_eq!(bytes.len(), 4 + 3 + 300);
    }

    #[test]
    fn test_extended_delta() {
        let mut buf = [0u8; 32];
        let mut msg = builder(&mut buf);
        // delta 60 -> nibble 13, ext 47
        msg.add_option(60, b"").unwrap();
        // delta 2000 -> nibble 14, ext 1731
        msg.add_option(2060, &[1]).unwrap();
        let bytes = msg.finish();
        assert_eq!(&bytes[4..6], &[0xD0, 47]);
        assert_eq!(&bytes[6..10], &[0xE1, 0x06, 0xC3, 1]);
    }

    #[test]
    fn test_encoded_option_len() {
        assert_eq!(encoded_option_len(11, 6), 7);
        assert_eq!(encoded_option_len(0, 12), 13);
        assert_eq!(encoded_option_len(0, 13), 15);
        assert_eq!(encoded_option_len(13, 13), 16);
        assert_eq!(encoded_option_len(269, 269), 1 + 2 + 2 + 269);
    }

    #[test]
    fn test_uint_minimal_form() {
        assert_eq!(uint_bytes(0).1, 0);
        assert_eq!(uint_bytes(50), ([50, 0, 0, 0], 1));
        assert_eq!(uint_bytes(0x0102), ([1, 2, 0, 0], 2));
        assert_eq!(uint_bytes(u32::MAX).1, 4);
    }

    #[test]
    fn test_option_out_of_order_rejected() {
        let mut buf = [0u8; 32];
        let mut msg = builder(&mut buf);
        msg.add_option(OPTION_URI_QUERY, b"a=1").unwrap();
        let before = msg.len();
        let err = msg.add_option(OPTION_URI_PATH, b"x").unwrap_err();
        assert_eq!(
            err,
            EncodeError::OptionOutOfOrder {
                number: OPTION_URI_PATH,
                last: OPTION_URI_QUERY
            }
        );
        assert_eq!(msg.len(), before);
        // Repeating the same number stays legal
        msg.add_option(OPTION_URI_QUERY, b"b=2").unwrap();
    }

    #[test]
    fn test_overflow_leaves_length_unchanged() {
        let mut buf = [0u8; 10];
        let mut msg = builder(&mut buf);
        msg.add_option(OPTION_URI_PATH, b"ab").unwrap();
        assert_eq!(msg.len(), 7);
        let snapshot = msg.as_bytes().to_vec();

        let err = msg.add_option(OPTION_URI_PATH, b"abc").unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferOverflow {
                needed: 4,
                available: 3
            }
        );
        assert_eq!(msg.len(), 7);

        assert!(msg.add_payload(b"xyz").is_err());
        assert_eq!(msg.as_bytes(), snapshot.as_slice());

        // Exactly filling the buffer is fine
        msg.add_payload(b"xy").unwrap();
        assert_eq!(msg.len(), 10);
        assert_eq!(msg.remaining(), 0);
    }

    #[test]
    fn test_extension_bytes_counted_before_write() {
        // 13-byte value needs 1 + 1 + 13 = 15 bytes; 14 available
        let mut buf = [0u8; 18];
        let mut msg = builder(&mut buf);
        let err = msg.add_option(OPTION_URI_PATH, &[b'a'; 13]).unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferOverflow {
                needed: 15,
                available: 14
            }
        );
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn test_payload_rules() {
        let mut buf = [0u8; 32];
        let mut msg = builder(&mut buf);
        msg.add_payload(b"").unwrap();
        assert_eq!(msg.len(), 4);

        msg.add_payload(b"{\"t\":1}").unwrap();
        assert_eq!(msg.as_bytes()[4], PAYLOAD_MARKER);
        assert_eq!(msg.add_payload(b"more"), Err(EncodeError::PayloadAlreadySet));
        assert_eq!(
            msg.add_option(OPTION_URI_QUERY, b"x"),
            Err(EncodeError::PayloadAlreadySet)
        );
        assert_eq!(msg.len(), 4 + 1 + 7);
    }

    #[test]
    fn test_value_too_long() {
        let mut buf = vec![0u8; MAX_EXTENDED_VALUE + 16];
        let mut msg = builder(&mut buf);
        let value = vec![0u8; MAX_EXTENDED_VALUE + 1];
        assert!(matches!(
            msg.add_option(OPTION_URI_PATH, &value),
            Err(EncodeError::ValueTooLong { .. })
        ));
        let value = vec![0u8; MAX_EXTENDED_VALUE];
        msg.add_option(OPTION_URI_PATH, &value).unwrap();
        assert_eq!(&msg.as_bytes()[4..7], &[0xBE, 0xFF, 0xFF]);
    }
}
