// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for a single send attempt.
//!
//! Every failure is terminal for the attempt it belongs to and is surfaced
//! as a typed value; nothing in this crate retries internally. OS-level
//! errors are carried as their message so outcomes stay `Clone + Eq` and can
//! cross the dispatch thread boundary.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// URI component that exceeded its fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriField {
    /// Host (literal address or hostname).
    Host,
    /// Path, without the leading `/`.
    Path,
    /// Query string, without the leading `?`.
    Query,
}

impl fmt::Display for UriField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// The endpoint string could not be decomposed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Scheme separator, host or port could not be isolated.
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// A component is wider than the fixed field it must fit in.
    #[error("URI {field} is {len} bytes, limit is {max}")]
    TooLong {
        field: UriField,
        len: usize,
        max: usize,
    },
}

/// The message cannot be built safely inside the destination buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Segment does not fit the single-nibble length of the simplified profile.
    #[error("path segment of {len} bytes exceeds the {max}-byte single-nibble limit")]
    SegmentTooLong { len: usize, max: usize },

    /// The append would run past the buffer capacity. Nothing was written.
    #[error("buffer overflow: need {needed} bytes, {available} available")]
    BufferOverflow { needed: usize, available: usize },

    /// Options must be appended in non-decreasing number order.
    #[error("option {number} appended after option {last}")]
    OptionOutOfOrder { number: u16, last: u16 },

    /// Option value longer than the two-byte extended length can express.
    #[error("option value of {len} bytes exceeds the maximum of {max}")]
    ValueTooLong { len: usize, max: usize },

    /// The payload marker has already been written.
    #[error("payload already written")]
    PayloadAlreadySet,
}

/// Malformed input handed to the conformance decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message truncated")]
    Truncated,

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid token length {0}")]
    InvalidTokenLength(u8),

    /// Nibble value 15 outside of the payload marker.
    #[error("reserved option nibble")]
    ReservedNibble,

    #[error("option number overflows 16 bits")]
    OptionNumberOverflow,

    /// A payload marker must be followed by at least one byte.
    #[error("payload marker without payload")]
    EmptyPayload,
}

/// Destination host is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid IP address literal: {0}")]
    InvalidLiteral(String),

    #[error("failed to resolve {host}: {reason}")]
    Resolution { host: String, reason: String },
}

/// The datagram was not handed to the network in full.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error("socket setup failed: {0}")]
    Socket(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("short write: {sent} of {expected} bytes accepted")]
    ShortWrite { sent: usize, expected: usize },
}

/// Failure reported by a [`DatagramTransport`](crate::transport::DatagramTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),
}

/// Terminal outcome of a failed send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("address error: {0}")]
    Address(AddressError),

    #[error("transmit error: {0}")]
    Transmit(TransmitError),

    /// Readiness wait exceeded its bound; nothing was encoded or sent.
    #[error("network not ready after {0:?}")]
    NetworkUnavailable(Duration),

    /// The dispatch thread could not be started or vanished without a result.
    #[error("dispatch scheduling failed: {0}")]
    Scheduler(String),
}

impl From<TransportError> for SendError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Address(a) => Self::Address(a),
            TransportError::Transmit(t) => Self::Transmit(t),
        }
    }
}

impl From<AddressError> for SendError {
    fn from(e: AddressError) -> Self {
        Self::Address(e)
    }
}

impl From<TransmitError> for SendError {
    fn from(e: TransmitError) -> Self {
        Self::Transmit(e)
    }
}
