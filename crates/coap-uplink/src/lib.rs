// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CoAP telemetry uplink for constrained sensing nodes.
//!
//! Encodes a confirmable CoAP POST (RFC 7252 subset) carrying a small
//! telemetry payload and fires it once over UDP at a fixed collector,
//! after a bounded wait for the network to come up.
//!
//! # Architecture
//!
//! ```text
//!   sampling loop                 dispatch thread ("coap-dispatch")
//!        |                                 |
//!        |-- dispatch(uri, payload) ------>| AwaitingNetwork  (NetworkReadiness, bounded)
//!        |   (returns immediately)         | Encoding         (EndpointUri + encode_request)
//!        |                                 | Transmitting     (DatagramTransport, one datagram)
//!        |<-- DispatchHandle / stats ------| Done(outcome)
//! ```
//!
//! # Wire format
//!
//! | Field | Bytes | Value |
//! |-------|-------|-------|
//! | Header | 4 | `0x40 0x02 <msg id>` (v1, CON, TKL 0, POST) |
//! | Uri-Path | 1+ each | option 11, one per path segment |
//! | Content-Format | 2 | option 12, value 50 (JSON) |
//! | Uri-Query | 1+ each | option 15, only with [`QueryMode::UriQuery`] |
//! | Payload | 1 + n | `0xFF` marker then raw bytes, omitted when empty |
//!
//! Nothing here retries: each failure is a typed [`SendError`] for the
//! caller to count or reschedule.

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod readiness;
pub mod stats;
pub mod transport;
pub mod uri;

// Re-exports for convenience.
pub use codec::{
    decode_message, encode_request, hex_dump, DecodedMessage, DecodedOption, EncoderProfile,
    Header, MessageBuilder, MessageType, QueryMode, RequestOptions,
};
pub use config::{ConfigError, UplinkConfig};
pub use dispatcher::{DispatchHandle, DispatchState, Dispatcher, SendOutcome};
pub use error::{
    AddressError, DecodeError, EncodeError, ParseError, SendError, TransmitError,
    TransportError, UriField,
};
pub use readiness::{AlwaysReady, NetworkReadiness, ReadinessSignal};
pub use stats::{DispatchStats, DispatchStatsSnapshot};
pub use transport::{DatagramTransport, SendReport, UdpTransport};
pub use uri::{EndpointUri, DEFAULT_PORT};
