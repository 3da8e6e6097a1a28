// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry POST encoding: header, Uri-Path options, Content-Format,
//! optional Uri-Query options, payload.

use super::{
    hex_dump, MessageBuilder, MessageType, CODE_POST, CONTENT_FORMAT_JSON, DEFAULT_MESSAGE_ID,
    NIBBLE_INLINE_MAX, OPTION_CONTENT_FORMAT, OPTION_URI_PATH, OPTION_URI_QUERY,
};
use crate::error::EncodeError;
use crate::uri::EndpointUri;

/// Bytes shown by the debug hex dump.
const HEX_DUMP_LIMIT: usize = 50;

/// Option encoding variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EncoderProfile {
    /// Single-byte option headers only: every segment must be at most
    /// 12 bytes. Byte-compatible with deployed collectors that only
    /// understand the short form.
    Simplified,
    /// Full delta/length encoding with one- and two-byte extensions.
    #[default]
    General,
}

/// What to do with the query part of the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QueryMode {
    /// Log the query and leave it out of the message.
    #[default]
    Skip,
    /// Emit one Uri-Query option per `&`-separated parameter.
    UriQuery,
}

/// Per-request encoding knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub profile: EncoderProfile,
    pub query_mode: QueryMode,
    pub message_id: u16,
    pub content_format: u16,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            profile: EncoderProfile::default(),
            query_mode: QueryMode::default(),
            message_id: DEFAULT_MESSAGE_ID,
            content_format: CONTENT_FORMAT_JSON,
        }
    }
}

/// Encode a confirmable POST for `uri` carrying `payload` into `buf`.
///
/// Returns the number of bytes written. On error the buffer content is
/// unspecified and must not be transmitted.
pub fn encode_request(
    uri: &EndpointUri,
    payload: &[u8],
    buf: &mut [u8],
    options: &RequestOptions,
) -> Result<usize, EncodeError> {
    let mut msg = MessageBuilder::new(buf, MessageType::Confirmable, CODE_POST, options.message_id)?;

    for segment in uri.segments() {
        check_profile(options.profile, segment)?;
        msg.add_option(OPTION_URI_PATH, segment.as_bytes())?;
        log::debug!("Added Uri-Path segment: '{}' ({} bytes)", segment, segment.len());
    }

    msg.add_option_uint(OPTION_CONTENT_FORMAT, u32::from(options.content_format))?;

    if uri.has_query() {
        match options.query_mode {
            QueryMode::Skip => {
                log::info!("Query parameters present but not encoded: {}", uri.query());
            }
            QueryMode::UriQuery => {
                for param in uri.query_params() {
                    check_profile(options.profile, param)?;
                    msg.add_option(OPTION_URI_QUERY, param.as_bytes())?;
                    log::debug!("Added Uri-Query: '{}'", param);
                }
            }
        }
    }

    msg.add_payload(payload)?;

    let bytes = msg.finish();
    log::debug!(
        "CoAP message built: {} bytes [{}]",
        bytes.len(),
        hex_dump(bytes, HEX_DUMP_LIMIT)
    );
    Ok(bytes.len())
}

fn check_profile(profile: EncoderProfile, value: &str) -> Result<(), EncodeError> {
    if profile == EncoderProfile::Simplified && value.len() > NIBBLE_INLINE_MAX {
        log::warn!("Path segment too long for simplified encoding: {}", value);
        return Err(EncodeError::SegmentTooLong {
            len: value.len(),
            max: NIBBLE_INLINE_MAX,
        });
    }
    Ok(())
}
