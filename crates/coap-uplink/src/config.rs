// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Uplink configuration with validation.

use std::time::Duration;

use thiserror::Error;

use crate::codec::{EncoderProfile, QueryMode, RequestOptions, CONTENT_FORMAT_JSON, DEFAULT_MESSAGE_ID, HEADER_SIZE};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the uplink dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UplinkConfig {
    /// Bound on the network-readiness wait in milliseconds (default: 10000).
    pub network_timeout_ms: u64,
    /// Socket write timeout in milliseconds (default: 2000).
    pub send_timeout_ms: u64,
    /// Encode buffer size per send (default: 512, typical MCU limit).
    pub buffer_capacity: usize,
    /// Message id placed in every header (default: 0x1234).
    pub message_id: u16,
    /// Option encoding variant (default: general).
    pub profile: EncoderProfile,
    /// Query handling (default: skip).
    pub query_mode: QueryMode,
    /// Resolve textual hostnames instead of requiring IP literals (default: false).
    pub resolve_hostnames: bool,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            network_timeout_ms: 10_000,
            send_timeout_ms: 2_000,
            buffer_capacity: 512,
            message_id: DEFAULT_MESSAGE_ID,
            profile: EncoderProfile::General,
            query_mode: QueryMode::Skip,
            resolve_hostnames: false,
        }
    }
}

impl UplinkConfig {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Encoder settings derived from this configuration.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            profile: self.profile,
            query_mode: self.query_mode,
            message_id: self.message_id,
            content_format: CONTENT_FORMAT_JSON,
        }
    }

    /// Validate configuration. Returns Ok(()) if valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "network_timeout_ms must be > 0".into(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("send_timeout_ms must be > 0".into()));
        }
        // Must at least hold the fixed header
        if self.buffer_capacity < HEADER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity must be >= {}",
                HEADER_SIZE
            )));
        }
        if self.buffer_capacity > MAX_DATAGRAM_SIZE {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity must be <= {} (UDP payload limit)",
                MAX_DATAGRAM_SIZE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = UplinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_options(), RequestOptions::default());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            UplinkConfig {
                network_timeout_ms: 0,
                ..Default::default()
            },
            UplinkConfig {
                send_timeout_ms: 0,
                ..Default::default()
            },
            UplinkConfig {
                buffer_capacity: 3,
                ..Default::default()
            },
            UplinkConfig {
                buffer_capacity: MAX_DATAGRAM_SIZE + 1,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_request_options_follow_config() {
        let config = UplinkConfig {
            message_id: 7,
            profile: EncoderProfile::Simplified,
            query_mode: QueryMode::UriQuery,
            ..Default::default()
        };
        let opts = config.request_options();
        assert_eq!(opts.message_id, 7);
        assert_eq!(opts.profile, EncoderProfile::Simplified);
        assert_eq!(opts.query_mode, QueryMode::UriQuery);
        assert_eq!(opts.content_format, CONTENT_FORMAT_JSON);
    }
}
