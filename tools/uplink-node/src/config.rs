// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node configuration.
//!
//! Loaded from TOML; every field has a default so a partial file is valid.

use coap_uplink::{EndpointUri, ParseError, UplinkConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] ParseError),

    #[error(transparent)]
    Uplink(#[from] coap_uplink::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where sensor readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Greenhouse model with daily cycles.
    #[default]
    Simulator,
    /// Constant placeholder values.
    Fixed,
}

/// Sensing node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identifier sent with every sample.
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Collector API key, carried in the payload.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_zone_id")]
    pub zone_id: String,

    /// Simulator plant profile (tomato, lettuce, cucumber, peppers).
    #[serde(default = "default_plant_type")]
    pub plant_type: String,

    /// Collector endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Seconds between samples.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Milliseconds between link probes.
    #[serde(default = "default_link_probe_interval")]
    pub link_probe_interval_ms: u64,

    #[serde(default)]
    pub source: SourceKind,

    /// Fixed RNG seed for reproducible simulator output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_seed: Option<u64>,

    /// Offset from UTC for the simulated day cycle, in hours.
    #[serde(default)]
    pub utc_offset_hours: i8,

    #[serde(default)]
    pub uplink: UplinkConfig,
}

fn default_node_id() -> String {
    "greenhouse_001".to_string()
}

fn default_api_key() -> String {
    "gh001_api_key_abc123".to_string()
}

fn default_zone_id() -> String {
    "A1".to_string()
}

fn default_plant_type() -> String {
    "tomato".to_string()
}

fn default_endpoint() -> String {
    "coap://192.168.1.52:5683/sensor/send-data".to_string()
}

fn default_sample_interval() -> u64 {
    20
}

fn default_link_probe_interval() -> u64 {
    1000
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api_key: default_api_key(),
            zone_id: default_zone_id(),
            plant_type: default_plant_type(),
            endpoint: default_endpoint(),
            sample_interval_secs: default_sample_interval(),
            link_probe_interval_ms: default_link_probe_interval(),
            source: SourceKind::default(),
            simulator_seed: None,
            utc_offset_hours: 0,
            uplink: UplinkConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn link_probe_interval(&self) -> Duration {
        Duration::from_millis(self.link_probe_interval_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::Invalid("node_id must not be empty".into()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Invalid("api_key must not be empty".into()));
        }
        if self.sample_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sample_interval_secs must be > 0".into(),
            ));
        }
        if self.link_probe_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "link_probe_interval_ms must be > 0".into(),
            ));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours {} out of range -12..=14",
                self.utc_offset_hours
            )));
        }
        EndpointUri::parse(&self.endpoint)?;
        self.uplink.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coap_uplink::{EncoderProfile, QueryMode};
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_interval(), Duration::from_secs(20));
        assert_eq!(config.node_id, "greenhouse_001");
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
node_id = "greenhouse_007"
plant_type = "lettuce"
endpoint = "coap://10.0.0.5/telemetry"

[uplink]
network_timeout_ms = 3000
profile = "simplified"
query_mode = "uri_query"
"#
        )
        .unwrap();

        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.node_id, "greenhouse_007");
        assert_eq!(config.plant_type, "lettuce");
        assert_eq!(config.api_key, "gh001_api_key_abc123");
        assert_eq!(config.uplink.network_timeout_ms, 3000);
        assert_eq!(config.uplink.buffer_capacity, 512);
        assert_eq!(config.uplink.profile, EncoderProfile::Simplified);
        assert_eq!(config.uplink.query_mode, QueryMode::UriQuery);
    }

    #[test]
    fn test_from_file_rejects_bad_endpoint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"endpoint = "192.168.1.52/sensor""#).unwrap();
        assert!(matches!(
            NodeConfig::from_file(file.path()),
            Err(ConfigError::Endpoint(_))
        ));
    }

    #[test]
    fn test_from_file_rejects_bad_uplink() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[uplink]\nbuffer_capacity = 2").unwrap();
        assert!(matches!(
            NodeConfig::from_file(file.path()),
            Err(ConfigError::Uplink(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let config = NodeConfig {
            sample_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = NodeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = NodeConfig {
            utc_offset_hours: 20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = NodeConfig {
            simulator_seed: Some(9),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.simulator_seed, Some(9));
        assert_eq!(parsed.uplink, config.uplink);
        assert_eq!(parsed.endpoint, config.endpoint);
    }
}
