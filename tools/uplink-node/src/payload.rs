// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON telemetry body.

use serde::Serialize;

use crate::simulator::SensorReadings;

/// Wire shape expected by the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryPayload<'a> {
    pub api_key: &'a str,
    pub node_id: &'a str,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub light: u32,
    pub ph: f64,
    pub ec: f64,
}

impl<'a> TelemetryPayload<'a> {
    pub fn new(api_key: &'a str, node_id: &'a str, r: &SensorReadings) -> Self {
        Self {
            api_key,
            node_id,
            temperature: round_to(r.temperature, 1),
            humidity: round_to(r.humidity, 1),
            soil_moisture: round_to(r.soil_moisture, 1),
            light: r.light.max(0.0).round() as u32,
            ph: round_to(r.ph, 2),
            ec: round_to(r.electrical_conductivity, 2),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn round_to(value: f32, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (f64::from(value) * scale).round() / scale
}
