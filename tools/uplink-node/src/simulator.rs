// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor data sources.
//!
//! [`GreenhouseSimulator`] models a greenhouse bed for one plant type:
//! - daily temperature cycle peaking at midday
//! - humidity moving against temperature
//! - soil moisture decaying until automatic irrigation
//! - daylight curve with random cloud cover
//! - slow pH/EC drift corrected by nutrient feeding
//!
//! All values are clamped to the plant profile limits.

use std::f32::consts::PI;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One complete sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
    /// Volumetric soil moisture, percent.
    pub soil_moisture: f32,
    /// Lux.
    pub light: f32,
    pub ph: f32,
    /// mS/cm.
    pub electrical_conductivity: f32,
}

/// Synchronous "read everything" source. Always yields a sample.
pub trait DataSource: Send {
    fn read_all(&mut self) -> SensorReadings;
}

// ---------------------------------------------------------------------------
// Fixed source
// ---------------------------------------------------------------------------

/// Placeholder values for hardware without sensors attached.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub SensorReadings);

impl Default for FixedSource {
    fn default() -> Self {
        Self(SensorReadings {
            temperature: 22.5,
            humidity: 65.0,
            soil_moisture: 50.0,
            light: 20_000.0,
            ph: 6.5,
            electrical_conductivity: 2.0,
        })
    }
}

impl DataSource for FixedSource {
    fn read_all(&mut self) -> SensorReadings {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Plant profiles
// ---------------------------------------------------------------------------

/// Growing range for one plant type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantProfile {
    pub name: &'static str,
    pub temp: Range,
    pub humidity: Range,
    pub soil_moisture_min: f32,
    pub soil_moisture_max: f32,
    pub ph: Range,
    pub ec: Range,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub optimal: f32,
}

const fn range(min: f32, max: f32, optimal: f32) -> Range {
    Range { min, max, optimal }
}

pub static PLANT_PROFILES: [PlantProfile; 4] = [
    PlantProfile {
        name: "tomato",
        temp: range(18.0, 28.0, 23.0),
        humidity: range(60.0, 80.0, 70.0),
        soil_moisture_min: 40.0,
        soil_moisture_max: 80.0,
        ph: range(6.0, 6.8, 6.3),
        ec: range(2.0, 5.0, 3.5),
    },
    PlantProfile {
        name: "lettuce",
        temp: range(15.0, 25.0, 20.0),
        humidity: range(50.0, 70.0, 60.0),
        soil_moisture_min: 50.0,
        soil_moisture_max: 90.0,
        ph: range(6.0, 7.0, 6.5),
        ec: range(1.2, 2.0, 1.6),
    },
    PlantProfile {
        name: "cucumber",
        temp: range(20.0, 30.0, 25.0),
        humidity: range(70.0, 85.0, 75.0),
        soil_moisture_min: 60.0,
        soil_moisture_max: 85.0,
        ph: range(5.5, 6.5, 6.0),
        ec: range(1.7, 2.5, 2.1),
    },
    PlantProfile {
        name: "peppers",
        temp: range(21.0, 29.0, 25.0),
        humidity: range(50.0, 70.0, 60.0),
        soil_moisture_min: 40.0,
        soil_moisture_max: 70.0,
        ph: range(6.2, 6.8, 6.5),
        ec: range(2.0, 3.5, 2.8),
    },
];

impl PlantProfile {
    /// Profile by name; `None` for unknown plants.
    pub fn find(name: &str) -> Option<&'static PlantProfile> {
        PLANT_PROFILES.iter().find(|p| p.name == name)
    }

    /// Profile by name, falling back to tomato.
    pub fn find_or_default(name: &str) -> &'static PlantProfile {
        Self::find(name).unwrap_or_else(|| {
            tracing::warn!(plant = name, "Unknown plant type, using tomato profile");
            &PLANT_PROFILES[0]
        })
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// ±°C swing of the daily temperature cycle.
const DAILY_TEMP_VARIATION: f32 = 4.0;
/// Soil moisture lost per hour, percentage points.
const MOISTURE_DECAY_PER_HOUR: f32 = 0.8;
/// Irrigate once moisture falls this close to the profile minimum.
const IRRIGATION_MARGIN: f32 = 5.0;
/// Midday light at full sun, lux.
const PEAK_LIGHT: f32 = 50_000.0;
const CLOUD_PROBABILITY: f32 = 0.2;

const SECS_PER_HOUR: f32 = 3600.0;

/// Point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimInstant {
    /// Seconds since an arbitrary epoch; only differences matter.
    pub elapsed_secs: f64,
    /// Local hour of day in `[0, 24)`.
    pub hour_of_day: f32,
}

impl SimInstant {
    /// Current wall-clock instant shifted by `utc_offset_hours`.
    pub fn now(utc_offset_hours: i8) -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        let local = since_epoch + f64::from(utc_offset_hours) * 3600.0;
        let hour_of_day = (local.rem_euclid(86_400.0) / 3600.0) as f32;
        Self {
            elapsed_secs: since_epoch,
            hour_of_day,
        }
    }
}

/// Greenhouse model for one plant bed.
#[derive(Debug)]
pub struct GreenhouseSimulator {
    profile: &'static PlantProfile,
    rng: fastrand::Rng,
    utc_offset_hours: i8,
    base_temperature: f32,
    base_humidity: f32,
    soil_moisture: f32,
    ph: f32,
    ec: f32,
    last_update: Option<f64>,
    last_feeding: Option<f64>,
    irrigations: u32,
    feedings: u32,
}

impl GreenhouseSimulator {
    pub fn new(plant_type: &str, seed: Option<u64>) -> Self {
        let profile = PlantProfile::find_or_default(plant_type);
        let mut rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let base_temperature = profile.temp.optimal + uniform(&mut rng, -2.0, 2.0);
        let base_humidity = profile.humidity.optimal + uniform(&mut rng, -5.0, 5.0);
        let soil_moisture = (profile.soil_moisture_min + profile.soil_moisture_max) / 2.0;
        let ph = profile.ph.optimal + uniform(&mut rng, -0.2, 0.2);
        let ec = profile.ec.optimal + uniform(&mut rng, -0.3, 0.3);

        tracing::info!(
            plant = profile.name,
            base_temperature = format_args!("{:.1}", base_temperature),
            base_humidity = format_args!("{:.1}", base_humidity),
            "Greenhouse simulator initialized"
        );

        Self {
            profile,
            rng,
            utc_offset_hours: 0,
            base_temperature,
            base_humidity,
            soil_moisture,
            ph,
            ec,
            last_update: None,
            last_feeding: None,
            irrigations: 0,
            feedings: 0,
        }
    }

    pub fn with_utc_offset(mut self, hours: i8) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    #[cfg(test)]
    fn irrigations(&self) -> u32 {
        self.irrigations
    }

    /// Sample the model at `at`.
    pub fn read_at(&mut self, at: SimInstant) -> SensorReadings {
        let p = self.profile;
        let hours_elapsed = self
            .last_update
            .map(|t| ((at.elapsed_secs - t).max(0.0) as f32) / SECS_PER_HOUR)
            .unwrap_or(0.0);
        self.last_update = Some(at.elapsed_secs);
        let last_feeding = *self.last_feeding.get_or_insert(at.elapsed_secs);
        let hours_since_feeding = ((at.elapsed_secs - last_feeding).max(0.0) as f32) / SECS_PER_HOUR;

        // -1..1, lowest at midnight, highest at noon
        let cycle = ((at.hour_of_day - 6.0) * PI / 12.0).sin();

        let temperature = (self.base_temperature
            + cycle * DAILY_TEMP_VARIATION
            + self.uniform(-0.5, 0.5))
        .clamp(p.temp.min, p.temp.max);

        let humidity = (self.base_humidity - cycle * 0.5 * 10.0 + self.uniform(-2.0, 2.0))
            .clamp(p.humidity.min, p.humidity.max);

        self.soil_moisture = (self.soil_moisture - hours_elapsed * MOISTURE_DECAY_PER_HOUR)
            .max(p.soil_moisture_min);
        if self.soil_moisture < p.soil_moisture_min + IRRIGATION_MARGIN {
            self.irrigate();
        }
        let soil_moisture = self.soil_moisture + self.uniform(-1.0, 1.0);

        let mut light = 0.0;
        if (6.0..=18.0).contains(&at.hour_of_day) {
            light = cycle * PEAK_LIGHT;
            if self.uniform(0.0, 1.0) < CLOUD_PROBABILITY {
                light *= self.uniform(0.3, 0.7);
            }
        }
        let light = (light + self.uniform(-2000.0, 2000.0)).max(0.0);

        self.ph = (self.ph + self.uniform(-0.02, 0.02) + hours_since_feeding * 0.001)
            .clamp(p.ph.min, p.ph.max);
        let ph = self.ph + self.uniform(-0.05, 0.05);

        self.ec = (self.ec - hours_elapsed * 0.02).max(p.ec.min);
        if self.ec < p.ec.optimal - 0.5 {
            self.feed(at.elapsed_secs);
        }
        let electrical_conductivity = self.ec + self.uniform(-0.1, 0.1);

        SensorReadings {
            temperature,
            humidity,
            soil_moisture,
            light,
            ph,
            electrical_conductivity,
        }
    }

    fn irrigate(&mut self) {
        let added = self.uniform(15.0, 25.0);
        self.soil_moisture = (self.soil_moisture + added).min(self.profile.soil_moisture_max);
        self.irrigations += 1;
        tracing::info!(
            soil_moisture = format_args!("{:.1}", self.soil_moisture),
            count = self.irrigations,
            "[EVENT] Irrigation triggered"
        );
    }

    fn feed(&mut self, now: f64) {
        self.last_feeding = Some(now);
        self.ph = self.profile.ph.optimal + self.uniform(-0.1, 0.1);
        let added = self.uniform(0.5, 1.0);
        self.ec = (self.ec + added).min(self.profile.ec.max);
        self.feedings += 1;
        tracing::info!(
            ec = format_args!("{:.2}", self.ec),
            count = self.feedings,
            "[EVENT] Nutrient feeding"
        );
    }

    fn uniform(&mut self, min: f32, max: f32) -> f32 {
        uniform(&mut self.rng, min, max)
    }
}

impl DataSource for GreenhouseSimulator {
    fn read_all(&mut self) -> SensorReadings {
        let now = SimInstant::now(self.utc_offset_hours);
        self.read_at(now)
    }
}

fn uniform(rng: &mut fastrand::Rng, min: f32, max: f32) -> f32 {
    min + rng.f32() * (max - min)
}
