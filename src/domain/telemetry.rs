// Telemetry data domain models
use chrono::{DateTime, Duration, Utc};
use std::num::NonZeroU32;

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub pressure: f64,
    pub motor_speed: f64,
}

impl TelemetrySample {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, pressure: f64, motor_speed: f64) -> Self {
        Self {
            timestamp,
            temperature,
            pressure,
            motor_speed,
        }
    }

    /// Same readings, shifted to another instant
    pub fn at(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSample {
    pub sample: TelemetrySample,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

impl ScoredSample {
    pub fn new(sample: TelemetrySample, anomaly_score: f64, is_anomaly: bool) -> Self {
        Self {
            sample,
            anomaly_score,
            is_anomaly,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.sample.timestamp
    }
}

/// Sorts samples oldest first. The backend does not guarantee wire order.
pub fn sort_ascending(samples: &mut [TelemetrySample]) {
    samples.sort_by_key(|s| s.timestamp);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    Live,
    Replay,
}

impl MonitorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorMode::Live => "live",
            MonitorMode::Replay => "replay",
        }
    }
}

/// Trailing view window anchored at a reference instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    view_seconds: u32,
    reference_now: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(view_seconds: NonZeroU32, reference_now: DateTime<Utc>) -> Self {
        Self {
            view_seconds: view_seconds.get(),
            reference_now,
        }
    }

    pub fn view_seconds(&self) -> u32 {
        self.view_seconds
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.reference_now - Duration::seconds(i64::from(self.view_seconds))
    }

    /// Inclusive on both ends: `[cutoff, reference_now]`.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.cutoff() && timestamp <= self.reference_now
    }

    /// Plot coordinate: 0 at the far edge of the window, `view_seconds` at "now".
    pub fn x_of(&self, timestamp: DateTime<Utc>) -> f64 {
        let seconds_ago = (self.reference_now - timestamp).num_milliseconds() as f64 / 1000.0;
        f64::from(self.view_seconds) - seconds_ago
    }
}
