// Status and badge aggregation over the scored window
use super::telemetry::{ScoredSample, TelemetrySample};
use super::window::utc_label;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

const TABLE_LIMIT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Nominal,
    Warning,
    Critical,
}

impl SystemStatus {
    pub fn from_anomaly_count(count: usize) -> Self {
        match count {
            0 => SystemStatus::Nominal,
            1 | 2 => SystemStatus::Warning,
            _ => SystemStatus::Critical,
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SystemStatus::Nominal => "NOMINAL",
            SystemStatus::Warning => "WARNING",
            SystemStatus::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

pub fn status_for(scored: &[ScoredSample]) -> SystemStatus {
    SystemStatus::from_anomaly_count(scored.iter().filter(|r| r.is_anomaly).count())
}

/// Single "anomaly present" flag shared by every metric badge and the global
/// dot. With `visible_seconds`, only rows whose whole-second timestamp is
/// currently plotted count.
pub fn badge_for(scored: &[ScoredSample], visible_seconds: Option<&HashSet<i64>>) -> bool {
    scored.iter().any(|r| {
        r.is_anomaly && visible_seconds.is_none_or(|secs| secs.contains(&r.timestamp().timestamp()))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.20 {
            Severity::High
        } else if score >= 0.10 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRow {
    pub time: String,
    pub temperature: String,
    pub pressure: String,
    pub motor_speed: String,
    pub score: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyTable {
    pub last_anomaly: String,
    pub rows: Vec<AnomalyRow>,
}

/// Anomalous rows, most severe first, capped for display.
pub fn anomaly_table(scored: &[ScoredSample]) -> AnomalyTable {
    let mut anomalous: Vec<&ScoredSample> = scored.iter().filter(|r| r.is_anomaly).collect();
    anomalous.sort_by(|a, b| {
        b.anomaly_score
            .partial_cmp(&a.anomaly_score)
            .unwrap_or(Ordering::Equal)
    });

    let last_anomaly = anomalous
        .first()
        .map(|r| utc_label(r.timestamp()))
        .unwrap_or_else(|| "None in window".to_string());

    let rows = anomalous
        .into_iter()
        .take(TABLE_LIMIT)
        .map(|r| AnomalyRow {
            time: utc_label(r.timestamp()),
            temperature: format!("{:.2}", r.sample.temperature),
            pressure: format!("{:.2}", r.sample.pressure),
            motor_speed: format!("{:.0}", r.sample.motor_speed),
            score: format!("{:.3}", r.anomaly_score),
            severity: Severity::from_score(r.anomaly_score),
        })
        .collect();

    AnomalyTable { last_anomaly, rows }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestReadings {
    pub temperature: String,
    pub pressure: String,
    pub motor_speed: String,
}

impl LatestReadings {
    pub fn placeholder() -> Self {
        Self {
            temperature: "--".to_string(),
            pressure: "--".to_string(),
            motor_speed: "--".to_string(),
        }
    }

    /// `history` sorted oldest first.
    pub fn from_history(history: &[TelemetrySample]) -> Self {
        match history.last() {
            Some(latest) => Self {
                temperature: format!("{:.1} °C", latest.temperature),
                pressure: format!("{:.2} bar", latest.pressure),
                motor_speed: format!("{:.0} RPM", latest.motor_speed),
            },
            None => Self::placeholder(),
        }
    }
}
