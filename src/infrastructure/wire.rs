// Wire payloads - backend JSON shapes and their coercion into domain types
use crate::application::backend::{BackendDefaults, ConfigUpdate, HistoryBatch};
use crate::application::clock::BackendClocks;
use crate::domain::telemetry::{ScoredSample, TelemetrySample};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

/// Either a bare array of rows or an object wrapping them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RowsPayload {
    Bare(Vec<WireRow>),
    Wrapped(RowsEnvelope),
}

#[derive(Debug, Deserialize)]
pub struct RowsEnvelope {
    #[serde(default)]
    rows: Vec<WireRow>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    server_now: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    replay_now: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WireRow {
    timestamp: String,
    #[serde(deserialize_with = "lenient_f64")]
    temperature: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pressure: f64,
    #[serde(deserialize_with = "lenient_f64")]
    motor_speed: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    anomaly_score: Option<f64>,
    #[serde(default)]
    is_anomaly: Option<bool>,
}

impl WireRow {
    pub fn to_sample(&self) -> Result<TelemetrySample, String> {
        Ok(TelemetrySample::new(
            parse_timestamp(&self.timestamp)?,
            self.temperature,
            self.pressure,
            self.motor_speed,
        ))
    }

    pub fn to_scored(&self) -> Result<ScoredSample, String> {
        Ok(ScoredSample::new(
            self.to_sample()?,
            self.anomaly_score.unwrap_or(0.0),
            self.is_anomaly.unwrap_or(false),
        ))
    }
}

impl RowsPayload {
    fn into_parts(self) -> (Vec<WireRow>, BackendClocks) {
        match self {
            RowsPayload::Bare(rows) => (rows, BackendClocks::default()),
            RowsPayload::Wrapped(envelope) => {
                let clocks = BackendClocks {
                    server_now: envelope.server_now.and_then(epoch_ms),
                    replay_now: envelope.replay_now.and_then(epoch_ms),
                };
                (envelope.rows, clocks)
            }
        }
    }

    pub fn into_history(self) -> Result<HistoryBatch, String> {
        let (rows, clocks) = self.into_parts();
        let rows = rows
            .iter()
            .map(WireRow::to_sample)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HistoryBatch { rows, clocks })
    }

    pub fn into_scored(self) -> Result<Vec<ScoredSample>, String> {
        let (rows, _) = self.into_parts();
        rows.iter().map(WireRow::to_scored).collect()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct WireConfig {
    #[serde(default)]
    default_model: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    contamination_default: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    view_window_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    score_window_default: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    history_window_default: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    replay_stride: Option<f64>,
}

impl From<WireConfig> for BackendDefaults {
    fn from(wire: WireConfig) -> Self {
        let whole = |v: Option<f64>| v.filter(|v| v.is_finite() && *v >= 1.0).map(|v| v as u32);
        BackendDefaults {
            default_model: wire.default_model.filter(|m| !m.trim().is_empty()),
            contamination_default: wire.contamination_default,
            view_window_seconds: whole(wire.view_window_seconds),
            score_window_default: whole(wire.score_window_default),
            history_window_default: whole(wire.history_window_default),
            replay_stride: wire.replay_stride.filter(|v| v.is_finite()).map(|v| v as i64),
        }
    }
}

/// Body for `POST /config`. Contamination always goes out with 3 decimals.
pub fn config_body(update: &ConfigUpdate) -> Value {
    let mut body = Map::new();
    let (key, value) = match update {
        ConfigUpdate::Model(model) => ("default_model", json!(model)),
        ConfigUpdate::Contamination(c) => ("contamination_default", json!(format_contamination(*c))),
        ConfigUpdate::ViewWindow(v) => ("view_window_seconds", json!(v)),
        ConfigUpdate::ScoreWindow(v) => ("score_window_default", json!(v)),
        ConfigUpdate::ReplayStride(v) => ("replay_stride", json!(v)),
    };
    body.insert(key.to_string(), value);
    Value::Object(body)
}

pub fn format_contamination(c: f64) -> String {
    format!("{:.3}", c)
}

/// ISO-8601 UTC on the wire; offsets are normalised and naive times read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{}'", raw))
}

fn epoch_ms(ms: f64) -> Option<DateTime<Utc>> {
    // 0 means "no clock" on the wire
    if !ms.is_finite() || ms <= 0.0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

fn coerce_f64(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| format!("bad number {}", n)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("expected a number, got '{}'", s)),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        other => Err(format!("expected a number, got {}", other)),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    coerce_f64(&value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("missing numeric value"))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    coerce_f64(&value).map_err(serde::de::Error::custom)
}
