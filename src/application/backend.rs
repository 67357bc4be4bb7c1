// Backend trait - the sensor service the monitor polls
use crate::application::clock::BackendClocks;
use crate::domain::telemetry::{MonitorMode, ScoredSample, TelemetrySample};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Every failure at the backend boundary. The poll loop treats all of them alike.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBatch {
    pub rows: Vec<TelemetrySample>,
    pub clocks: BackendClocks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreQuery {
    pub n: u32,
    pub contamination: f64,
    pub model: String,
}

/// Server-side defaults from `GET /config`; any key may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendDefaults {
    pub default_model: Option<String>,
    pub contamination_default: Option<f64>,
    pub view_window_seconds: Option<u32>,
    pub score_window_default: Option<u32>,
    pub history_window_default: Option<u32>,
    pub replay_stride: Option<i64>,
}

/// A single persisted setting for `POST /config`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    Model(String),
    Contamination(f64),
    ViewWindow(u32),
    ScoreWindow(u32),
    ReplayStride(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Export,
    Report,
}

impl DownloadKind {
    pub fn path(&self) -> &'static str {
        match self {
            DownloadKind::Export => "/export",
            DownloadKind::Report => "/report",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportRange {
    Last(u32),
    Between { from: DateTime<Utc>, to: DateTime<Utc> },
}

#[async_trait]
pub trait MonitorBackend: Send + Sync {
    /// Recent raw samples plus the backend's live and replay clocks
    async fn history(&self, n: u32) -> Result<HistoryBatch, FetchError>;

    /// Scored samples for the window, newest first
    async fn scores_for_window(&self, query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError>;

    /// Only the anomalous scored rows
    async fn anomalies(&self, query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError>;

    async fn defaults(&self) -> Result<BackendDefaults, FetchError>;

    async fn persist_config(&self, update: &ConfigUpdate) -> Result<(), FetchError>;

    async fn set_mode(&self, mode: MonitorMode) -> Result<(), FetchError>;

    async fn replay_step(&self, delta: i64) -> Result<(), FetchError>;

    async fn replay_reset(&self) -> Result<(), FetchError>;

    async fn replay_seek(&self, ts: DateTime<Utc>) -> Result<(), FetchError>;

    /// Raw CSV or PDF bytes; the monitor does not interpret them
    async fn download(
        &self,
        kind: DownloadKind,
        range: &ExportRange,
        query: &ScoreQuery,
    ) -> Result<Bytes, FetchError>;
}
