// In-memory fakes shared by the application tests
use crate::application::backend::{
    BackendDefaults, ConfigUpdate, DownloadKind, ExportRange, FetchError, HistoryBatch,
    MonitorBackend, ScoreQuery,
};
use crate::application::clock::{BackendClocks, Clock};
use crate::application::renderer::Renderer;
use crate::domain::chart::ChartData;
use crate::domain::status::{AnomalyTable, LatestReadings, SystemStatus};
use crate::domain::telemetry::{MonitorMode, ScoredSample, TelemetrySample};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn sample(secs: i64, temperature: f64) -> TelemetrySample {
    TelemetrySample::new(at(secs), temperature, 1.0, 1500.0)
}

pub fn scored(secs: i64, score: f64, anomalous: bool) -> ScoredSample {
    ScoredSample::new(sample(secs, 20.0), score, anomalous)
}

pub fn batch(seconds: &[i64], temperature: f64, server_now: i64) -> HistoryBatch {
    HistoryBatch {
        rows: seconds.iter().map(|s| sample(*s, temperature)).collect(),
        clocks: BackendClocks {
            server_now: Some(at(server_now)),
            replay_now: None,
        },
    }
}

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Series(Vec<ChartData>),
    Badge(bool),
    Status(SystemStatus),
    Table(AnomalyTable),
    Latest(LatestReadings),
    ShowAlert(String),
    HideAlert,
    StatusText(String),
    Reset,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn series_updates(&self) -> Vec<Vec<ChartData>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Series(charts) => Some(charts),
                _ => None,
            })
            .collect()
    }

    pub fn status_updates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RenderCall::Status(_)))
            .count()
    }

    pub fn last_status(&self) -> Option<SystemStatus> {
        self.calls().into_iter().rev().find_map(|c| match c {
            RenderCall::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn last_badge(&self) -> Option<bool> {
        self.calls().into_iter().rev().find_map(|c| match c {
            RenderCall::Badge(b) => Some(b),
            _ => None,
        })
    }

    pub fn last_status_text(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|c| match c {
            RenderCall::StatusText(t) => Some(t),
            _ => None,
        })
    }

    fn push(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn update_series(&mut self, charts: &[ChartData]) {
        self.push(RenderCall::Series(charts.to_vec()));
    }

    fn update_badge(&mut self, anomaly_present: bool) {
        self.push(RenderCall::Badge(anomaly_present));
    }

    fn update_status(&mut self, status: SystemStatus) {
        self.push(RenderCall::Status(status));
    }

    fn update_table(&mut self, table: &AnomalyTable) {
        self.push(RenderCall::Table(table.clone()));
    }

    fn update_latest(&mut self, readings: &LatestReadings) {
        self.push(RenderCall::Latest(readings.clone()));
    }

    fn show_alert(&mut self, _max_score: f64, message: &str) {
        self.push(RenderCall::ShowAlert(message.to_string()));
    }

    fn hide_alert(&mut self) {
        self.push(RenderCall::HideAlert);
    }

    fn set_status_text(&mut self, text: &str) {
        self.push(RenderCall::StatusText(text.to_string()));
    }

    fn reset(&mut self) {
        self.push(RenderCall::Reset);
    }
}

/// Scripted history responses: each entry is served once, after its delay.
/// With the script exhausted the default batch is returned, or an error when
/// `failing` is set.
#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<VecDeque<(Duration, HistoryBatch)>>,
    default_history: Mutex<HistoryBatch>,
    scores: Mutex<Vec<ScoredSample>>,
    pub failing: AtomicBool,
    pub reject_steps: AtomicBool,
    pub history_calls: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_history(history: HistoryBatch) -> Self {
        let backend = Self::default();
        *backend.default_history.lock().unwrap() = history;
        backend
    }

    pub fn script(&self, delay: Duration, history: HistoryBatch) {
        self.script.lock().unwrap().push_back((delay, history));
    }

    pub fn set_scores(&self, scores: Vec<ScoredSample>) {
        *self.scores.lock().unwrap() = scores;
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl MonitorBackend for FakeBackend {
    async fn history(&self, n: u32) -> Result<HistoryBatch, FetchError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("history n={}", n));

        let scripted = self.script.lock().unwrap().pop_front();
        if let Some((delay, history)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(history);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Transport {
                url: "fake://history".into(),
                message: "connection refused".into(),
            });
        }
        Ok(self.default_history.lock().unwrap().clone())
    }

    async fn scores_for_window(&self, _query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError> {
        Ok(self.scores.lock().unwrap().clone())
    }

    async fn anomalies(&self, query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError> {
        self.record(format!("anomalies n={}", query.n));
        let scores = self.scores.lock().unwrap().clone();
        Ok(scores.into_iter().filter(|r| r.is_anomaly).collect())
    }

    async fn defaults(&self) -> Result<BackendDefaults, FetchError> {
        Ok(BackendDefaults {
            view_window_seconds: Some(120),
            default_model: Some("lstm".into()),
            ..BackendDefaults::default()
        })
    }

    async fn persist_config(&self, update: &ConfigUpdate) -> Result<(), FetchError> {
        self.record(format!("config {:?}", update));
        Ok(())
    }

    async fn set_mode(&self, mode: MonitorMode) -> Result<(), FetchError> {
        self.record(format!("mode {}", mode.as_str()));
        Ok(())
    }

    async fn replay_step(&self, delta: i64) -> Result<(), FetchError> {
        self.record(format!("step {}", delta));
        if self.reject_steps.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                status: 400,
                url: "fake://replay/step".into(),
            });
        }
        Ok(())
    }

    async fn replay_reset(&self) -> Result<(), FetchError> {
        self.record("reset".into());
        Ok(())
    }

    async fn replay_seek(&self, ts: DateTime<Utc>) -> Result<(), FetchError> {
        self.record(format!("seek {}", ts.to_rfc3339()));
        Ok(())
    }

    async fn download(
        &self,
        kind: DownloadKind,
        _range: &ExportRange,
        _query: &ScoreQuery,
    ) -> Result<Bytes, FetchError> {
        self.record(format!("download {}", kind.path()));
        Ok(Bytes::from_static(b"id,timestamp\n"))
    }
}
