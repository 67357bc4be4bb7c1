// Monitor state - the single mutable state object and per-tick processing
use crate::application::backend::{BackendDefaults, ConfigUpdate, FetchError, HistoryBatch, ScoreQuery};
use crate::application::clock::{Clock, ClockSource};
use crate::application::poll_cycle::{Backoff, Generation, PollCycleState};
use crate::application::renderer::Renderer;
use crate::domain::alert::{AlertDebouncer, AlertDecision, AlertPolicy};
use crate::domain::status::{anomaly_table, badge_for, status_for, LatestReadings};
use crate::domain::telemetry::{sort_ascending, MonitorMode, ScoredSample, TimeWindow};
use crate::domain::window::WindowFrame;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const MIN_CONTAMINATION: f64 = 0.001;
const MAX_CONTAMINATION: f64 = 0.5;
const DEFAULT_WINDOW: NonZeroU32 = NonZeroU32::new(60).unwrap();

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub view_seconds: NonZeroU32,
    pub score_window: NonZeroU32,
    pub history_window: NonZeroU32,
    pub contamination: f64,
    pub model: String,
    pub replay_stride: i64,
    /// Badge only counts anomalies whose second is plotted in the window.
    pub badge_visible_only: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            view_seconds: DEFAULT_WINDOW,
            score_window: DEFAULT_WINDOW,
            history_window: DEFAULT_WINDOW,
            contamination: 0.05,
            model: "iforest".to_string(),
            replay_stride: 1,
            badge_visible_only: false,
        }
    }
}

impl MonitorSettings {
    pub fn score_query(&self) -> ScoreQuery {
        ScoreQuery {
            n: self.score_window.get(),
            contamination: self.contamination,
            model: self.model.clone(),
        }
    }

    /// Overlay whatever the backend reported; zero or missing values keep ours.
    pub fn apply_defaults(&mut self, defaults: &BackendDefaults) {
        if let Some(model) = &defaults.default_model {
            self.model = model.to_lowercase();
        }
        if let Some(c) = defaults.contamination_default.filter(|c| *c > 0.0) {
            self.contamination = clamp_contamination(c);
        }
        if let Some(v) = defaults.view_window_seconds.and_then(NonZeroU32::new) {
            self.view_seconds = v;
        }
        if let Some(v) = defaults.score_window_default.and_then(NonZeroU32::new) {
            self.score_window = v;
        }
        if let Some(v) = defaults.history_window_default.and_then(NonZeroU32::new) {
            self.history_window = v;
        }
        if let Some(stride) = defaults.replay_stride.filter(|s| *s != 0) {
            self.replay_stride = stride.abs();
        }
    }
}

pub fn clamp_contamination(c: f64) -> f64 {
    c.clamp(MIN_CONTAMINATION, MAX_CONTAMINATION)
}

/// Request parameters captured when a tick starts. Settings changed while the
/// tick is in flight apply to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTicket {
    pub generation: Generation,
    pub history_n: u32,
    pub score_query: ScoreQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Applied { redrawn: bool },
    Stale,
}

pub struct MonitorState {
    settings: MonitorSettings,
    clock_source: ClockSource,
    poll: PollCycleState,
    alerts: AlertDebouncer,
    renderer: Box<dyn Renderer>,
    wall: Arc<dyn Clock>,
}

impl MonitorState {
    pub fn new(
        settings: MonitorSettings,
        policy: AlertPolicy,
        backoff: Backoff,
        renderer: Box<dyn Renderer>,
        wall: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            clock_source: ClockSource::new(MonitorMode::Live),
            poll: PollCycleState::new(backoff),
            alerts: AlertDebouncer::new(policy),
            renderer,
            wall,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn mode(&self) -> MonitorMode {
        self.clock_source.mode()
    }

    pub fn backoff_ms(&self) -> u64 {
        self.poll.backoff.current_ms()
    }

    pub fn next_delay(&self) -> Duration {
        self.poll.backoff.delay()
    }

    pub fn reset_backoff(&mut self) {
        self.poll.backoff.reset();
    }

    pub fn begin_tick(&mut self) -> TickTicket {
        TickTicket {
            generation: self.poll.next_generation(),
            history_n: self.settings.view_seconds.get(),
            score_query: self.settings.score_query(),
        }
    }

    /// Accepts a tick's payloads if its generation is still current. Chart
    /// updates go through the redraw gate; everything else runs every tick.
    pub fn apply_tick(
        &mut self,
        generation: Generation,
        history: HistoryBatch,
        scored: Vec<ScoredSample>,
    ) -> TickOutcome {
        if !self.poll.is_current(generation) {
            tracing::debug!("Discarding superseded tick {}", generation.value());
            return TickOutcome::Stale;
        }

        let wall_now = self.wall.now();
        let mut samples = history.rows;
        sort_ascending(&mut samples);
        let newest = samples.last().map(|s| s.timestamp);

        let reference_now = self.clock_source.reference_now(history.clocks, newest, wall_now);
        let window = TimeWindow::new(self.settings.view_seconds, reference_now);
        let cutoff = window.cutoff();

        self.renderer.update_latest(&LatestReadings::from_history(&samples));

        let redrawn = self.poll.gate.should_redraw(newest, cutoff);
        let frame = (redrawn || self.settings.badge_visible_only)
            .then(|| WindowFrame::build(&samples, &scored, window));
        if let Some(frame) = frame.as_ref().filter(|_| redrawn) {
            if frame.used_fallback {
                tracing::debug!("Sparse window, plotting newest pair of samples");
            }
            self.renderer.update_series(&frame.charts());
            self.poll.gate.record(newest, cutoff);
        }

        let visible = frame
            .as_ref()
            .filter(|_| self.settings.badge_visible_only)
            .map(WindowFrame::visible_seconds);
        self.renderer.update_badge(badge_for(&scored, visible));

        match self.alerts.observe(&scored, wall_now) {
            AlertDecision::Show { max_score, message } => {
                self.renderer.show_alert(max_score, &message);
            }
            AlertDecision::Hide => self.renderer.hide_alert(),
            AlertDecision::Unchanged => {}
        }

        self.renderer.update_status(status_for(&scored));
        self.renderer.update_table(&anomaly_table(&scored));

        let last_sample = newest
            .map(|ts| ts.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--".to_string());
        self.renderer.set_status_text(&format!(
            "Updated at {} • last sample (UTC): {}",
            wall_now.format("%H:%M:%S"),
            last_sample
        ));

        self.poll.backoff.on_success();
        TickOutcome::Applied { redrawn }
    }

    /// Returns false when the failure belonged to a superseded tick.
    pub fn fail_tick(&mut self, generation: Generation, error: &FetchError) -> bool {
        if !self.poll.is_current(generation) {
            tracing::debug!("Ignoring failure of superseded tick {}", generation.value());
            return false;
        }
        self.poll.backoff.on_failure();
        tracing::warn!(
            "Poll failed: {} (next attempt in {} ms)",
            error,
            self.poll.backoff.current_ms()
        );
        self.renderer
            .set_status_text(&format!("Update error: {}. Retrying...", error));
        true
    }

    pub fn acknowledge(&mut self) {
        if let AlertDecision::Hide = self.alerts.acknowledge(self.wall.now()) {
            self.renderer.hide_alert();
        }
    }

    /// Back to startup values for the new mode; in-flight ticks become stale.
    pub fn switch_mode(&mut self, mode: MonitorMode) {
        self.poll.reset();
        self.alerts.reset();
        self.clock_source.set_mode(mode);
        self.renderer.reset();
    }

    /// Replay navigation moved the replay clock; let the window follow it back.
    pub fn rewind_clock(&mut self) {
        self.clock_source.rewind();
    }

    pub fn apply_defaults(&mut self, defaults: &BackendDefaults) {
        self.settings.apply_defaults(defaults);
    }

    pub fn set_view_seconds(&mut self, seconds: u32) -> Option<ConfigUpdate> {
        let seconds = NonZeroU32::new(seconds)?;
        self.settings.view_seconds = seconds;
        Some(ConfigUpdate::ViewWindow(seconds.get()))
    }

    pub fn set_score_window(&mut self, n: u32) -> Option<ConfigUpdate> {
        let n = NonZeroU32::new(n)?;
        self.settings.score_window = n;
        Some(ConfigUpdate::ScoreWindow(n.get()))
    }

    pub fn set_contamination(&mut self, c: f64) -> Option<ConfigUpdate> {
        if !c.is_finite() || c <= 0.0 {
            return None;
        }
        self.settings.contamination = clamp_contamination(c);
        Some(ConfigUpdate::Contamination(self.settings.contamination))
    }

    pub fn set_model(&mut self, model: &str) -> Option<ConfigUpdate> {
        let model = model.trim().to_lowercase();
        if model.is_empty() {
            return None;
        }
        self.settings.model = model.clone();
        Some(ConfigUpdate::Model(model))
    }

    pub fn set_replay_stride(&mut self, stride: i64) -> Option<ConfigUpdate> {
        if stride == 0 {
            return None;
        }
        self.settings.replay_stride = stride.abs();
        Some(ConfigUpdate::ReplayStride(self.settings.replay_stride))
    }

    /// Table refresh outside the poll loop, from `/anomalies`.
    pub fn show_table(&mut self, anomalies: &[ScoredSample]) {
        self.renderer.update_table(&anomaly_table(anomalies));
    }

    pub fn report(&mut self, text: &str) {
        self.renderer.set_status_text(text);
    }
}
