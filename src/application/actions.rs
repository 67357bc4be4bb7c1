// Monitor actions - use cases behind the operator's controls
use crate::application::backend::{ConfigUpdate, DownloadKind, ExportRange, FetchError};
use crate::application::scheduler::PollingScheduler;
use crate::domain::telemetry::MonitorMode;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

#[derive(Clone)]
pub struct MonitorActions {
    scheduler: PollingScheduler,
    export_dir: PathBuf,
}

impl MonitorActions {
    pub fn new(scheduler: PollingScheduler, export_dir: PathBuf) -> Self {
        Self {
            scheduler,
            export_dir,
        }
    }

    /// Pulls server-side defaults once at startup. Unreachable config is not fatal.
    pub async fn load_defaults(&self) {
        match self.scheduler.backend().defaults().await {
            Ok(defaults) => {
                tracing::info!("Loaded backend defaults: {:?}", defaults);
                self.scheduler.with_state(|s| s.apply_defaults(&defaults));
            }
            Err(e) => tracing::warn!("Using local defaults, config fetch failed: {}", e),
        }
    }

    pub fn acknowledge(&self) {
        self.scheduler.with_state(|s| s.acknowledge());
    }

    pub fn start(&self) {
        self.scheduler.start();
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Switches the backend mode, then restarts polling from a clean state.
    pub async fn set_mode(&self, mode: MonitorMode) -> anyhow::Result<()> {
        self.scheduler
            .backend()
            .set_mode(mode)
            .await
            .with_context(|| format!("Failed to switch to {} mode", mode.as_str()))?;

        self.scheduler.stop();
        self.scheduler.with_state(|s| s.switch_mode(mode));
        self.scheduler.start();
        tracing::info!("Switched to {} mode", mode.as_str());
        Ok(())
    }

    async fn ensure_replay(&self) -> anyhow::Result<()> {
        if self.scheduler.with_state(|s| s.mode()) != MonitorMode::Replay {
            self.set_mode(MonitorMode::Replay).await?;
        }
        Ok(())
    }

    /// Steps the replay cursor by `strides` times the configured stride.
    /// A rejected step is reported but leaves polling alone.
    pub async fn replay_step(&self, strides: i64) {
        if let Err(e) = self.ensure_replay().await {
            self.report(&format!("Step error: {:#}", e));
            return;
        }

        let stride = self.scheduler.with_state(|s| s.settings().replay_stride);
        let delta = strides.saturating_mul(stride);
        match self.scheduler.backend().replay_step(delta).await {
            Ok(()) => {
                self.scheduler.with_state(|s| s.rewind_clock());
                self.scheduler.refresh().await;
            }
            Err(FetchError::Status { status, .. }) => {
                self.report(&format!("Step failed: HTTP {}", status));
            }
            Err(e) => self.report(&format!("Step error: {}", e)),
        }
    }

    pub async fn replay_reset(&self) {
        if let Err(e) = self.scheduler.backend().replay_reset().await {
            self.report(&format!("Reset error: {}", e));
            return;
        }
        self.scheduler.with_state(|s| {
            s.reset_backoff();
            s.rewind_clock();
        });
        self.scheduler.refresh().await;
    }

    pub async fn replay_seek(&self, ts: DateTime<Utc>) {
        if let Err(e) = self.set_mode(MonitorMode::Replay).await {
            self.report(&format!("Seek error: {:#}", e));
            return;
        }
        if let Err(e) = self.scheduler.backend().replay_seek(ts).await {
            self.report(&format!("Seek error: {}", e));
            return;
        }
        self.scheduler.with_state(|s| s.rewind_clock());
        self.scheduler.refresh().await;
    }

    pub async fn set_view_seconds(&self, seconds: u32) -> anyhow::Result<()> {
        let update = self
            .scheduler
            .with_state(|s| s.set_view_seconds(seconds))
            .context("View window must be a positive number of seconds")?;
        self.persist(update);
        self.scheduler.refresh().await;
        Ok(())
    }

    pub async fn set_score_window(&self, n: u32) -> anyhow::Result<()> {
        let update = self
            .scheduler
            .with_state(|s| s.set_score_window(n))
            .context("Score window must be positive")?;
        self.persist(update);
        self.refresh_table().await;
        Ok(())
    }

    pub async fn set_model(&self, model: &str) -> anyhow::Result<()> {
        let update = self
            .scheduler
            .with_state(|s| s.set_model(model))
            .context("Model name must not be empty")?;
        self.persist(update);
        self.scheduler.refresh().await;
        Ok(())
    }

    pub async fn set_contamination(&self, c: f64) -> anyhow::Result<()> {
        let update = self
            .scheduler
            .with_state(|s| s.set_contamination(c))
            .context("Contamination must be a positive number")?;
        self.persist(update);
        self.scheduler.refresh().await;
        Ok(())
    }

    pub fn set_replay_stride(&self, stride: i64) -> anyhow::Result<()> {
        let update = self
            .scheduler
            .with_state(|s| s.set_replay_stride(stride))
            .context("Replay stride must be non-zero")?;
        self.persist(update);
        Ok(())
    }

    /// Re-reads the anomaly table from `/anomalies`; failures only get logged.
    pub async fn refresh_table(&self) {
        let query = self.scheduler.with_state(|s| s.settings().score_query());
        match self.scheduler.backend().anomalies(&query).await {
            Ok(rows) => self.scheduler.with_state(|s| s.show_table(&rows)),
            Err(e) => tracing::warn!("Anomaly table refresh failed: {}", e),
        }
    }

    /// Saves an export or report to the output directory and returns its path.
    pub async fn download(
        &self,
        kind: DownloadKind,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> anyhow::Result<PathBuf> {
        let (range, query) = self.scheduler.with_state(|s| {
            let range = match range {
                Some((from, to)) => ExportRange::Between { from, to },
                None => ExportRange::Last(s.settings().history_window.get()),
            };
            (range, s.settings().score_query())
        });

        let body = self
            .scheduler
            .backend()
            .download(kind, &range, &query)
            .await
            .context("Download failed")?;

        let file_name = match kind {
            DownloadKind::Export => format!("history_{}.csv", Utc::now().format("%Y%m%dT%H%M%SZ")),
            DownloadKind::Report => format!("report_{}.pdf", Utc::now().format("%Y%m%dT%H%M%SZ")),
        };
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.export_dir.display()))?;
        let path = self.export_dir.join(file_name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Saved {} bytes to {}", body.len(), path.display());
        Ok(path)
    }

    pub fn report(&self, text: &str) {
        tracing::warn!("{}", text);
        self.scheduler.with_state(|s| s.report(text));
    }

    /// Fire-and-forget: a failed persist is logged and otherwise ignored.
    fn persist(&self, update: ConfigUpdate) {
        let backend = self.scheduler.backend();
        tokio::spawn(async move {
            if let Err(e) = backend.persist_config(&update).await {
                tracing::warn!("Persisting {:?} failed: {}", update, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitor::{MonitorSettings, MonitorState};
    use crate::application::poll_cycle::Backoff;
    use crate::application::test_support::{
        at, batch, scored, FakeBackend, FixedClock, RecordingRenderer, RenderCall,
    };
    use crate::domain::alert::AlertPolicy;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn actions(backend: Arc<FakeBackend>, renderer: &RecordingRenderer) -> MonitorActions {
        let state = MonitorState::new(
            MonitorSettings::default(),
            AlertPolicy::default(),
            Backoff::default(),
            Box::new(renderer.clone()),
            Arc::new(FixedClock::new(at(100))),
        );
        let dir = std::env::temp_dir().join(format!("sensor-monitor-test-{}", std::process::id()));
        MonitorActions::new(PollingScheduler::new(backend, state), dir)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_defaults_applies_backend_values() {
        let backend = Arc::new(FakeBackend::default());
        let renderer = RecordingRenderer::default();
        let actions = actions(backend, &renderer);

        actions.load_defaults().await;

        let settings = actions.scheduler.with_state(|s| s.settings().clone());
        assert_eq!(settings.view_seconds.get(), 120);
        assert_eq!(settings.model, "lstm");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_resets_widgets_and_restarts() {
        let backend = Arc::new(FakeBackend::with_history(batch(&[99], 20.0, 100)));
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);

        actions.set_mode(MonitorMode::Replay).await.unwrap();

        assert!(actions.scheduler.is_running());
        assert_eq!(actions.scheduler.with_state(|s| s.mode()), MonitorMode::Replay);
        assert_eq!(backend.requests()[0], "mode replay");
        assert!(renderer.calls().contains(&RenderCall::Reset));
        actions.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_enters_replay_and_uses_stride() {
        let backend = Arc::new(FakeBackend::with_history(batch(&[99], 20.0, 100)));
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);
        actions.set_replay_stride(5).unwrap();

        actions.replay_step(-1).await;

        let requests = backend.requests();
        assert!(requests.contains(&"mode replay".to_string()));
        assert!(requests.contains(&"step -5".to_string()));
        actions.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_step_is_reported_without_backoff() {
        let backend = Arc::new(FakeBackend::with_history(batch(&[99], 20.0, 100)));
        backend.reject_steps.store(true, Ordering::SeqCst);
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);
        actions.set_mode(MonitorMode::Replay).await.unwrap();
        actions.stop();

        actions.replay_step(1).await;

        assert_eq!(renderer.last_status_text().as_deref(), Some("Step failed: HTTP 400"));
        assert_eq!(actions.scheduler.with_state(|s| s.backoff_ms()), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_window_rejected_without_request() {
        let backend = Arc::new(FakeBackend::default());
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);

        assert!(actions.set_view_seconds(0).await.is_err());
        assert_eq!(backend.history_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_window_change_refreshes_table() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_scores(vec![scored(99, 0.4, true), scored(98, 0.0, false)]);
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);

        actions.set_score_window(120).await.unwrap();
        tokio::task::yield_now().await;

        assert!(backend.requests().contains(&"anomalies n=120".to_string()));
        assert!(backend.requests().contains(&"config ScoreWindow(120)".to_string()));
        let table = renderer.calls().into_iter().find_map(|c| match c {
            RenderCall::Table(t) => Some(t),
            _ => None,
        });
        assert_eq!(table.unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let backend = Arc::new(FakeBackend::default());
        let renderer = RecordingRenderer::default();
        let actions = actions(backend.clone(), &renderer);

        let path = actions.download(DownloadKind::Export, None).await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"id,timestamp\n");
        assert!(backend.requests().contains(&"download /export".to_string()));
        tokio::fs::remove_file(path).await.unwrap();
    }
}
