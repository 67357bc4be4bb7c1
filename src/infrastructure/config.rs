use crate::application::monitor::{clamp_contamination, MonitorSettings};
use crate::application::poll_cycle::Backoff;
use crate::domain::alert::AlertPolicy;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub alert: AlertSettings,
    #[serde(default)]
    pub defaults: DefaultSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingSettings {
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_factor: f64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            min_backoff_ms: 1000,
            max_backoff_ms: 15000,
            backoff_factor: 1.5,
        }
    }
}

impl PollingSettings {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.min_backoff_ms, self.max_backoff_ms, self.backoff_factor)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertSettings {
    pub persist_k: usize,
    pub persist_m: usize,
    pub min_alert_score: f64,
    pub latch_seconds: i64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            persist_k: 3,
            persist_m: 10,
            min_alert_score: 0.18,
            latch_seconds: 120,
        }
    }
}

impl AlertSettings {
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            persist_k: self.persist_k,
            persist_m: self.persist_m.max(1),
            min_alert_score: self.min_alert_score,
            latch: chrono::Duration::seconds(self.latch_seconds.max(0)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DefaultSettings {
    pub view_seconds: u32,
    pub score_window: u32,
    pub history_window: u32,
    pub contamination: f64,
    pub model: String,
    pub replay_stride: i64,
    pub badge_visible_only: bool,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        let settings = MonitorSettings::default();
        Self {
            view_seconds: settings.view_seconds.get(),
            score_window: settings.score_window.get(),
            history_window: settings.history_window.get(),
            contamination: settings.contamination,
            model: settings.model,
            replay_stride: settings.replay_stride,
            badge_visible_only: settings.badge_visible_only,
        }
    }
}

impl DefaultSettings {
    /// Out-of-range values fall back to the built-in defaults.
    pub fn settings(&self) -> MonitorSettings {
        let base = MonitorSettings::default();
        MonitorSettings {
            view_seconds: NonZeroU32::new(self.view_seconds).unwrap_or(base.view_seconds),
            score_window: NonZeroU32::new(self.score_window).unwrap_or(base.score_window),
            history_window: NonZeroU32::new(self.history_window).unwrap_or(base.history_window),
            contamination: if self.contamination > 0.0 {
                clamp_contamination(self.contamination)
            } else {
                base.contamination
            },
            model: if self.model.trim().is_empty() {
                base.model
            } else {
                self.model.trim().to_lowercase()
            },
            replay_stride: if self.replay_stride == 0 {
                base.replay_stride
            } else {
                self.replay_stride.abs()
            },
            badge_visible_only: self.badge_visible_only,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    pub export_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
        }
    }
}

/// Reads `config/monitor.*` when present, then `MONITOR__SECTION__KEY` overrides.
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(
            config::Environment::with_prefix("MONITOR")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
