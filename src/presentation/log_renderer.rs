// Log renderer - draws the monitor's widgets as structured log events
use crate::application::renderer::Renderer;
use crate::domain::chart::ChartData;
use crate::domain::status::{AnomalyTable, LatestReadings, Severity, SystemStatus};

/// Only changes are logged for the per-tick widgets, so an idle feed stays quiet.
#[derive(Debug, Default)]
pub struct LogRenderer {
    badge: Option<bool>,
    status: Option<SystemStatus>,
    alert_visible: bool,
    last_anomaly: Option<String>,
}

impl Renderer for LogRenderer {
    fn update_series(&mut self, charts: &[ChartData]) {
        for chart in charts {
            let line = chart.line().map(|s| s.points.as_slice()).unwrap_or_default();
            let markers = chart.markers().map(|s| s.points.len()).unwrap_or(0);
            let digits = chart.metric.fraction_digits();
            let latest = line
                .last()
                .map(|p| format!("{:.*} {}", digits, p.y, chart.metric.unit()))
                .unwrap_or_else(|| "--".to_string());

            tracing::info!(
                chart = chart.metric.title(),
                points = line.len(),
                anomalies = markers,
                window_s = chart.x_range.1,
                "latest {}",
                latest
            );
        }
    }

    fn update_badge(&mut self, anomaly_present: bool) {
        if self.badge.replace(anomaly_present) != Some(anomaly_present) {
            tracing::info!(anomaly = anomaly_present, "Window badge");
        }
    }

    fn update_status(&mut self, status: SystemStatus) {
        if self.status.replace(status) != Some(status) {
            match status {
                SystemStatus::Critical => tracing::error!("System status {}", status),
                SystemStatus::Warning => tracing::warn!("System status {}", status),
                SystemStatus::Nominal => tracing::info!("System status {}", status),
            }
        }
    }

    fn update_table(&mut self, table: &AnomalyTable) {
        if self.last_anomaly.as_deref() == Some(table.last_anomaly.as_str()) {
            return;
        }
        self.last_anomaly = Some(table.last_anomaly.clone());

        tracing::info!("Last anomaly: {}", table.last_anomaly);
        for row in &table.rows {
            let severity = match row.severity {
                Severity::High => "high",
                Severity::Medium => "medium",
                Severity::Low => "low",
            };
            tracing::info!(
                severity,
                "  {} | {} °C | {} bar | {} RPM | score {}",
                row.time,
                row.temperature,
                row.pressure,
                row.motor_speed,
                row.score
            );
        }
    }

    fn update_latest(&mut self, readings: &LatestReadings) {
        tracing::debug!(
            temperature = %readings.temperature,
            pressure = %readings.pressure,
            motor_speed = %readings.motor_speed,
            "Latest readings"
        );
    }

    fn show_alert(&mut self, max_score: f64, message: &str) {
        self.alert_visible = true;
        tracing::error!(max_score, "ALERT: {} (type 'ack' to acknowledge)", message);
    }

    fn hide_alert(&mut self) {
        if std::mem::take(&mut self.alert_visible) {
            tracing::info!("Alert cleared");
        }
    }

    fn set_status_text(&mut self, text: &str) {
        tracing::debug!("{}", text);
    }

    fn reset(&mut self) {
        *self = Self::default();
        tracing::info!("Display reset");
    }
}
