// Window transformer - absolute timestamps to "seconds ago" plot coordinates
use super::chart::{axis_ticks, ChartData, Metric, PlotPoint, SeriesData, SeriesKind};
use super::telemetry::{ScoredSample, TelemetrySample, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowPoint {
    pub x: f64,
    pub sample: TelemetrySample,
    pub label: String,
}

impl WindowPoint {
    fn project(window: &TimeWindow, sample: &TelemetrySample) -> Self {
        Self {
            x: window.x_of(sample.timestamp),
            sample: sample.clone(),
            label: utc_label(sample.timestamp),
        }
    }
}

/// One tick's worth of plot data for every metric.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub window: TimeWindow,
    pub points: Vec<WindowPoint>,
    pub markers: Vec<WindowPoint>,
    pub used_fallback: bool,
    visible: HashSet<i64>,
}

impl WindowFrame {
    /// `history` must be sorted oldest first; `scored` may be in any order.
    pub fn build(history: &[TelemetrySample], scored: &[ScoredSample], window: TimeWindow) -> Self {
        let (points, used_fallback) = transform_series(history, &window);
        let markers = transform_anomalies(scored, &window);
        let visible = history
            .iter()
            .filter(|s| window.contains(s.timestamp))
            .map(|s| s.timestamp.timestamp())
            .collect();
        Self {
            window,
            points,
            markers,
            used_fallback,
            visible,
        }
    }

    pub fn charts(&self) -> Vec<ChartData> {
        Metric::ALL.iter().map(|m| self.chart(*m)).collect()
    }

    pub fn chart(&self, metric: Metric) -> ChartData {
        let to_plot = |p: &WindowPoint| PlotPoint::new(p.x, metric.value_of(&p.sample), p.label.clone());

        ChartData {
            metric,
            x_range: (0.0, f64::from(self.window.view_seconds())),
            ticks: axis_ticks(self.window.view_seconds()),
            series: vec![
                SeriesData::new(
                    metric.title().to_string(),
                    SeriesKind::Line,
                    self.points.iter().map(to_plot).collect(),
                ),
                SeriesData::new(
                    "Anomaly".to_string(),
                    SeriesKind::Markers,
                    self.markers.iter().map(to_plot).collect(),
                ),
            ],
        }
    }

    /// Whole-second buckets of the received samples inside the window.
    /// Fallback points outside it are not counted.
    pub fn visible_seconds(&self) -> &HashSet<i64> {
        &self.visible
    }
}

/// Projects the in-window samples. When fewer than two samples fall inside the
/// window, the newest sample and its predecessor are projected instead so the
/// line never degrades to a single dot. The flag reports that substitution.
pub fn transform_series(history: &[TelemetrySample], window: &TimeWindow) -> (Vec<WindowPoint>, bool) {
    let in_window: Vec<WindowPoint> = history
        .iter()
        .filter(|s| window.contains(s.timestamp))
        .map(|s| WindowPoint::project(window, s))
        .collect();

    if in_window.len() >= 2 {
        return (in_window, false);
    }

    let Some(last) = history.last() else {
        return (in_window, false);
    };

    let previous = match history.len() {
        0 | 1 => last.at(last.timestamp - Duration::milliseconds(1000)),
        n => history[n - 2].clone(),
    };

    let points = vec![
        WindowPoint::project(window, &previous),
        WindowPoint::project(window, last),
    ];
    (points, true)
}

/// Anomaly markers never use the sparse fallback.
pub fn transform_anomalies(scored: &[ScoredSample], window: &TimeWindow) -> Vec<WindowPoint> {
    let mut markers: Vec<WindowPoint> = scored
        .iter()
        .filter(|r| r.is_anomaly && window.contains(r.timestamp()))
        .map(|r| WindowPoint::project(window, &r.sample))
        .collect();
    markers.sort_by(|a, b| a.x.total_cmp(&b.x));
    markers
}

pub fn utc_label(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
