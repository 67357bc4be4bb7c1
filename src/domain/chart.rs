// Chart domain models - what the renderer draws
use super::telemetry::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Pressure,
    MotorSpeed,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Pressure, Metric::MotorSpeed];

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temp",
            Metric::Pressure => "Pressure",
            Metric::MotorSpeed => "RPM",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Pressure => "bar",
            Metric::MotorSpeed => "RPM",
        }
    }

    pub fn fraction_digits(&self) -> usize {
        match self {
            Metric::Temperature => 1,
            Metric::Pressure => 2,
            Metric::MotorSpeed => 0,
        }
    }

    pub fn value_of(&self, sample: &TelemetrySample) -> f64 {
        match self {
            Metric::Temperature => sample.temperature,
            Metric::Pressure => sample.pressure,
            Metric::MotorSpeed => sample.motor_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

impl PlotPoint {
    pub fn new(x: f64, y: f64, label: String) -> Self {
        Self { x, y, label }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Markers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub name: String,
    pub kind: SeriesKind,
    pub points: Vec<PlotPoint>,
}

impl SeriesData {
    pub fn new(name: String, kind: SeriesKind, points: Vec<PlotPoint>) -> Self {
        Self { name, kind, points }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub metric: Metric,
    pub x_range: (f64, f64),
    pub ticks: Vec<AxisTick>,
    pub series: Vec<SeriesData>,
}

impl ChartData {
    pub fn line(&self) -> Option<&SeriesData> {
        self.series.iter().find(|s| s.kind == SeriesKind::Line)
    }

    pub fn markers(&self) -> Option<&SeriesData> {
        self.series.iter().find(|s| s.kind == SeriesKind::Markers)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    pub value: f64,
    pub label: String,
}

const TICK_STEPS: u32 = 6;

/// Evenly spaced "seconds ago" ticks across `[0, view_seconds]`.
pub fn axis_ticks(view_seconds: u32) -> Vec<AxisTick> {
    let view = f64::from(view_seconds);
    (0..=TICK_STEPS)
        .map(|i| {
            let value = f64::from(i) / f64::from(TICK_STEPS) * view;
            let label = if i == TICK_STEPS {
                "0".to_string()
            } else {
                format!("-{}", (view - value).round() as i64)
            };
            AxisTick { value, label }
        })
        .collect()
}
