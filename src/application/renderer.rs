// Renderer trait - the presentation surface the monitor drives
use crate::domain::chart::ChartData;
use crate::domain::status::{AnomalyTable, LatestReadings, SystemStatus};

pub trait Renderer: Send {
    /// Full chart update; only called when the redraw gate opens
    fn update_series(&mut self, charts: &[ChartData]);

    /// Shared flag behind every metric badge and the global dot
    fn update_badge(&mut self, anomaly_present: bool);

    fn update_status(&mut self, status: SystemStatus);

    fn update_table(&mut self, table: &AnomalyTable);

    fn update_latest(&mut self, readings: &LatestReadings);

    fn show_alert(&mut self, max_score: f64, message: &str);

    fn hide_alert(&mut self);

    fn set_status_text(&mut self, text: &str);

    /// Blank every widget, e.g. after a mode switch
    fn reset(&mut self);
}
