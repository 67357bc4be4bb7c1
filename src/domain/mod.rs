// Domain layer - telemetry types and the pure decision rules over them
pub mod alert;
pub mod chart;
pub mod status;
pub mod telemetry;
pub mod window;
