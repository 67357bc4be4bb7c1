// Presentation layer - console controls and the log-backed renderer
pub mod console;
pub mod log_renderer;
