// Main entry point - Dependency injection and monitor startup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::application::actions::MonitorActions;
use crate::application::clock::SystemClock;
use crate::application::monitor::MonitorState;
use crate::application::scheduler::PollingScheduler;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::http_backend::HttpBackend;
use crate::presentation::console;
use crate::presentation::log_renderer::LogRenderer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_monitor_config()?;

    // Create backend client (infrastructure layer)
    let backend = Arc::new(HttpBackend::new(config.backend.base_url.clone()));

    // Create monitor state and scheduler (application layer)
    let state = MonitorState::new(
        config.defaults.settings(),
        config.alert.policy(),
        config.polling.backoff(),
        Box::new(LogRenderer::default()),
        Arc::new(SystemClock),
    );
    let scheduler = PollingScheduler::new(backend, state);
    let actions = MonitorActions::new(scheduler, config.output.export_dir.clone());

    tracing::info!("Monitoring sensor backend at {}", config.backend.base_url);
    actions.load_defaults().await;
    actions.start();

    // Operator controls (presentation layer)
    println!("{}", console::HELP);
    tokio::select! {
        result = console::run(&actions) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    actions.stop();
    Ok(())
}
