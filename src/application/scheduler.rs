// Polling scheduler - self-rescheduling fetch loop with adaptive backoff
use crate::application::backend::MonitorBackend;
use crate::application::monitor::{MonitorState, TickOutcome};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

struct SchedulerInner {
    backend: Arc<dyn MonitorBackend>,
    state: Mutex<MonitorState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerInner {
    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct PollingScheduler {
    inner: Arc<SchedulerInner>,
}

impl PollingScheduler {
    pub fn new(backend: Arc<dyn MonitorBackend>, state: MonitorState) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                backend,
                state: Mutex::new(state),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> Arc<dyn MonitorBackend> {
        self.inner.backend.clone()
    }

    /// Runs `f` against the shared state. Never hold the guard across an await.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MonitorState) -> R) -> R {
        f(&mut self.inner.state())
    }

    pub fn is_running(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the loop with an immediate first tick. No-op while running.
    pub fn start(&self) {
        let mut pending = self.pending();
        if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.inner.state().reset_backoff();
        tracing::info!("Polling started");

        let inner = self.inner.clone();
        *pending = Some(tokio::spawn(async move {
            loop {
                // Detached so that stop() only cancels the wait, not the tick
                let tick = tokio::spawn(run_tick(inner.clone()));
                if let Err(e) = tick.await {
                    tracing::error!("Poll tick panicked: {}", e);
                }

                let delay = inner.state().next_delay();
                tokio::time::sleep(delay).await;
            }
        }));
    }

    /// Cancels the pending tick. A tick already fetching still completes and
    /// is accepted or discarded by its generation.
    pub fn stop(&self) {
        if let Some(handle) = self.pending().take() {
            handle.abort();
            tracing::info!("Polling stopped");
        }
    }

    /// One immediate tick outside the loop, e.g. after a user action. It
    /// supersedes whatever loop tick is in flight.
    pub async fn refresh(&self) -> TickOutcome {
        run_tick(self.inner.clone()).await
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_tick(inner: Arc<SchedulerInner>) -> TickOutcome {
    let ticket = inner.state().begin_tick();
    tracing::debug!("Tick {} started", ticket.generation.value());

    let fetched = futures::try_join!(
        inner.backend.history(ticket.history_n),
        inner.backend.scores_for_window(&ticket.score_query),
    );

    let mut state = inner.state();
    match fetched {
        Ok((history, scored)) => state.apply_tick(ticket.generation, history, scored),
        Err(e) => {
            if state.fail_tick(ticket.generation, &e) {
                TickOutcome::Applied { redrawn: false }
            } else {
                TickOutcome::Stale
            }
        }
    }
}
