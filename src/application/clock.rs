// Clock sources - wall time and the window's reference "now"
use crate::domain::telemetry::MonitorMode;
use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clocks reported alongside a history payload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BackendClocks {
    pub server_now: Option<DateTime<Utc>>,
    pub replay_now: Option<DateTime<Utc>>,
}

/// Picks the instant the view window is anchored to. Live mode follows the
/// server clock, replay mode the replay clock. The result never moves
/// backwards until the source is reset or rewound.
#[derive(Debug, Clone)]
pub struct ClockSource {
    mode: MonitorMode,
    last: Option<DateTime<Utc>>,
}

impl ClockSource {
    pub fn new(mode: MonitorMode) -> Self {
        Self { mode, last: None }
    }

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MonitorMode) {
        self.mode = mode;
        self.last = None;
    }

    /// Replay navigation (step back, reset, seek) legitimately moves time backwards.
    pub fn rewind(&mut self) {
        self.last = None;
    }

    pub fn reference_now(
        &mut self,
        clocks: BackendClocks,
        newest_sample: Option<DateTime<Utc>>,
        wall: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let reported = match self.mode {
            MonitorMode::Live => clocks.server_now,
            MonitorMode::Replay => clocks.replay_now.or(clocks.server_now),
        };
        let candidate = reported.or(newest_sample).unwrap_or(wall);

        let now = match self.last {
            Some(last) if last > candidate => last,
            _ => candidate,
        };
        self.last = Some(now);
        now
    }
}
