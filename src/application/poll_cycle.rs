// Poll cycle bookkeeping - generation counter, redraw gate and backoff
use crate::application::redraw_gate::RedrawGate;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    current_ms: u64,
    min_ms: u64,
    max_ms: u64,
    factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(1000, 15000, 1.5)
    }
}

impl Backoff {
    pub fn new(min_ms: u64, max_ms: u64, factor: f64) -> Self {
        let min_ms = min_ms.max(1);
        Self {
            current_ms: min_ms,
            min_ms,
            max_ms: max_ms.max(min_ms),
            factor: if factor.is_finite() && factor >= 1.0 { factor } else { 1.5 },
        }
    }

    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    pub fn on_success(&mut self) {
        self.current_ms = self.min_ms;
    }

    pub fn on_failure(&mut self) {
        let next = (self.current_ms as f64 * self.factor).round() as u64;
        self.current_ms = next.clamp(self.min_ms, self.max_ms);
    }

    pub fn reset(&mut self) {
        self.on_success();
    }
}

/// Ticket handed out when a tick starts; its generation is compared again
/// when the tick's responses arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PollCycleState {
    generation: u64,
    pub gate: RedrawGate,
    pub backoff: Backoff,
}

impl PollCycleState {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            generation: 0,
            gate: RedrawGate::new(),
            backoff,
        }
    }

    pub fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        Generation(self.generation)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.generation
    }

    /// Back to startup values. The counter keeps increasing so that ticks
    /// still in flight cannot match any later generation.
    pub fn reset(&mut self) -> Generation {
        self.gate.reset();
        self.backoff.reset();
        self.next_generation()
    }
}
