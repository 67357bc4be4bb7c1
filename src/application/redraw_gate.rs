// Redraw gate - full chart updates only when the data has advanced
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct RedrawGate {
    rendered: bool,
    last_newest: Option<DateTime<Utc>>,
    last_cutoff: Option<DateTime<Utc>>,
}

impl RedrawGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on the first cycle, when the newest sample changed, or when the
    /// cutoff crossed into another whole second.
    pub fn should_redraw(&self, newest: Option<DateTime<Utc>>, cutoff: DateTime<Utc>) -> bool {
        if !self.rendered {
            return true;
        }
        if newest != self.last_newest {
            return true;
        }
        self.last_cutoff.map(second_bucket) != Some(second_bucket(cutoff))
    }

    pub fn record(&mut self, newest: Option<DateTime<Utc>>, cutoff: DateTime<Utc>) {
        self.rendered = true;
        self.last_newest = newest;
        self.last_cutoff = Some(cutoff);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn second_bucket(instant: DateTime<Utc>) -> i64 {
    // timestamp() floors toward negative infinity
    instant.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_first_cycle_always_redraws() {
        let gate = RedrawGate::new();
        assert!(gate.should_redraw(None, at_ms(0)));
        assert!(!gate.rendered);
    }

    #[test]
    fn test_identical_ticks_redraw_once() {
        let mut gate = RedrawGate::new();
        let newest = Some(at_ms(0));
        let mut redraws = 0;

        for i in 0..10 {
            // Cutoff drifts inside the same second
            let cutoff = at_ms(-60_000 + i * 50);
            if gate.should_redraw(newest, cutoff) {
                gate.record(newest, cutoff);
                redraws += 1;
            }
        }

        assert_eq!(redraws, 1);
    }

    #[test]
    fn test_new_sample_triggers_redraw() {
        let mut gate = RedrawGate::new();
        gate.record(Some(at_ms(0)), at_ms(-60_000));
        assert!(gate.should_redraw(Some(at_ms(1000)), at_ms(-60_000)));
    }

    #[test]
    fn test_cutoff_second_rollover_triggers_redraw() {
        let mut gate = RedrawGate::new();
        let newest = Some(at_ms(0));
        gate.record(newest, at_ms(-60_001));
        assert!(!gate.should_redraw(newest, at_ms(-60_999)));
        assert!(gate.should_redraw(newest, at_ms(-60_000)));
        assert!(gate.should_redraw(newest, at_ms(-60_001) + Duration::seconds(1)));
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut gate = RedrawGate::new();
        gate.record(Some(at_ms(0)), at_ms(0));
        gate.reset();
        assert!(gate.should_redraw(Some(at_ms(0)), at_ms(0)));
    }
}
