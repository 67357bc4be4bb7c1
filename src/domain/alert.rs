// Alert debouncer - persistence ring and acknowledgement latch
use super::telemetry::ScoredSample;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    /// Anomalous ticks required among the last `persist_m`
    pub persist_k: usize,
    pub persist_m: usize,
    pub min_alert_score: f64,
    pub latch: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            persist_k: 3,
            persist_m: 10,
            min_alert_score: 0.18,
            latch: Duration::minutes(2),
        }
    }
}

/// Fixed-capacity history of per-tick "anomaly present" flags.
#[derive(Debug, Clone)]
pub struct FlagRing {
    flags: VecDeque<bool>,
    capacity: usize,
}

impl FlagRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            flags: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, flag: bool) {
        if self.flags.len() == self.capacity {
            self.flags.pop_front();
        }
        self.flags.push_back(flag);
    }

    pub fn sum(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }
}

#[derive(Debug, Clone)]
pub struct AlertState {
    pub recent_flags: FlagRing,
    pub latched_until: Option<DateTime<Utc>>,
    pub last_acked_severity: f64,
    /// Score currently on the overlay, if it is showing
    pub displayed: Option<f64>,
}

impl AlertState {
    fn new(persist_m: usize) -> Self {
        Self {
            recent_flags: FlagRing::new(persist_m),
            latched_until: None,
            last_acked_severity: 0.0,
            displayed: None,
        }
    }

    pub fn is_latched(&self, now: DateTime<Utc>) -> bool {
        self.latched_until.is_some_and(|until| now < until)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    Show { max_score: f64, message: String },
    Hide,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    policy: AlertPolicy,
    state: AlertState,
}

impl AlertDebouncer {
    pub fn new(policy: AlertPolicy) -> Self {
        let state = AlertState::new(policy.persist_m);
        Self { policy, state }
    }

    /// Runs once per accepted tick with that tick's scored window.
    pub fn observe(&mut self, scored: &[ScoredSample], now: DateTime<Utc>) -> AlertDecision {
        let anomalous = scored.iter().filter(|r| r.is_anomaly);
        let (count, max_score) = anomalous.fold((0usize, 0.0f64), |(n, max), r| {
            (n + 1, max.max(r.anomaly_score))
        });

        self.state.recent_flags.push(count > 0);
        let persist = self.state.recent_flags.sum();

        if self.should_show(persist, max_score, now) {
            self.state.displayed = Some(max_score);
            return AlertDecision::Show {
                max_score,
                message: format!("Anomalies detected; max score {:.3}", max_score),
            };
        }

        if !self.state.is_latched(now) && persist == 0 {
            // History fully cleared: the next episode starts from scratch
            self.state.last_acked_severity = 0.0;
            self.state.displayed = None;
            return AlertDecision::Hide;
        }

        AlertDecision::Unchanged
    }

    pub fn should_show(&self, persist: usize, max_score: f64, now: DateTime<Utc>) -> bool {
        !self.state.is_latched(now)
            && persist >= self.policy.persist_k
            && max_score >= self.policy.min_alert_score
            && max_score > self.state.last_acked_severity
    }

    /// Operator acknowledgement: suppress alerts for the latch period and
    /// remember the acknowledged severity.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> AlertDecision {
        self.state.latched_until = Some(now + self.policy.latch);
        if let Some(score) = self.state.displayed.take() {
            self.state.last_acked_severity = self.state.last_acked_severity.max(score);
        }
        AlertDecision::Hide
    }

    pub fn reset(&mut self) {
        self.state.recent_flags.clear();
        self.state.latched_until = None;
        self.state.last_acked_severity = 0.0;
        self.state.displayed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::TelemetrySample;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn rows(anomalous: bool, score: f64) -> Vec<ScoredSample> {
        let sample = TelemetrySample::new(now(), 20.0, 1.0, 1500.0);
        vec![
            ScoredSample::new(sample.clone(), score, anomalous),
            ScoredSample::new(sample, 0.01, false),
        ]
    }

    #[test]
    fn test_flag_ring_evicts_oldest() {
        let mut ring = FlagRing::new(3);
        ring.push(true);
        ring.push(true);
        ring.push(false);
        assert_eq!(ring.sum(), 2);
        ring.push(false);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.sum(), 1);
        ring.push(false);
        assert_eq!(ring.sum(), 0);
    }

    #[test]
    fn test_persistent_pattern_raises_alert() {
        let mut debouncer = AlertDebouncer::new(AlertPolicy::default());

        assert_eq!(debouncer.observe(&rows(true, 0.30), now()), AlertDecision::Unchanged);
        assert_eq!(debouncer.observe(&rows(true, 0.30), now()), AlertDecision::Unchanged);
        assert_eq!(debouncer.observe(&rows(false, 0.0), now()), AlertDecision::Unchanged);

        match debouncer.observe(&rows(true, 0.30), now()) {
            AlertDecision::Show { max_score, message } => {
                assert_eq!(max_score, 0.30);
                assert_eq!(message, "Anomalies detected; max score 0.300");
            }
            other => panic!("expected alert, got {:?}", other),
        }
    }

    #[test]
    fn test_low_score_never_alerts() {
        let mut debouncer = AlertDebouncer::new(AlertPolicy::default());
        for _ in 0..10 {
            let decision = debouncer.observe(&rows(true, 0.17), now());
            assert!(!matches!(decision, AlertDecision::Show { .. }));
        }
        assert_eq!(debouncer.state.recent_flags.sum(), 10);
    }

    #[test]
    fn test_overlay_hidden_only_after_history_clears() {
        let policy = AlertPolicy {
            persist_m: 4,
            ..AlertPolicy::default()
        };
        let mut debouncer = AlertDebouncer::new(policy);
        for _ in 0..3 {
            debouncer.observe(&rows(true, 0.5), now());
        }

        // Score drops below threshold but flags remain in history
        for _ in 0..3 {
            assert_eq!(debouncer.observe(&rows(false, 0.0), now()), AlertDecision::Unchanged);
        }
        assert_eq!(debouncer.observe(&rows(false, 0.0), now()), AlertDecision::Hide);
    }

    #[test]
    fn test_acknowledge_latches_for_two_minutes() {
        let mut debouncer = AlertDebouncer::new(AlertPolicy::default());
        for _ in 0..3 {
            debouncer.observe(&rows(true, 0.4), now());
        }
        assert_eq!(debouncer.acknowledge(now()), AlertDecision::Hide);

        let during = now() + Duration::seconds(119);
        assert_eq!(debouncer.observe(&rows(true, 0.9), during), AlertDecision::Unchanged);

        let after = now() + Duration::minutes(2);
        assert!(matches!(
            debouncer.observe(&rows(true, 0.9), after),
            AlertDecision::Show { .. }
        ));
    }

    #[test]
    fn test_acknowledged_severity_requires_escalation() {
        let mut debouncer = AlertDebouncer::new(AlertPolicy::default());
        for _ in 0..3 {
            debouncer.observe(&rows(true, 0.4), now());
        }
        debouncer.acknowledge(now());
        assert_eq!(debouncer.state.last_acked_severity, 0.4);

        let after = now() + Duration::minutes(3);
        assert_eq!(debouncer.observe(&rows(true, 0.4), after), AlertDecision::Unchanged);
        assert!(matches!(
            debouncer.observe(&rows(true, 0.41), after),
            AlertDecision::Show { .. }
        ));
    }

    #[test]
    fn test_acknowledged_severity_forgotten_when_quiet() {
        let policy = AlertPolicy {
            persist_m: 3,
            ..AlertPolicy::default()
        };
        let mut debouncer = AlertDebouncer::new(policy);
        for _ in 0..3 {
            debouncer.observe(&rows(true, 0.4), now());
        }
        debouncer.acknowledge(now());

        let after = now() + Duration::minutes(3);
        for _ in 0..3 {
            debouncer.observe(&rows(false, 0.0), after);
        }
        assert_eq!(debouncer.state.last_acked_severity, 0.0);
    }

    #[test]
    fn test_reset_clears_latch_and_history() {
        let mut debouncer = AlertDebouncer::new(AlertPolicy::default());
        debouncer.observe(&rows(true, 0.4), now());
        debouncer.acknowledge(now());
        debouncer.reset();
        assert!(!debouncer.state.is_latched(now()));
        assert_eq!(debouncer.state.recent_flags.len(), 0);
        assert_eq!(debouncer.state.last_acked_severity, 0.0);
        assert_eq!(debouncer.state.displayed, None);
    }
}
