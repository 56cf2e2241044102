// src/gate.rs - Decides when the buffered window goes to the classifier
use crate::change::ChangeReport;
use crate::config::RegimeParams;
use crate::motion::GestureRegime;

#[derive(Debug, Default)]
pub struct SamplingGate {
    frames_since_dispatch: usize,
    stability_count: usize,
    dispatched_in_segment: bool,
}

impl SamplingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stability_count(&self) -> usize {
        self.stability_count
    }

    pub fn frames_since_dispatch(&self) -> usize {
        self.frames_since_dispatch
    }

    /// Count a frame and its change-detection outcome.
    pub fn observe(&mut self, change: &ChangeReport) {
        self.frames_since_dispatch += 1;
        if change.is_reset() {
            self.stability_count = 0;
            self.frames_since_dispatch = 0;
            self.dispatched_in_segment = false;
        } else {
            self.stability_count += 1;
        }
    }

    /// Called after `observe` for the same frame. Returns true (and restarts
    /// the interval) when the window should be dispatched.
    pub fn should_dispatch(
        &mut self,
        regime: GestureRegime,
        params: &RegimeParams,
        buffer_full: bool,
    ) -> bool {
        if !buffer_full {
            return false;
        }

        let ready = match regime {
            GestureRegime::Dynamic => self.frames_since_dispatch >= params.sampling_interval,
            GestureRegime::Static => {
                self.stability_count >= params.stability_threshold
                    && (!self.dispatched_in_segment
                        || self.frames_since_dispatch >= params.sampling_interval)
            }
        };

        if ready {
            self.frames_since_dispatch = 0;
            self.dispatched_in_segment = true;
        }
        ready
    }

    /// Regime-scoped counters restart when the regime flips.
    pub fn on_regime_change(&mut self) {
        self.frames_since_dispatch = 0;
        self.stability_count = 0;
        self.dispatched_in_segment = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;

    fn report(kind: ChangeKind) -> ChangeReport {
        ChangeReport {
            kind,
            average_distance: 0.0,
            significant_changes: 0,
        }
    }

    #[test]
    fn test_never_dispatches_without_full_buffer() {
        let mut gate = SamplingGate::new();
        let params = RegimeParams::static_defaults();
        for _ in 0..100 {
            gate.observe(&report(ChangeKind::Minor));
            assert!(!gate.should_dispatch(GestureRegime::Static, &params, false));
        }
    }

    #[test]
    fn test_static_waits_for_stability_then_samples_on_interval() {
        let mut gate = SamplingGate::new();
        let params = RegimeParams::static_defaults();

        gate.observe(&report(ChangeKind::Initial));
        for _ in 0..(params.stability_threshold - 1) {
            gate.observe(&report(ChangeKind::Minor));
            assert!(!gate.should_dispatch(GestureRegime::Static, &params, true));
        }
        gate.observe(&report(ChangeKind::Minor));
        assert!(gate.should_dispatch(GestureRegime::Static, &params, true));

        let mut dispatched_at = Vec::new();
        for frame in 1..=25 {
            gate.observe(&report(ChangeKind::Minor));
            if gate.should_dispatch(GestureRegime::Static, &params, true) {
                dispatched_at.push(frame);
            }
        }
        assert_eq!(dispatched_at, vec![10, 20]);
    }

    #[test]
    fn test_major_change_resets_stability() {
        let mut gate = SamplingGate::new();
        for _ in 0..5 {
            gate.observe(&report(ChangeKind::Minor));
        }
        assert_eq!(gate.stability_count(), 5);
        gate.observe(&report(ChangeKind::Major));
        assert_eq!(gate.stability_count(), 0);
    }

    #[test]
    fn test_dynamic_dispatches_every_interval() {
        let mut gate = SamplingGate::new();
        let params = RegimeParams::dynamic_defaults();
        let mut count = 0;
        for _ in 0..90 {
            gate.observe(&report(ChangeKind::Minor));
            if gate.should_dispatch(GestureRegime::Dynamic, &params, true) {
                count += 1;
            }
        }
        assert_eq!(count, 3);
    }
}
