// src/change.rs - Major gesture change detection between consecutive frames
use crate::config::RegimeParams;
use crate::landmarks::Frame;
use crate::motion::landmark_distances;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No previous frame in this segment; always treated as a new gesture.
    Initial,
    /// Average and landmark-count thresholds both exceeded.
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeReport {
    pub kind: ChangeKind,
    pub average_distance: f32,
    pub significant_changes: usize,
}

impl ChangeReport {
    /// True for both `Initial` and `Major`: ingestion state must be reset.
    pub fn is_reset(&self) -> bool {
        !matches!(self.kind, ChangeKind::Minor)
    }
}

#[derive(Debug, Default)]
pub struct GestureChangeDetector {
    previous: Option<Frame>,
}

impl GestureChangeDetector {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Compare `frame` against the previous one under the active regime's
    /// thresholds, then remember it for the next call.
    pub fn check(&mut self, frame: &Frame, params: &RegimeParams) -> ChangeReport {
        let report = match &self.previous {
            None => ChangeReport {
                kind: ChangeKind::Initial,
                average_distance: 0.0,
                significant_changes: 0,
            },
            Some(previous) => {
                let mut total = 0.0f32;
                let mut significant = 0usize;
                let mut count = 0usize;
                for distance in landmark_distances(frame, previous) {
                    total += distance;
                    count += 1;
                    if distance > params.change_threshold {
                        significant += 1;
                    }
                }
                let average = if count == 0 { 0.0 } else { total / count as f32 };

                let kind = if average > params.change_threshold && significant > params.required_changes {
                    ChangeKind::Major
                } else {
                    ChangeKind::Minor
                };

                ChangeReport {
                    kind,
                    average_distance: average,
                    significant_changes: significant,
                }
            }
        };

        self.previous = Some(frame.clone());
        report
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(moved: usize, delta: f32) -> Frame {
        let mut features = vec![0.5f32; 126];
        for value in features.iter_mut().take(moved * 3) {
            *value += delta;
        }
        Frame::from_features(features)
    }

    #[test]
    fn test_first_frame_is_initial() {
        let mut detector = GestureChangeDetector::new();
        let report = detector.check(&frame_with(0, 0.0), &RegimeParams::static_defaults());
        assert_eq!(report.kind, ChangeKind::Initial);
        assert!(report.is_reset());
    }

    #[test]
    fn test_identical_frames_are_minor() {
        let mut detector = GestureChangeDetector::new();
        let params = RegimeParams::static_defaults();
        detector.check(&frame_with(0, 0.0), &params);
        let report = detector.check(&frame_with(0, 0.0), &params);
        assert_eq!(report.kind, ChangeKind::Minor);
        assert_eq!(report.significant_changes, 0);
    }

    #[test]
    fn test_whole_hand_jump_is_major() {
        let mut detector = GestureChangeDetector::new();
        let params = RegimeParams::static_defaults();
        detector.check(&frame_with(0, 0.0), &params);
        let report = detector.check(&frame_with(42, 0.3), &params);
        assert_eq!(report.kind, ChangeKind::Major);
        assert_eq!(report.significant_changes, 42);
        assert!((report.average_distance - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_too_few_landmarks_is_not_major() {
        let mut detector = GestureChangeDetector::new();
        let params = RegimeParams::static_defaults();
        detector.check(&frame_with(0, 0.0), &params);
        // 12 landmarks moving far: average clears the bar but the count does not exceed 12
        let report = detector.check(&frame_with(12, 1.0), &params);
        assert!(report.average_distance > params.change_threshold);
        assert_eq!(report.significant_changes, 12);
        assert_eq!(report.kind, ChangeKind::Minor);
    }

    #[test]
    fn test_dynamic_needs_fewer_landmarks_but_more_distance() {
        let stat = RegimeParams::static_defaults();
        let dynamic = RegimeParams::dynamic_defaults();

        // 10 landmarks far off: enough for dynamic (> 8) but not static (> 12)
        let mut detector = GestureChangeDetector::new();
        detector.check(&frame_with(0, 0.0), &dynamic);
        assert_eq!(detector.check(&frame_with(10, 2.0), &dynamic).kind, ChangeKind::Major);

        let mut detector = GestureChangeDetector::new();
        detector.check(&frame_with(0, 0.0), &stat);
        assert_eq!(detector.check(&frame_with(10, 2.0), &stat).kind, ChangeKind::Minor);

        // Signing-speed uniform shift: major under static, below the dynamic distance bar
        let mut detector = GestureChangeDetector::new();
        detector.check(&frame_with(0, 0.0), &dynamic);
        assert_eq!(detector.check(&frame_with(42, 0.2), &dynamic).kind, ChangeKind::Minor);

        let mut detector = GestureChangeDetector::new();
        detector.check(&frame_with(0, 0.0), &stat);
        assert_eq!(detector.check(&frame_with(42, 0.2), &stat).kind, ChangeKind::Major);
    }

    #[test]
    fn test_reset_forces_initial() {
        let mut detector = GestureChangeDetector::new();
        let params = RegimeParams::static_defaults();
        detector.check(&frame_with(0, 0.0), &params);
        detector.reset();
        assert_eq!(detector.check(&frame_with(0, 0.0), &params).kind, ChangeKind::Initial);
    }
}
