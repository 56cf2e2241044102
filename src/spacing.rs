// src/spacing.rs - Word boundaries from sustained hand absence
//
// The presence counter lives on the ingestion side; the grace window is
// owned by the stabilizer, which is the only writer of the transcript.

/// What a single frame did to the presence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    /// Hands present (or still absent below the threshold).
    None,
    /// First absent frame after hands were visible: segment state must be dropped.
    HandsLeft,
    /// The absence run just reached the threshold: emit one boundary.
    Boundary,
}

#[derive(Debug)]
pub struct SpacingDetector {
    consecutive_absent_frames: usize,
    threshold: usize,
    boundary_emitted: bool,
}

impl SpacingDetector {
    pub fn new(out_of_frame_threshold: usize) -> Self {
        Self {
            consecutive_absent_frames: 0,
            threshold: out_of_frame_threshold,
            boundary_emitted: false,
        }
    }

    pub fn absent_frames(&self) -> usize {
        self.consecutive_absent_frames
    }

    pub fn record_presence(&mut self) {
        self.consecutive_absent_frames = 0;
        self.boundary_emitted = false;
    }

    pub fn record_absence(&mut self) -> PresenceChange {
        self.consecutive_absent_frames = self.consecutive_absent_frames.saturating_add(1);

        if self.consecutive_absent_frames >= self.threshold && !self.boundary_emitted {
            self.boundary_emitted = true;
            return PresenceChange::Boundary;
        }
        if self.consecutive_absent_frames == 1 {
            return PresenceChange::HandsLeft;
        }
        PresenceChange::None
    }

    pub fn reset(&mut self) {
        self.consecutive_absent_frames = 0;
        self.boundary_emitted = false;
    }
}

/// Short window after a boundary in which the last symbol may repeat.
#[derive(Debug, Clone)]
pub struct GraceWindow {
    window_ms: u64,
    spacing_just_emitted: bool,
    opened_at_ms: u64,
}

impl GraceWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            spacing_just_emitted: false,
            opened_at_ms: 0,
        }
    }

    pub fn open(&mut self, now_ms: u64) {
        self.spacing_just_emitted = true;
        self.opened_at_ms = now_ms;
    }

    /// A boundary was inserted and nothing has been committed or expired it since.
    pub fn is_pending(&self) -> bool {
        self.spacing_just_emitted
    }

    /// Read-only variant of [`GraceWindow::check`].
    pub fn is_open_at(&self, now_ms: u64) -> bool {
        self.spacing_just_emitted && now_ms.saturating_sub(self.opened_at_ms) <= self.window_ms
    }

    /// Whether `now_ms` falls inside an open window. An expired window is
    /// closed as a side effect.
    pub fn check(&mut self, now_ms: u64) -> bool {
        if !self.spacing_just_emitted {
            return false;
        }
        if self.is_open_at(now_ms) {
            return true;
        }
        tracing::debug!(opened_at_ms = self.opened_at_ms, now_ms, "Post-spacing grace window expired");
        self.spacing_just_emitted = false;
        false
    }

    pub fn close(&mut self) {
        self.spacing_just_emitted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_once_per_absence_run() {
        let mut detector = SpacingDetector::new(10);
        let mut boundaries = 0;
        for frame in 1..=30 {
            match detector.record_absence() {
                PresenceChange::Boundary => {
                    boundaries += 1;
                    assert_eq!(frame, 10);
                }
                PresenceChange::HandsLeft => assert_eq!(frame, 1),
                PresenceChange::None => {}
            }
        }
        assert_eq!(boundaries, 1);
    }

    #[test]
    fn test_presence_rearms_boundary() {
        let mut detector = SpacingDetector::new(3);
        for _ in 0..3 {
            detector.record_absence();
        }
        detector.record_presence();
        assert_eq!(detector.absent_frames(), 0);
        assert_eq!(detector.record_absence(), PresenceChange::HandsLeft);
        assert_eq!(detector.record_absence(), PresenceChange::None);
        assert_eq!(detector.record_absence(), PresenceChange::Boundary);
    }

    #[test]
    fn test_threshold_of_one_emits_immediately() {
        let mut detector = SpacingDetector::new(1);
        assert_eq!(detector.record_absence(), PresenceChange::Boundary);
    }

    #[test]
    fn test_grace_window_expiry() {
        let mut grace = GraceWindow::new(100);
        assert!(!grace.check(0));

        grace.open(1_000);
        assert!(grace.check(1_050));
        assert!(grace.check(1_100));
        assert!(!grace.check(1_101));
        assert!(!grace.is_pending());
    }

    #[test]
    fn test_open_at_does_not_close() {
        let mut grace = GraceWindow::new(100);
        grace.open(1_000);
        assert!(grace.is_open_at(1_100));
        assert!(!grace.is_open_at(5_000));
        assert!(grace.is_pending());
    }
}
