// src/pipeline.rs - Producer-side ingestion: everything that runs on each pose callback
use crate::buffer::{SequenceBuffer, SequenceWindow};
use crate::change::{ChangeKind, ChangeReport, GestureChangeDetector};
use crate::config::{RecognizerConfig, RegimeParams};
use crate::error::ConfigError;
use crate::gate::SamplingGate;
use crate::landmarks::{Frame, FrameNormalizer, Normalized, PoseObservation};
use crate::motion::{GestureRegime, MotionClassifier};
use crate::spacing::{PresenceChange, SpacingDetector};
use serde::Serialize;

/// A window handed to the classifier.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// Strictly increasing per session; results are applied in this order.
    pub sequence: u64,
    /// Segment the window belongs to. Results from an older segment are stale.
    pub epoch: u64,
    pub timestamp_ms: u64,
    pub regime: GestureRegime,
    pub params: RegimeParams,
    pub window: SequenceWindow,
}

/// Ingestion events the stabilizer has to see, in frame order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Boundary { timestamp_ms: u64, epoch: u64 },
    GestureChanged { timestamp_ms: u64, epoch: u64 },
}

impl ControlEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            ControlEvent::Boundary { epoch, .. } | ControlEvent::GestureChanged { epoch, .. } => *epoch,
        }
    }
}

/// Per-frame view of the ingestion decisions.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDiagnostics {
    pub timestamp_ms: u64,
    pub hands_present: usize,
    pub malformed: bool,
    pub regime: GestureRegime,
    pub smoothed_movement: f32,
    pub change_average: Option<f32>,
    pub significant_changes: Option<usize>,
    pub major_change: bool,
    pub buffered_frames: usize,
    pub stability_count: usize,
    pub dispatched: bool,
    pub boundary: bool,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub diagnostics: FrameDiagnostics,
    pub request: Option<ClassificationRequest>,
    pub control: Option<ControlEvent>,
}

/// Normalization, regime, change detection, window, gate and presence
/// counter. Never touches the transcript: the stabilizer only sees
/// [`ControlEvent`]s and classifier results.
pub struct FrameIngestor {
    normalizer: FrameNormalizer,
    motion: MotionClassifier,
    change: GestureChangeDetector,
    buffer: SequenceBuffer,
    gate: SamplingGate,
    spacing: SpacingDetector,
    next_sequence: u64,
    epoch: u64,
}

impl FrameIngestor {
    pub fn new(config: &RecognizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            normalizer: FrameNormalizer::new(config.hands, config.landmarks_per_hand),
            motion: MotionClassifier::new(config),
            change: GestureChangeDetector::new(),
            buffer: SequenceBuffer::new(config.sequence_length, config.features_per_frame),
            gate: SamplingGate::new(),
            spacing: SpacingDetector::new(config.out_of_frame_threshold),
            next_sequence: 0,
            epoch: 0,
        })
    }

    pub fn regime(&self) -> GestureRegime {
        self.motion.regime()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn buffered_frames(&self) -> usize {
        self.buffer.frame_count()
    }

    pub fn fill_fraction(&self) -> f32 {
        self.buffer.fill_fraction()
    }

    pub fn movement_history_len(&self) -> usize {
        self.motion.history_len()
    }

    pub fn stability_count(&self) -> usize {
        self.gate.stability_count()
    }

    pub fn ingest(&mut self, observation: &PoseObservation) -> IngestOutcome {
        let timestamp_ms = observation.timestamp_ms;

        match self.normalizer.normalize(observation) {
            Normalized::Frame(frame) => self.ingest_frame(frame, observation.hands.len(), timestamp_ms),
            Normalized::NoHands => self.ingest_absence(timestamp_ms, false),
            Normalized::Malformed { hand, points } => {
                tracing::debug!(hand, points, timestamp_ms, "Malformed hand landmarks, treating frame as empty");
                self.ingest_absence(timestamp_ms, true)
            }
        }
    }

    fn ingest_absence(&mut self, timestamp_ms: u64, malformed: bool) -> IngestOutcome {
        let control = match self.spacing.record_absence() {
            PresenceChange::None => None,
            PresenceChange::HandsLeft => {
                self.reset_segment();
                None
            }
            PresenceChange::Boundary => {
                self.reset_segment();
                self.epoch += 1;
                tracing::debug!(timestamp_ms, epoch = self.epoch, "Hands out of frame, boundary");
                Some(ControlEvent::Boundary {
                    timestamp_ms,
                    epoch: self.epoch,
                })
            }
        };

        IngestOutcome {
            diagnostics: FrameDiagnostics {
                timestamp_ms,
                hands_present: 0,
                malformed,
                regime: self.motion.regime(),
                smoothed_movement: self.motion.smoothed_movement(),
                change_average: None,
                significant_changes: None,
                major_change: false,
                buffered_frames: self.buffer.frame_count(),
                stability_count: self.gate.stability_count(),
                dispatched: false,
                boundary: control.is_some(),
            },
            request: None,
            control,
        }
    }

    fn ingest_frame(&mut self, frame: Frame, hands: usize, timestamp_ms: u64) -> IngestOutcome {
        self.spacing.record_presence();

        if self.motion.observe(&frame).is_some() {
            self.gate.on_regime_change();
        }
        let regime = self.motion.regime();
        let params = self.motion.params();

        let report = self.change.check(&frame, &params);
        self.gate.observe(&report);

        let mut control = None;
        if report.is_reset() {
            self.buffer.clear();
            self.motion.clear_history();
            if report.kind == ChangeKind::Major {
                self.epoch += 1;
                tracing::debug!(
                    average = report.average_distance,
                    significant = report.significant_changes,
                    epoch = self.epoch,
                    "Major gesture change"
                );
                control = Some(ControlEvent::GestureChanged {
                    timestamp_ms,
                    epoch: self.epoch,
                });
            }
        }

        self.buffer.push(&frame);

        let request = if self.gate.should_dispatch(regime, &params, self.buffer.is_full()) {
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            Some(ClassificationRequest {
                sequence,
                epoch: self.epoch,
                timestamp_ms,
                regime,
                params,
                window: self.buffer.snapshot(),
            })
        } else {
            None
        };

        IngestOutcome {
            diagnostics: diagnostics_for(
                timestamp_ms,
                hands.min(self.normalizer.hands()),
                regime,
                self.motion.smoothed_movement(),
                &report,
                self.buffer.frame_count(),
                self.gate.stability_count(),
                request.is_some(),
            ),
            request,
            control,
        }
    }

    /// Drop everything tied to the current gesture segment.
    fn reset_segment(&mut self) {
        self.motion.reset();
        self.change.reset();
        self.buffer.clear();
        self.gate.reset();
    }

    /// Explicit session reset. Bumps the epoch so in-flight results are discarded.
    pub fn reset(&mut self) {
        self.reset_segment();
        self.spacing.reset();
        self.epoch += 1;
    }
}

#[allow(clippy::too_many_arguments)]
fn diagnostics_for(
    timestamp_ms: u64,
    hands_present: usize,
    regime: GestureRegime,
    smoothed_movement: f32,
    report: &ChangeReport,
    buffered_frames: usize,
    stability_count: usize,
    dispatched: bool,
) -> FrameDiagnostics {
    FrameDiagnostics {
        timestamp_ms,
        hands_present,
        malformed: false,
        regime,
        smoothed_movement,
        change_average: Some(report.average_distance),
        significant_changes: Some(report.significant_changes),
        major_change: report.kind == ChangeKind::Major,
        buffered_frames,
        stability_count,
        dispatched,
        boundary: false,
    }
}
