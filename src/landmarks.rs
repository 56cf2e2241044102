// src/landmarks.rs - Per-frame hand landmark normalization
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// MediaPipe hand landmark count.
pub const LANDMARKS_PER_HAND: usize = 21;

/// One detected hand: landmark points in normalized image coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks(pub Vec<Vector3<f32>>);

impl HandLandmarks {
    pub fn new(points: Vec<Vector3<f32>>) -> Self {
        Self(points)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the pose source reports for one camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    pub timestamp_ms: u64,
    /// Zero, one or two hands in the order the detector reported them.
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
}

impl PoseObservation {
    pub fn new(timestamp_ms: u64, hands: Vec<HandLandmarks>) -> Self {
        Self { timestamp_ms, hands }
    }

    pub fn no_hands(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            hands: Vec::new(),
        }
    }
}

/// Fixed-length feature vector for one frame: `hands * landmarks * 3` floats,
/// x/y/z interleaved per landmark. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    features: Box<[f32]>,
}

impl Frame {
    pub fn from_features(features: Vec<f32>) -> Self {
        Self {
            features: features.into_boxed_slice(),
        }
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn landmark_count(&self) -> usize {
        self.features.len() / 3
    }

    pub fn landmark(&self, index: usize) -> Option<Vector3<f32>> {
        let start = index * 3;
        self.features
            .get(start..start + 3)
            .map(Vector3::from_column_slice)
    }
}

impl Deref for Frame {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.features
    }
}

/// Result of normalizing a single observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Frame(Frame),
    NoHands,
    /// Detector hiccup: a hand with the wrong landmark count. Handled as `NoHands`.
    Malformed { hand: usize, points: usize },
}

impl Normalized {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Normalized::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    hands: usize,
    landmarks_per_hand: usize,
}

impl FrameNormalizer {
    pub fn new(hands: usize, landmarks_per_hand: usize) -> Self {
        Self {
            hands,
            landmarks_per_hand,
        }
    }

    pub fn hands(&self) -> usize {
        self.hands
    }

    pub fn features_per_frame(&self) -> usize {
        self.hands * self.landmarks_per_hand * 3
    }

    /// Flatten reported hands into a frame, zero-filling missing hand slots.
    /// Hands beyond the configured count are ignored.
    pub fn normalize(&self, observation: &PoseObservation) -> Normalized {
        if observation.hands.is_empty() {
            return Normalized::NoHands;
        }

        let reported = &observation.hands[..observation.hands.len().min(self.hands)];
        if let Some((hand, landmarks)) = reported
            .iter()
            .enumerate()
            .find(|(_, h)| h.len() != self.landmarks_per_hand)
        {
            return Normalized::Malformed {
                hand,
                points: landmarks.len(),
            };
        }

        let mut features = Vec::with_capacity(self.features_per_frame());
        for hand in reported {
            for point in &hand.0 {
                features.extend_from_slice(&[point.x, point.y, point.z]);
            }
        }
        features.resize(self.features_per_frame(), 0.0);

        Normalized::Frame(Frame::from_features(features))
    }
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new(2, LANDMARKS_PER_HAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(offset: f32) -> HandLandmarks {
        HandLandmarks::new(
            (0..LANDMARKS_PER_HAND)
                .map(|i| Vector3::new(offset + i as f32 * 0.01, 0.5, -0.1))
                .collect(),
        )
    }

    #[test]
    fn test_two_hands_preserve_order() {
        let normalizer = FrameNormalizer::default();
        let obs = PoseObservation::new(0, vec![hand(0.1), hand(0.6)]);
        let frame = normalizer.normalize(&obs).into_frame().unwrap();

        assert_eq!(frame.len(), 126);
        assert_eq!(frame[0], 0.1);
        assert_eq!(frame[63], 0.6);
        assert_eq!(frame.landmark(21), Some(Vector3::new(0.6, 0.5, -0.1)));
    }

    #[test]
    fn test_single_hand_zero_fills_second_slot() {
        let normalizer = FrameNormalizer::default();
        let obs = PoseObservation::new(0, vec![hand(0.2)]);
        let frame = normalizer.normalize(&obs).into_frame().unwrap();

        assert_eq!(frame.len(), 126);
        assert!(frame[63..].iter().all(|v| *v == 0.0));
        assert_eq!(frame[2], -0.1);
    }

    #[test]
    fn test_no_hands() {
        let normalizer = FrameNormalizer::default();
        assert_eq!(normalizer.normalize(&PoseObservation::no_hands(5)), Normalized::NoHands);
    }

    #[test]
    fn test_short_hand_is_malformed() {
        let normalizer = FrameNormalizer::default();
        let mut short = hand(0.3);
        short.0.truncate(20);
        let obs = PoseObservation::new(0, vec![hand(0.1), short]);

        assert_eq!(
            normalizer.normalize(&obs),
            Normalized::Malformed { hand: 1, points: 20 }
        );
    }

    #[test]
    fn test_extra_hands_ignored() {
        let normalizer = FrameNormalizer::default();
        let obs = PoseObservation::new(0, vec![hand(0.1), hand(0.2), hand(0.3)]);
        let frame = normalizer.normalize(&obs).into_frame().unwrap();
        assert_eq!(frame.len(), 126);
    }

    #[test]
    fn test_observation_json_shape() {
        let json = r#"{"timestamp_ms": 33, "hands": [[[0.1, 0.2, 0.3]]]}"#;
        let obs: PoseObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.timestamp_ms, 33);
        assert_eq!(obs.hands[0].0[0], Vector3::new(0.1, 0.2, 0.3));
    }
}
