// src/motion.rs - Static/dynamic regime classification from smoothed movement
use crate::config::{RecognizerConfig, RegimeParams};
use crate::landmarks::Frame;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Whether the hands are holding a shape (letters) or moving (word signs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GestureRegime {
    #[default]
    Static,
    Dynamic,
}

/// Mean absolute coordinate difference of one landmark triple.
pub fn landmark_distance(a: &[f32], b: &[f32]) -> f32 {
    let a = Vector3::from_column_slice(a);
    let b = Vector3::from_column_slice(b);
    (a - b).abs().mean()
}

/// Per-landmark distances between two frames of equal length.
pub fn landmark_distances<'a>(current: &'a Frame, previous: &'a Frame) -> impl Iterator<Item = f32> + 'a {
    current
        .chunks_exact(3)
        .zip(previous.chunks_exact(3))
        .map(|(a, b)| landmark_distance(a, b))
}

/// Average per-landmark displacement between two frames.
pub fn average_displacement(current: &Frame, previous: &Frame) -> f32 {
    let count = current.landmark_count();
    if count == 0 {
        return 0.0;
    }
    landmark_distances(current, previous).sum::<f32>() / count as f32
}

/// Emitted when the smoothed movement crosses the dynamic threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeTransition {
    pub from: GestureRegime,
    pub to: GestureRegime,
    pub params: RegimeParams,
}

pub struct MotionClassifier {
    history: VecDeque<f32>,
    history_size: usize,
    dynamic_threshold: f32,
    previous: Option<Frame>,
    regime: GestureRegime,
    params: RegimeParams,
    static_params: RegimeParams,
    dynamic_params: RegimeParams,
    smoothed: f32,
}

impl MotionClassifier {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.movement_history_size),
            history_size: config.movement_history_size,
            dynamic_threshold: config.dynamic_movement_threshold,
            previous: None,
            regime: GestureRegime::Static,
            params: config.static_regime,
            static_params: config.static_regime,
            dynamic_params: config.dynamic_regime,
            smoothed: 0.0,
        }
    }

    pub fn regime(&self) -> GestureRegime {
        self.regime
    }

    /// Parameters of the active regime.
    pub fn params(&self) -> RegimeParams {
        self.params
    }

    pub fn smoothed_movement(&self) -> f32 {
        self.smoothed
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Feed the next present-hands frame. Returns the transition if the
    /// regime flipped on this frame.
    pub fn observe(&mut self, frame: &Frame) -> Option<RegimeTransition> {
        let movement = match &self.previous {
            Some(previous) => average_displacement(frame, previous),
            None => 0.0,
        };
        self.previous = Some(frame.clone());

        self.history.push_back(movement);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
        self.smoothed = self.history.iter().sum::<f32>() / self.history.len() as f32;

        let next = if self.smoothed > self.dynamic_threshold {
            GestureRegime::Dynamic
        } else {
            GestureRegime::Static
        };

        if next == self.regime {
            return None;
        }

        let from = self.regime;
        self.regime = next;
        self.params = match next {
            GestureRegime::Static => self.static_params,
            GestureRegime::Dynamic => self.dynamic_params,
        };
        tracing::debug!(?from, to = ?next, smoothed = self.smoothed, "Gesture regime changed");

        Some(RegimeTransition {
            from,
            to: next,
            params: self.params,
        })
    }

    /// Drop the movement history after a major change. The regime and the
    /// last frame are kept so the next displacement is still measured.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.smoothed = 0.0;
    }

    /// Full segment reset (hands left the frame): the next frame counts as a first frame.
    pub fn reset(&mut self) {
        self.clear_history();
        self.previous = None;
        self.regime = GestureRegime::Static;
        self.params = self.static_params;
    }
}
