// src/config.rs - Recognizer tuning knobs, constant for the lifetime of a session
use crate::error::ConfigError;
use crate::motion::GestureRegime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters that switch together whenever the gesture regime changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    /// Frames between dispatches once the gate has opened.
    pub sampling_interval: usize,
    /// Consecutive frames without a major change before the first dispatch.
    pub stability_threshold: usize,
    /// Identical classifier outputs needed before a label is committed.
    pub consistency_threshold: usize,
    /// Per-landmark and average distance above which a change is significant.
    pub change_threshold: f32,
    /// Significant landmarks needed (strictly more than) for a major change.
    pub required_changes: usize,
}

impl RegimeParams {
    pub fn static_defaults() -> Self {
        Self {
            sampling_interval: 10,
            stability_threshold: 3,
            consistency_threshold: 2,
            change_threshold: 0.08,
            required_changes: 12,
        }
    }

    // Moving signs are reprocessed every full window with no stability wait.
    pub fn dynamic_defaults() -> Self {
        Self {
            sampling_interval: 30,
            stability_threshold: 0,
            consistency_threshold: 1,
            change_threshold: 0.3,
            required_changes: 8,
        }
    }

    fn validate(&self, regime: &'static str) -> Result<(), ConfigError> {
        if self.sampling_interval == 0 {
            return Err(ConfigError::invalid(regime, "sampling_interval must be at least 1"));
        }
        if self.consistency_threshold == 0 {
            return Err(ConfigError::invalid(regime, "consistency_threshold must be at least 1"));
        }
        if !self.change_threshold.is_finite() || self.change_threshold < 0.0 {
            return Err(ConfigError::invalid(
                regime,
                format!("change_threshold must be a non-negative number, got {}", self.change_threshold),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub sequence_length: usize,
    pub hands: usize,
    pub landmarks_per_hand: usize,
    pub features_per_frame: usize,
    pub movement_history_size: usize,
    pub dynamic_movement_threshold: f32,
    pub out_of_frame_threshold: usize,
    pub post_spacing_window_ms: u64,
    pub static_regime: RegimeParams,
    pub dynamic_regime: RegimeParams,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            hands: 2,
            landmarks_per_hand: 21,
            features_per_frame: 126, // 2 hands * 21 landmarks * 3 coordinates
            movement_history_size: 10,
            dynamic_movement_threshold: 0.15,
            out_of_frame_threshold: 10,
            post_spacing_window_ms: 100,
            static_regime: RegimeParams::static_defaults(),
            dynamic_regime: RegimeParams::dynamic_defaults(),
        }
    }
}

impl RecognizerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("sequence_length", self.sequence_length),
            ("hands", self.hands),
            ("landmarks_per_hand", self.landmarks_per_hand),
            ("movement_history_size", self.movement_history_size),
            ("out_of_frame_threshold", self.out_of_frame_threshold),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(name, "must be at least 1"));
            }
        }

        let expected = self.hands * self.landmarks_per_hand * 3;
        if self.features_per_frame != expected {
            return Err(ConfigError::invalid(
                "features_per_frame",
                format!(
                    "{} does not match hands * landmarks_per_hand * 3 = {}",
                    self.features_per_frame, expected
                ),
            ));
        }

        if !self.dynamic_movement_threshold.is_finite() || self.dynamic_movement_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "dynamic_movement_threshold",
                "must be a non-negative number",
            ));
        }

        self.static_regime.validate("static_regime")?;
        self.dynamic_regime.validate("dynamic_regime")?;

        // Movement that merely keeps the regime Dynamic must not count as a major change.
        if self.dynamic_regime.change_threshold <= self.dynamic_movement_threshold {
            return Err(ConfigError::invalid(
                "dynamic_regime",
                format!(
                    "change_threshold {} must exceed dynamic_movement_threshold {}",
                    self.dynamic_regime.change_threshold, self.dynamic_movement_threshold
                ),
            ));
        }
        Ok(())
    }

    pub fn regime_params(&self, regime: GestureRegime) -> RegimeParams {
        match regime {
            GestureRegime::Static => self.static_regime,
            GestureRegime::Dynamic => self.dynamic_regime,
        }
    }

    /// Flattened classifier input length: `sequence_length * features_per_frame`.
    pub fn window_len(&self) -> usize {
        self.sequence_length * self.features_per_frame
    }
}

/// Where session exports land when no directory is given.
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("SignTranscriber")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}
