//! Live sign-language transcription core.
//!
//! Turns a stream of per-frame hand landmarks and a noisy sequence
//! classifier into a stable transcript:
//!
//! - [`landmarks`] flattens detector output into fixed-size frames;
//! - [`motion`] and [`change`] classify the gesture regime and detect new gestures;
//! - [`buffer`] and [`gate`] decide when a window goes to the classifier;
//! - [`stabilizer`] and [`spacing`] turn raw labels and hand absence into
//!   committed symbols and word boundaries;
//! - [`session`] wires it all together with an async classification worker.

pub mod buffer;
pub mod change;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod landmarks;
pub mod mailbox;
pub mod motion;
pub mod pipeline;
pub mod recorder;
pub mod replay;
pub mod session;
pub mod spacing;
pub mod stabilizer;

pub use classifier::{LabelTable, SignClassifier, TemplateClassifier};
pub use config::{RecognizerConfig, RegimeParams};
pub use error::{ClassifierError, ConfigError, SessionError};
pub use landmarks::{Frame, HandLandmarks, PoseObservation};
pub use motion::GestureRegime;
pub use pipeline::{FrameIngestor, IngestOutcome};
pub use session::{RecognitionSession, RecognizerStatus};
pub use stabilizer::{PredictionStabilizer, TranscriptEvent};
