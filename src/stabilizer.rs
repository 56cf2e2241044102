// src/stabilizer.rs - Consistency voting and duplicate suppression over classifier labels
use crate::spacing::GraceWindow;
use serde::{Deserialize, Serialize};

/// Append-only output of a recognition session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "symbol", rename_all = "snake_case")]
pub enum TranscriptEvent {
    Symbol(String),
    Boundary,
    /// Explicit reset: consumers start a fresh transcript.
    SessionReset,
}

/// The committed text. Single letters run together into a spelled word;
/// multi-character vocabulary tokens stand alone, separated by spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    last_token_is_word: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn ends_with_separator(&self) -> bool {
        self.text.ends_with(' ')
    }

    pub fn push_symbol(&mut self, label: &str) {
        let is_word = label.chars().count() > 1;
        if !self.text.is_empty()
            && !self.ends_with_separator()
            && (is_word || self.last_token_is_word)
        {
            self.text.push(' ');
        }
        self.text.push_str(label);
        self.last_token_is_word = is_word;
    }

    /// Append a word separator. Returns false when there is nothing to separate.
    pub fn push_boundary(&mut self) -> bool {
        if self.text.is_empty() || self.ends_with_separator() {
            return false;
        }
        self.text.push(' ');
        true
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.last_token_is_word = false;
    }
}

/// Outcome of feeding one classifier label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilizerDecision {
    /// Seen `count` times in a row, not yet enough.
    Pending { label: String, count: usize },
    Committed(String),
    /// Confirmed but identical to the last commit outside a grace window.
    Suppressed(String),
}

/// Commits a label after `consistency_threshold` identical results in a row,
/// and never the same label twice in a row unless a boundary opened the grace
/// window or a major gesture change cleared the last confirmed label.
#[derive(Debug)]
pub struct PredictionStabilizer {
    transcript: Transcript,
    last_confirmed: Option<String>,
    pending_label: Option<String>,
    pending_count: usize,
    grace: GraceWindow,
}

impl PredictionStabilizer {
    pub fn new(post_spacing_window_ms: u64) -> Self {
        Self {
            transcript: Transcript::new(),
            last_confirmed: None,
            pending_label: None,
            pending_count: 0,
            grace: GraceWindow::new(post_spacing_window_ms),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn last_confirmed(&self) -> Option<&str> {
        self.last_confirmed.as_deref()
    }

    pub fn pending(&self) -> Option<(&str, usize)> {
        self.pending_label
            .as_deref()
            .map(|label| (label, self.pending_count))
    }

    /// Whether a repeat of the last symbol confirmed at `now_ms` would be accepted.
    pub fn in_grace(&self, now_ms: u64) -> bool {
        self.grace.is_open_at(now_ms)
    }

    /// A boundary was inserted and the grace window has not been consumed yet.
    pub fn boundary_pending(&self) -> bool {
        self.grace.is_pending()
    }

    pub fn apply(
        &mut self,
        label: &str,
        timestamp_ms: u64,
        consistency_threshold: usize,
    ) -> StabilizerDecision {
        if self.pending_label.as_deref() == Some(label) {
            self.pending_count += 1;
        } else {
            self.pending_label = Some(label.to_string());
            self.pending_count = 1;
        }

        if self.pending_count < consistency_threshold {
            return StabilizerDecision::Pending {
                label: label.to_string(),
                count: self.pending_count,
            };
        }

        let in_grace = self.grace.check(timestamp_ms);
        let is_new = self.last_confirmed.as_deref() != Some(label);

        if in_grace || is_new {
            self.transcript.push_symbol(label);
            self.last_confirmed = Some(label.to_string());
            self.grace.close();
            self.pending_count = 0;
            self.pending_label = None;
            tracing::info!(label, in_grace, transcript = self.transcript.as_str(), "Committed symbol");
            StabilizerDecision::Committed(label.to_string())
        } else {
            self.pending_count = 0;
            tracing::debug!(label, "Suppressed duplicate symbol");
            StabilizerDecision::Suppressed(label.to_string())
        }
    }

    /// Insert a word boundary and open the grace window. Returns false when
    /// the transcript is empty or already ends with a separator.
    pub fn apply_boundary(&mut self, timestamp_ms: u64) -> bool {
        if !self.transcript.push_boundary() {
            return false;
        }
        self.grace.open(timestamp_ms);
        tracing::info!(timestamp_ms, "Inserted word boundary");
        true
    }

    /// A new gesture started: it must not be blocked by the previous one's identity.
    pub fn on_gesture_change(&mut self) {
        self.last_confirmed = None;
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.last_confirmed = None;
        self.pending_label = None;
        self.pending_count = 0;
        self.grace.close();
    }
}
