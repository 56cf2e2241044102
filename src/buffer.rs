// src/buffer.rs - Rolling window of recent frames, flattened for the classifier
use crate::landmarks::Frame;
use std::sync::Arc;

/// Immutable copy of a full window, shape `(frames, features_per_frame)`,
/// row-major by frame. Cheap to clone; safe to hand to another task while
/// the buffer keeps mutating.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindow {
    data: Arc<[f32]>,
    frames: usize,
    features_per_frame: usize,
}

impl SequenceWindow {
    pub fn new(data: Vec<f32>, features_per_frame: usize) -> Self {
        let frames = if features_per_frame == 0 {
            0
        } else {
            data.len() / features_per_frame
        };
        Self {
            data: data.into(),
            frames,
            features_per_frame,
        }
    }

    /// `(frames, features_per_frame)`
    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.features_per_frame)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index * self.features_per_frame;
        self.data.get(start..start + self.features_per_frame)
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.features_per_frame.max(1))
    }
}

pub struct SequenceBuffer {
    data: Vec<f32>,
    sequence_length: usize,
    features_per_frame: usize,
}

impl SequenceBuffer {
    pub fn new(sequence_length: usize, features_per_frame: usize) -> Self {
        Self {
            data: Vec::with_capacity((sequence_length + 1) * features_per_frame),
            sequence_length,
            features_per_frame,
        }
    }

    /// Append a frame, evicting the oldest whole frame on overflow.
    pub fn push(&mut self, frame: &Frame) {
        debug_assert_eq!(frame.len(), self.features_per_frame);
        self.data.extend_from_slice(frame.features());
        while self.data.len() > self.capacity() {
            self.data.drain(..self.features_per_frame);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / self.features_per_frame
    }

    /// Length of the flat buffer in floats.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sequence_length * self.features_per_frame
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity()
    }

    /// How full the window is, in `[0, 1]`.
    pub fn fill_fraction(&self) -> f32 {
        self.frame_count() as f32 / self.sequence_length as f32
    }

    pub fn snapshot(&self) -> SequenceWindow {
        SequenceWindow::new(self.data.clone(), self.features_per_frame)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: f32) -> Frame {
        Frame::from_features((0..126).map(|i| tag + i as f32 * 0.001).collect())
    }

    #[test]
    fn test_fills_then_slides_by_whole_frames() {
        let mut buffer = SequenceBuffer::new(30, 126);
        for i in 0..29 {
            buffer.push(&frame(i as f32));
            assert!(!buffer.is_full());
        }
        buffer.push(&frame(29.0));
        assert!(buffer.is_full());
        assert_eq!(buffer.fill_fraction(), 1.0);

        buffer.push(&frame(30.0));
        assert_eq!(buffer.frame_count(), 30);
        let window = buffer.snapshot();
        assert_eq!(window.frame(0).unwrap()[0], 1.0);
        assert_eq!(window.frame(29).unwrap()[0], 30.0);
    }

    #[test]
    fn test_length_is_bounded_multiple_of_frame() {
        let mut buffer = SequenceBuffer::new(30, 126);
        for i in 0..200 {
            buffer.push(&frame(i as f32));
            assert!(buffer.len() <= 30 * 126);
            assert_eq!(buffer.len() % 126, 0);
        }
    }

    #[test]
    fn test_snapshot_is_stable_copy() {
        let mut buffer = SequenceBuffer::new(2, 126);
        buffer.push(&frame(1.0));
        buffer.push(&frame(2.0));
        let window = buffer.snapshot();

        buffer.push(&frame(3.0));
        buffer.clear();

        assert_eq!(window.shape(), (2, 126));
        assert_eq!(window.frame(0).unwrap()[0], 1.0);
        assert_eq!(window.frames().count(), 2);
    }

    #[test]
    fn test_clear() {
        let mut buffer = SequenceBuffer::new(30, 126);
        buffer.push(&frame(0.0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.fill_fraction(), 0.0);
    }
}
