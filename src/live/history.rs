use super::snapshot::{sort_frames, Frame};

/// Rolling buffer of frames, ascending by timestamp.
///
/// Each snapshot replaces the buffer wholesale. The buffer keeps at most
/// `capacity` frames (the trail look-back window), dropping the oldest.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    frames: Vec<Frame>,
    capacity: usize,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Replace the buffer with `frames`, sorting and evicting beyond capacity.
    pub fn replace(&mut self, mut frames: Vec<Frame>) {
        sort_frames(&mut frames);
        if frames.len() > self.capacity {
            let excess = frames.len() - self.capacity;
            frames.drain(..excess);
        }
        self.frames = frames;
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Frames from newest to oldest.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
