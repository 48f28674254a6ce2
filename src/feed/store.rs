use std::collections::BTreeMap;

use crate::error::FeedError;
use crate::live::{encode_snapshot, Observation};

/// Sliding window of frames keyed by whole epoch seconds.
#[derive(Debug, Clone)]
pub struct FrameStore {
    frames: BTreeMap<i64, Vec<Observation>>,
    window_secs: i64,
}

impl FrameStore {
    pub fn new(window_secs: u64) -> Self {
        Self {
            frames: BTreeMap::new(),
            window_secs: i64::try_from(window_secs).unwrap_or(i64::MAX),
        }
    }

    /// Store a frame, replacing any frame already in the same second.
    pub fn insert(&mut self, ts: i64, observations: Vec<Observation>) {
        self.frames.insert(ts, observations);
    }

    /// Drop frames older than the window relative to `now`.
    pub fn prune(&mut self, now: i64) -> usize {
        let cutoff = now.saturating_sub(self.window_secs);
        let before = self.frames.len();
        self.frames = self.frames.split_off(&cutoff);
        before - self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total observations across all frames.
    pub fn position_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// Every frame as one snapshot message, oldest first.
    pub fn encode(&self) -> Result<String, FeedError> {
        encode_snapshot(
            self.frames
                .iter()
                .map(|(ts, obs)| (*ts as f64, obs.as_slice())),
        )
    }
}
