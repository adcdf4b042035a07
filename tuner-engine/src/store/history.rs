//! Pitch history retention
//!
//! A time-ordered record of detected pitches, bounded by a sliding time
//! window. All operations take explicit millisecond timestamps so retention
//! and liveness are pure functions of their inputs.

use serde::Serialize;

/// One detected pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchHistoryEntry {
    /// Detected fundamental, Hz
    pub frequency: f32,
    /// Frame timestamp, milliseconds since the engine epoch
    pub timestamp_ms: u64,
}

/// Windowed pitch history, oldest entry first
#[derive(Debug, Clone)]
pub struct PitchHistory {
    entries: Vec<PitchHistoryEntry>,
    window_ms: u64,
}

impl PitchHistory {
    pub fn new(window_ms: u64) -> Self {
        Self {
            entries: Vec::new(),
            window_ms,
        }
    }

    /// Append a detection
    ///
    /// Timestamps arrive from a monotonic frame clock; an out-of-order
    /// timestamp is clamped to keep the history ordered.
    pub fn push(&mut self, frequency: f32, timestamp_ms: u64) {
        let timestamp_ms = match self.entries.last() {
            Some(last) if timestamp_ms < last.timestamp_ms => last.timestamp_ms,
            _ => timestamp_ms,
        };
        self.entries.push(PitchHistoryEntry {
            frequency,
            timestamp_ms,
        });
    }

    /// Drop entries older than the window relative to `now_ms`
    ///
    /// Returns the number of entries removed. Remaining entries keep their
    /// order and all satisfy `now_ms - timestamp_ms < window`.
    pub fn prune(&mut self, now_ms: u64) -> usize {
        let window_ms = self.window_ms;
        let keep_from = self
            .entries
            .iter()
            .position(|e| now_ms.saturating_sub(e.timestamp_ms) < window_ms)
            .unwrap_or(self.entries.len());

        self.entries.drain(..keep_from).count()
    }

    /// The retained entries, oldest first
    pub fn entries(&self) -> &[PitchHistoryEntry] {
        &self.entries
    }

    /// The most recent entry
    pub fn latest(&self) -> Option<&PitchHistoryEntry> {
        self.entries.last()
    }

    /// The live pitch: the latest entry if it is younger than the timeout
    pub fn live_frequency(&self, now_ms: u64, liveness_timeout_ms: u64) -> Option<f32> {
        self.latest().and_then(|entry| {
            if now_ms.saturating_sub(entry.timestamp_ms) < liveness_timeout_ms {
                Some(entry.frequency)
            } else {
                None
            }
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
