//! Analysis store
//!
//! Canonical state of the capture and analysis subsystem, exposed as four
//! independently subscribable slices: activity, pitch, volume, and the
//! capture stream handle. Updating one slice notifies only its own
//! subscribers, and a slice that did not change keeps the same `Arc`
//! across frames so consumers can skip redundant work.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::dsp::volume::VolumeLevel;
use crate::store::history::{PitchHistory, PitchHistoryEntry};
use crate::store::lifecycle::{CaptureLifecycle, CapturePhase, LifecycleError};
use crate::store::observable::{Observable, Subscription};

/// Opaque handle describing the live capture stream
///
/// Published on the stream slice for external collaborators (e.g. a
/// recorder) that need to know what is being captured and when the
/// underlying session changes identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    /// Monotonic id of the owning session
    pub session_id: u64,
    /// Device the session captures from
    pub device_id: String,
    /// Device sample rate, Hz
    pub sample_rate: u32,
    /// Channel count of the raw stream
    pub channels: u16,
}

/// The pitch considered "live" right now
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentPitch {
    /// Detected fundamental, Hz; `None` when no recent detection exists
    pub frequency: Option<f32>,
    /// Clarity of the detection, in [0, 1]
    pub clarity: f32,
}

impl CurrentPitch {
    pub fn none() -> Self {
        Self {
            frequency: None,
            clarity: 0.0,
        }
    }
}

/// Read-only pitch state exposed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchSnapshot {
    pub current_pitch: CurrentPitch,
    /// Retained history, oldest entry first
    pub pitch_history: Vec<PitchHistoryEntry>,
    /// Timestamp of the frame that produced this snapshot, ms
    pub timestamp_ms: u64,
}

impl PitchSnapshot {
    pub fn empty() -> Self {
        Self {
            current_pitch: CurrentPitch::none(),
            pitch_history: Vec::new(),
            timestamp_ms: 0,
        }
    }
}

/// One frame's analysis results, as produced by the frame loop
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// Id of the session the frame was computed for
    pub session_id: u64,
    /// Frame timestamp, ms since the engine epoch
    pub timestamp_ms: u64,
    /// Detected pitch, if any
    pub pitch: Option<f32>,
    /// Clarity of the detection (0 when no pitch)
    pub clarity: f32,
    /// Measured volume levels
    pub volume: VolumeLevel,
}

/// What happened to a submitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was merged into the store
    Applied,
    /// The frame's session is still starting; nothing was merged yet
    Pending,
    /// The frame's session has been superseded or stopped; the producer
    /// should exit
    Superseded,
}

struct StoreInner {
    lifecycle: CaptureLifecycle,
    history: PitchHistory,
    /// Session id committed by the most recent successful start
    current_session: u64,
    liveness_timeout_ms: u64,
}

/// Canonical analysis state with per-slice subscriptions
pub struct AnalysisStore {
    activity: Observable<bool>,
    pitch: Observable<PitchSnapshot>,
    volume: Observable<VolumeLevel>,
    stream: Observable<Option<StreamHandle>>,
    inner: Mutex<StoreInner>,
    db_floor: f32,
}

impl AnalysisStore {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            activity: Observable::new(false),
            pitch: Observable::new(PitchSnapshot::empty()),
            volume: Observable::new(VolumeLevel::silent(config.db_floor)),
            stream: Observable::new(None),
            inner: Mutex::new(StoreInner {
                lifecycle: CaptureLifecycle::new(),
                history: PitchHistory::new(config.history_window_ms),
                current_session: 0,
                liveness_timeout_ms: config.liveness_timeout_ms,
            }),
            db_floor: config.db_floor,
        }
    }

    // --- Snapshot getters ---

    /// Whether a capture session is observably running
    pub fn is_active(&self) -> bool {
        *self.activity.get()
    }

    pub fn pitch(&self) -> Arc<PitchSnapshot> {
        self.pitch.get()
    }

    pub fn volume(&self) -> Arc<VolumeLevel> {
        self.volume.get()
    }

    pub fn stream(&self) -> Arc<Option<StreamHandle>> {
        self.stream.get()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> CapturePhase {
        self.inner.lock().lifecycle.phase()
    }

    // --- Subscriptions ---

    pub fn subscribe_activity(
        &self,
        callback: impl Fn(&Arc<bool>) + Send + Sync + 'static,
    ) -> Subscription {
        self.activity.subscribe(callback)
    }

    pub fn subscribe_pitch(
        &self,
        callback: impl Fn(&Arc<PitchSnapshot>) + Send + Sync + 'static,
    ) -> Subscription {
        self.pitch.subscribe(callback)
    }

    pub fn subscribe_volume(
        &self,
        callback: impl Fn(&Arc<VolumeLevel>) + Send + Sync + 'static,
    ) -> Subscription {
        self.volume.subscribe(callback)
    }

    pub fn subscribe_stream(
        &self,
        callback: impl Fn(&Arc<Option<StreamHandle>>) + Send + Sync + 'static,
    ) -> Subscription {
        self.stream.subscribe(callback)
    }

    // --- Lifecycle orchestration (driven by the capture manager) ---

    /// Enter `Starting`
    ///
    /// A cold start clears the pitch history; a hot-swap keeps it, since
    /// the instrument being tuned has not changed. The running session (if
    /// any) stays current until [`AnalysisStore::start_succeeded`] commits
    /// its replacement, so its frames keep applying while the new session
    /// is under construction.
    pub fn begin_start(&self) -> Result<(), LifecycleError> {
        let cold_start = {
            let mut inner = self.inner.lock();
            let cold_start = inner.lifecycle.phase() == CapturePhase::Idle;
            inner.lifecycle.transition(CapturePhase::Starting)?;
            if cold_start {
                inner.history.clear();
            }
            cold_start
        };

        if cold_start {
            self.pitch.set(PitchSnapshot::empty());
        }
        debug!("capture starting");
        Ok(())
    }

    /// Enter `Active` and commit the new session
    ///
    /// From this point on, frames from `handle.session_id` apply and frames
    /// from any earlier session are reported superseded.
    pub fn start_succeeded(&self, handle: StreamHandle) -> Result<(), LifecycleError> {
        {
            let mut inner = self.inner.lock();
            inner.lifecycle.transition(CapturePhase::Active)?;
            inner.current_session = handle.session_id;
        }

        // During a hot-swap activity is already true; the set is a no-op
        // and subscribers see no spurious transition
        self.activity.set(true);
        self.stream.set(Some(handle));
        Ok(())
    }

    /// Abandon a start, restoring the prior phase
    ///
    /// After a failed hot-swap the old session remains committed and its
    /// slices are left exactly as they were; after a failed cold start the
    /// store returns to idle.
    pub fn start_failed(&self) {
        let restored = self.inner.lock().lifecycle.fail_start();

        if restored == CapturePhase::Idle {
            self.activity.set(false);
            self.stream.set(None);
        }
    }

    /// Enter `Stopping`; returns false when there is nothing to stop
    pub fn begin_stop(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.lifecycle.phase() != CapturePhase::Active {
            return false;
        }
        // Active -> Stopping cannot fail
        inner.lifecycle.transition(CapturePhase::Stopping).is_ok()
    }

    /// Complete a stop: back to `Idle`, slices reset
    pub fn finish_stop(&self) {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.lifecycle.phase() == CapturePhase::Stopping {
                // Stopping -> Idle cannot fail
                let _ = inner.lifecycle.transition(CapturePhase::Idle);
            }
            let previous = self.pitch.get();
            PitchSnapshot {
                current_pitch: CurrentPitch::none(),
                pitch_history: inner.history.entries().to_vec(),
                timestamp_ms: previous.timestamp_ms,
            }
        };

        self.activity.set(false);
        self.stream.set(None);
        self.volume.set(VolumeLevel::silent(self.db_floor));
        self.pitch.set(snapshot);
    }

    // --- Frame ingestion ---

    /// Merge one frame's results into the store
    ///
    /// Session ids are allocated monotonically, so a frame carrying an id
    /// above the committed one belongs to a session still starting
    /// ([`FrameOutcome::Pending`]) and one below it to a torn-down session
    /// ([`FrameOutcome::Superseded`]); only the current session's frames
    /// mutate state.
    pub fn apply_frame(&self, update: FrameUpdate) -> FrameOutcome {
        let pitch_snapshot = {
            let mut inner = self.inner.lock();

            if update.session_id > inner.current_session {
                return FrameOutcome::Pending;
            }
            if update.session_id < inner.current_session {
                debug!(
                    "discarding stale frame (session {} < {})",
                    update.session_id, inner.current_session
                );
                return FrameOutcome::Superseded;
            }
            if !matches!(
                inner.lifecycle.phase(),
                CapturePhase::Active | CapturePhase::Starting
            ) {
                return FrameOutcome::Superseded;
            }

            let appended = match update.pitch {
                Some(frequency) => {
                    inner.history.push(frequency, update.timestamp_ms);
                    true
                }
                None => false,
            };
            let pruned = inner.history.prune(update.timestamp_ms);
            let live = inner
                .history
                .live_frequency(update.timestamp_ms, inner.liveness_timeout_ms);

            let previous = self.pitch.get();
            if appended || pruned > 0 || previous.current_pitch.frequency != live {
                let clarity = if appended {
                    update.clarity
                } else if live.is_some() {
                    previous.current_pitch.clarity
                } else {
                    0.0
                };
                Some(PitchSnapshot {
                    current_pitch: CurrentPitch {
                        frequency: live,
                        clarity,
                    },
                    pitch_history: inner.history.entries().to_vec(),
                    timestamp_ms: update.timestamp_ms,
                })
            } else {
                None
            }
        };

        if let Some(snapshot) = pitch_snapshot {
            self.pitch.set(snapshot);
        }
        self.volume.set(update.volume);

        FrameOutcome::Applied
    }
}
