//! Capture sessions and hot-swap
//!
//! A [`CaptureSession`] owns one cpal input stream, the three analysis
//! taps fed by its callback, and the frame-loop task that analyses them.
//! The [`CaptureManager`] enforces the hot-swap invariant: when switching
//! devices, the new session is fully built and running before the old one
//! is released, and a failed switch leaves the old session untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::audio::device::find_device_by_id;
use crate::audio::error::{CaptureError, CaptureResult};
use crate::audio::tap::{analysis_tap, TapFeed, TapWindow};
use crate::config::EngineConfig;
use crate::dsp::backend::numeric_backend;
use crate::dsp::pitch::{clarity, PitchDetector};
use crate::dsp::stereo::StereoDetector;
use crate::dsp::volume::{measure_channel, ChannelSmoother, ChannelVolume, VolumeLevel};
use crate::store::{AnalysisStore, FrameOutcome, FrameUpdate, StreamHandle};

/// One live capture session
///
/// Dropping the session stops its frame loop and releases the stream.
pub struct CaptureSession {
    stream: Option<Stream>,
    device_id: String,
    sample_rate: u32,
    channels: u16,
    session_id: u64,
    stop_tx: Option<oneshot::Sender<()>>,
    frame_task: Option<JoinHandle<()>>,
}

impl CaptureSession {
    fn stream_handle(&self) -> StreamHandle {
        StreamHandle {
            session_id: self.session_id,
            device_id: self.device_id.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Stop the frame loop and release the stream
    ///
    /// Safe to call more than once and on a partially-initialized session.
    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.frame_task.take() {
            task.abort();
        }
        if let Some(stream) = self.stream.take() {
            drop(stream);
            debug!("capture session {} released", self.session_id);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Owns the current capture session and drives the store's lifecycle
pub struct CaptureManager {
    store: Arc<AnalysisStore>,
    config: EngineConfig,
    epoch: Instant,
    session: Option<CaptureSession>,
    next_session_id: u64,
}

impl CaptureManager {
    pub fn new(store: Arc<AnalysisStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            epoch: Instant::now(),
            session: None,
            next_session_id: 1,
        }
    }

    /// Whether a session currently exists
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Device id of the running session, if any
    pub fn current_device(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.device_id.as_str())
    }

    /// Start capturing, optionally on a specific device
    ///
    /// With a session already running this performs a hot swap: the new
    /// session is acquired and wired first, the store keeps reporting
    /// activity throughout, and only then is the old session released.
    /// When acquisition fails the old session keeps running and the error
    /// is returned to the caller.
    ///
    /// # Errors
    /// `CaptureError::PermissionDenied`, `CaptureError::DeviceNotFound`,
    /// or a stream error with the backend's message.
    pub async fn start(&mut self, device_id: Option<&str>) -> CaptureResult<()> {
        self.store.begin_start()?;
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        match self.build_session(device_id, session_id) {
            Ok(session) => {
                let handle = session.stream_handle();
                let device = session.device_id.clone();
                let previous = self.session.replace(session);

                // Starting -> Active is always a legal edge here
                self.store.start_succeeded(handle)?;

                if let Some(mut previous) = previous {
                    previous.shutdown();
                    debug!("previous session released after hot swap");
                }

                info!("capture running on '{}' (session {})", device, session_id);
                Ok(())
            }
            Err(e) => {
                warn!("capture start failed: {}", e);
                self.store.start_failed();
                Err(e)
            }
        }
    }

    /// Stop capturing
    ///
    /// Synchronous and idempotent: the pending frame tick is cancelled
    /// immediately and calling again without a session does nothing.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let stopping = self.store.begin_stop();
        session.shutdown();
        if stopping {
            self.store.finish_stop();
        }
        info!("capture stopped");
    }

    fn build_session(
        &self,
        device_id: Option<&str>,
        session_id: u64,
    ) -> CaptureResult<CaptureSession> {
        let host = cpal::default_host();

        let device = match device_id {
            Some(id) => find_device_by_id(&host, id)?,
            None => host
                .default_input_device()
                .ok_or(CaptureError::DeviceNotFound)?,
        };

        let device_name = device.name().map_err(|_| CaptureError::InvalidDeviceName)?;
        let default_config = device.default_input_config()?;
        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels();

        info!(
            "opening capture on '{}': {} Hz, {} channels",
            device_name, sample_rate, channels
        );

        let stream_config = StreamConfig {
            channels,
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let window = self.config.analysis.buffer_size;
        let ring = window * 4;
        let (mono_feed, mono_window) = analysis_tap(window, ring);
        let (left_feed, left_window) = analysis_tap(window, ring);
        let (right_feed, right_window) = analysis_tap(window, ring);

        let stream = build_input_stream(&device, &stream_config, mono_feed, left_feed, right_feed)?;
        stream.play()?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let frame_task = spawn_frame_loop(
            FrameLoop {
                store: Arc::clone(&self.store),
                config: self.config.clone(),
                session_id,
                sample_rate,
                mono: mono_window,
                left: left_window,
                right: right_window,
                epoch: self.epoch,
            },
            stop_rx,
        );

        Ok(CaptureSession {
            stream: Some(stream),
            device_id: device_name,
            sample_rate,
            channels,
            session_id,
            stop_tx: Some(stop_tx),
            frame_task: Some(frame_task),
        })
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the input stream whose callback feeds the analysis taps
///
/// The callback only deinterleaves and pushes samples; when a ring is full
/// the batch is dropped rather than blocking the audio thread.
fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut mono: TapFeed,
    mut left: TapFeed,
    mut right: TapFeed,
) -> CaptureResult<Stream> {
    let channels = config.channels as usize;
    let mut mono_scratch: Vec<f32> = Vec::new();
    let mut left_scratch: Vec<f32> = Vec::new();
    let mut right_scratch: Vec<f32> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            deinterleave(
                data,
                channels,
                &mut mono_scratch,
                &mut left_scratch,
                &mut right_scratch,
            );
            mono.push(&mono_scratch);
            left.push(&left_scratch);
            right.push(&right_scratch);
        },
        move |err| {
            error!("audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Split interleaved samples into mono / left / right tap batches
///
/// Mono is the per-frame channel mean; a single-channel stream duplicates
/// into both sides so the stereo check sees identical channels.
pub(crate) fn deinterleave(
    data: &[f32],
    channels: usize,
    mono: &mut Vec<f32>,
    left: &mut Vec<f32>,
    right: &mut Vec<f32>,
) {
    mono.clear();
    left.clear();
    right.clear();
    if channels == 0 {
        return;
    }

    for frame in data.chunks_exact(channels) {
        let l = frame[0];
        let r = if channels > 1 { frame[1] } else { l };
        let sum: f32 = frame.iter().sum();
        mono.push(sum / channels as f32);
        left.push(l);
        right.push(r);
    }
}

struct FrameLoop {
    store: Arc<AnalysisStore>,
    config: EngineConfig,
    session_id: u64,
    sample_rate: u32,
    mono: TapWindow,
    left: TapWindow,
    right: TapWindow,
    epoch: Instant,
}

/// Spawn the per-session frame loop
///
/// Each tick drains the taps and runs the full analysis pipeline on the
/// current windows. Ticks that overrun the interval are skipped, lowering
/// the effective analysis rate instead of queueing stale work. The loop
/// exits on the stop signal or as soon as the store reports the session
/// superseded.
fn spawn_frame_loop(mut frame_loop: FrameLoop, mut stop_rx: oneshot::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let analysis = frame_loop.config.analysis.clone();
        let backend = numeric_backend();
        let mut detector = PitchDetector::new(frame_loop.sample_rate, &analysis);
        let mut stereo = StereoDetector::new(analysis.stereo.clone());
        let mut left_smoother = ChannelSmoother::new(analysis.level_smoothing, analysis.db_floor);
        let mut right_smoother = ChannelSmoother::new(analysis.level_smoothing, analysis.db_floor);

        let mut interval =
            tokio::time::interval(Duration::from_millis(frame_loop.config.frame_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("frame loop started (session {})", frame_loop.session_id);

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    debug!("frame loop stop signal received");
                    break;
                }
                _ = interval.tick() => {
                    frame_loop.mono.drain();
                    frame_loop.left.drain();
                    frame_loop.right.drain();

                    // Analysis waits for a full window after session start
                    if !frame_loop.mono.is_warm() {
                        continue;
                    }

                    let timestamp_ms = frame_loop.epoch.elapsed().as_millis() as u64;

                    let mono = frame_loop.mono.samples();
                    let mono_rms = backend.rms(mono);
                    let pitch = detector.detect(mono, mono_rms);
                    let pitch_clarity = if pitch.is_some() {
                        clarity(
                            mono,
                            frame_loop.sample_rate as f32,
                            analysis.min_frequency,
                            analysis.max_frequency,
                        )
                    } else {
                        0.0
                    };

                    let stereo_state =
                        stereo.observe(frame_loop.left.samples(), frame_loop.right.samples());

                    let left_raw =
                        measure_channel(frame_loop.left.samples(), backend, analysis.db_floor);
                    let right_raw =
                        measure_channel(frame_loop.right.samples(), backend, analysis.db_floor);
                    let mono_level =
                        ChannelVolume::from_linear(mono_rms, backend.peak(mono), analysis.db_floor);

                    let volume = VolumeLevel {
                        left: left_smoother.apply(left_raw),
                        right: right_smoother.apply(right_raw),
                        mono: mono_level,
                        is_stereo: stereo_state.is_stereo(),
                    };

                    let outcome = frame_loop.store.apply_frame(FrameUpdate {
                        session_id: frame_loop.session_id,
                        timestamp_ms,
                        pitch,
                        clarity: pitch_clarity,
                        volume,
                    });

                    if outcome == FrameOutcome::Superseded {
                        debug!("frame loop superseded, exiting");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::store::AnalysisStore;

    #[test]
    fn test_deinterleave_stereo() {
        let data = [0.1f32, 0.2, 0.3, 0.4];
        let (mut mono, mut left, mut right) = (Vec::new(), Vec::new(), Vec::new());

        deinterleave(&data, 2, &mut mono, &mut left, &mut right);

        assert_eq!(left, vec![0.1, 0.3]);
        assert_eq!(right, vec![0.2, 0.4]);
        assert!((mono[0] - 0.15).abs() < 1e-6);
        assert!((mono[1] - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_deinterleave_mono_duplicates_channels() {
        let data = [0.5f32, -0.5];
        let (mut mono, mut left, mut right) = (Vec::new(), Vec::new(), Vec::new());

        deinterleave(&data, 1, &mut mono, &mut left, &mut right);

        assert_eq!(mono, vec![0.5, -0.5]);
        assert_eq!(left, right);
    }

    #[test]
    fn test_deinterleave_many_channels() {
        let data = [0.3f32, 0.6, 0.9];
        let (mut mono, mut left, mut right) = (Vec::new(), Vec::new(), Vec::new());

        deinterleave(&data, 3, &mut mono, &mut left, &mut right);

        assert_eq!(left, vec![0.3]);
        assert_eq!(right, vec![0.6]);
        assert!((mono[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_deinterleave_zero_channels_is_empty() {
        let data = [0.1f32, 0.2];
        let (mut mono, mut left, mut right) = (Vec::new(), Vec::new(), Vec::new());

        deinterleave(&data, 0, &mut mono, &mut left, &mut right);

        assert!(mono.is_empty());
        assert!(left.is_empty());
        assert!(right.is_empty());
    }

    #[tokio::test]
    async fn test_start_with_missing_device_fails_cleanly() {
        let store = Arc::new(AnalysisStore::new(&EngineConfig::default().analysis));
        let mut manager = CaptureManager::new(Arc::clone(&store), EngineConfig::default());

        let result = manager.start(Some("NonExistentDevice123456789")).await;
        assert!(result.is_err());
        assert!(!manager.is_running());
        assert!(!store.is_active(), "failed cold start must return to idle");

        // Stop without a session is a no-op
        manager.stop();
    }
}
