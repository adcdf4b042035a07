//! Volume measurement
//!
//! Per-channel RMS and peak levels with decibel conversion. Decibel values
//! are floored at a configured minimum so silence renders as a finite
//! sentinel instead of negative infinity. The left/right display channels
//! additionally pass through a one-pole smoother to keep meters stable;
//! the mono channel feeding pitch detection is never smoothed.

use serde::Serialize;

use crate::dsp::backend::NumericBackend;

/// Measured levels for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelVolume {
    /// Root-mean-square amplitude
    pub rms: f32,
    /// RMS in decibels, floored
    pub db: f32,
    /// Peak absolute amplitude
    pub peak: f32,
    /// Peak in decibels, floored
    pub peak_db: f32,
}

impl ChannelVolume {
    /// The level of a silent channel
    pub fn silent(db_floor: f32) -> Self {
        Self {
            rms: 0.0,
            db: db_floor,
            peak: 0.0,
            peak_db: db_floor,
        }
    }

    /// Build from linear measurements
    pub fn from_linear(rms: f32, peak: f32, db_floor: f32) -> Self {
        Self {
            rms,
            db: to_db(rms, db_floor),
            peak,
            peak_db: to_db(peak, db_floor),
        }
    }
}

/// Volume levels for the whole capture, one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeLevel {
    pub left: ChannelVolume,
    pub right: ChannelVolume,
    pub mono: ChannelVolume,
    /// Whether the session has been determined to carry a stereo signal
    pub is_stereo: bool,
}

impl VolumeLevel {
    /// The level of a silent capture
    pub fn silent(db_floor: f32) -> Self {
        Self {
            left: ChannelVolume::silent(db_floor),
            right: ChannelVolume::silent(db_floor),
            mono: ChannelVolume::silent(db_floor),
            is_stereo: false,
        }
    }
}

/// Convert a linear amplitude to decibels, clamped to the floor
///
/// Non-positive inputs have no finite logarithm and report the floor.
pub fn to_db(linear: f32, floor: f32) -> f32 {
    if linear <= 0.0 {
        return floor;
    }
    (20.0 * linear.log10()).max(floor)
}

/// Measure one channel through the numeric backend
pub fn measure_channel(
    samples: &[f32],
    backend: &dyn NumericBackend,
    db_floor: f32,
) -> ChannelVolume {
    ChannelVolume::from_linear(backend.rms(samples), backend.peak(samples), db_floor)
}

/// One-pole smoother for a display level
///
/// `smoothed = alpha * previous + (1 - alpha) * current`; the first sample
/// passes through unchanged.
#[derive(Debug)]
pub struct LevelSmoother {
    alpha: f32,
    state: Option<f32>,
}

impl LevelSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, state: None }
    }

    pub fn apply(&mut self, value: f32) -> f32 {
        let next = match self.state {
            Some(previous) => self.alpha * previous + (1.0 - self.alpha) * value,
            None => value,
        };
        self.state = Some(next);
        next
    }
}

/// Paired smoothers for a display channel's RMS and peak
#[derive(Debug)]
pub struct ChannelSmoother {
    rms: LevelSmoother,
    peak: LevelSmoother,
    db_floor: f32,
}

impl ChannelSmoother {
    pub fn new(alpha: f32, db_floor: f32) -> Self {
        Self {
            rms: LevelSmoother::new(alpha),
            peak: LevelSmoother::new(alpha),
            db_floor,
        }
    }

    /// Smooth a raw measurement, recomputing the decibel fields
    pub fn apply(&mut self, raw: ChannelVolume) -> ChannelVolume {
        ChannelVolume::from_linear(
            self.rms.apply(raw.rms),
            self.peak.apply(raw.peak),
            self.db_floor,
        )
    }
}
