/// Numeric backend strategy (reference / accelerated)
pub mod backend;

/// YIN pitch estimation
pub mod pitch;

/// Stereo signal detection
pub mod stereo;

/// Volume measurement and smoothing
pub mod volume;

// Re-export commonly used types
pub use backend::{numeric_backend, NumericBackend, ReferenceBackend};
pub use pitch::{clarity, PitchDetector};
pub use stereo::{StereoDetection, StereoDetector};
pub use volume::{ChannelVolume, VolumeLevel};
