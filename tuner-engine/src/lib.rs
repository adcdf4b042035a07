//! Real-time pitch and level analysis engine for instrument tuning
//!
//! Captures live microphone audio through cpal, estimates the fundamental
//! pitch each frame with a YIN detector, measures per-channel volume, and
//! publishes everything through an observable store with independently
//! subscribable slices. Device switches hot-swap the capture session
//! without ever presenting an inactive state to observers.

/// Audio capture, devices, and selection
pub mod audio;

/// Engine configuration
pub mod config;

/// Per-frame analysis functions
pub mod dsp;

/// Top-level engine
pub mod engine;

/// Observable analysis state
pub mod store;

/// Utility modules
pub mod utils;

// Re-export the main entry points
pub use audio::error::{CaptureError, CaptureResult};
pub use config::EngineConfig;
pub use engine::TunerEngine;
pub use store::{AnalysisStore, PitchSnapshot, StreamHandle};
