/// Capture sessions and device hot-swap
pub mod capture;

/// Audio device enumeration
pub mod device;

/// Capture-related error types
pub mod error;

/// Microphone auto-selection
pub mod selection;

/// Lock-free analysis taps
pub mod tap;

// Re-export commonly used types
pub use capture::{CaptureManager, CaptureSession};
pub use device::{default_input_device, list_input_devices, AudioDevice};
pub use error::{CaptureError, CaptureResult};
pub use selection::{
    record_selection, select_microphone, EnvironmentKey, MicSelectionState, SelectionStore,
};
