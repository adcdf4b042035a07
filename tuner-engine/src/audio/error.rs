use thiserror::Error;

/// Capture-related errors
///
/// Failures while opening or running a capture session are classified so
/// callers can react to the common cases (a denied microphone permission, a
/// missing device) without parsing backend messages.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The operating system denied access to the microphone
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// No matching audio input device found
    #[error("No audio input device found")]
    DeviceNotFound,

    /// Device name is invalid
    #[error("Device name is invalid UTF-8")]
    InvalidDeviceName,

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildFailed(String),

    /// Audio stream error
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// A start or stop arrived while the capture lifecycle could not accept it
    #[error("Capture lifecycle error: {0}")]
    Lifecycle(#[from] crate::store::LifecycleError),

    /// cpal device enumeration error
    #[error("cpal error: {0}")]
    CpalError(#[from] cpal::DevicesError),

    /// Default config error
    #[error("Default config error: {0}")]
    DefaultConfigError(#[from] cpal::DefaultStreamConfigError),

    /// Supported config error
    #[error("Supported config error: {0}")]
    SupportedConfigError(#[from] cpal::SupportedStreamConfigsError),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Whether this error means the OS rejected microphone access
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }

    /// Whether this error means the requested device does not exist
    pub fn is_device_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound)
    }
}

/// Backend error descriptions that indicate an OS-level access denial.
///
/// cpal has no dedicated permission error; the denial surfaces as a
/// backend-specific message on every host.
fn is_permission_message(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
}

impl From<cpal::BuildStreamError> for CaptureError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => Self::DeviceNotFound,
            cpal::BuildStreamError::BackendSpecific { err } => {
                if is_permission_message(&err.description) {
                    Self::PermissionDenied
                } else {
                    Self::StreamBuildFailed(err.description)
                }
            }
            other => Self::StreamBuildFailed(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for CaptureError {
    fn from(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::DeviceNotAvailable => Self::DeviceNotFound,
            cpal::PlayStreamError::BackendSpecific { err } => {
                if is_permission_message(&err.description) {
                    Self::PermissionDenied
                } else {
                    Self::Stream(err.description)
                }
            }
        }
    }
}
