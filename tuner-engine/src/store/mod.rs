//! Observable analysis state
//!
//! # Module structure
//!
//! - `analysis` - the canonical store and its four slices
//! - `history` - windowed pitch history
//! - `lifecycle` - capture lifecycle state machine
//! - `observable` - per-slice observables and subscriptions

mod analysis;
mod history;
mod lifecycle;
mod observable;

pub use analysis::{
    AnalysisStore, CurrentPitch, FrameOutcome, FrameUpdate, PitchSnapshot, StreamHandle,
};
pub use history::{PitchHistory, PitchHistoryEntry};
pub use lifecycle::{CaptureLifecycle, CapturePhase, LifecycleError};
pub use observable::{Observable, Subscription};
